//! Voice-Server-Zuweisung aus dem Gateway
//!
//! Das Gateway liefert `VOICE_SERVER_UPDATE` mit `guild_id`, `endpoint`
//! (nullable, mit Port-Suffix) und `token`. Die Session-ID kommt getrennt
//! aus der Session-Schicht.

use crate::error::{ProtocolError, ProtocolResult};
use crate::types::GuildId;
use serde::{Deserialize, Serialize};

/// Dekodierter `VOICE_SERVER_UPDATE`-Payload
///
/// Alle Felder sind optional, die Pflichtfelder prueft erst der Koordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceServerUpdate {
    pub guild_id: Option<GuildId>,
    /// `None` solange die Plattform noch keinen Voice-Server zugeteilt hat
    pub endpoint: Option<String>,
    pub token: Option<String>,
}

impl VoiceServerUpdate {
    /// Update mit zugewiesenem Endpunkt
    pub fn neu(
        guild_id: impl Into<GuildId>,
        endpoint: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            guild_id: Some(guild_id.into()),
            endpoint: Some(endpoint.into()),
            token: Some(token.into()),
        }
    }

    /// Update ohne Endpunkt (Zuweisung steht noch aus)
    pub fn ohne_endpunkt(guild_id: impl Into<GuildId>) -> Self {
        Self {
            guild_id: Some(guild_id.into()),
            endpoint: None,
            token: None,
        }
    }

    /// Parst den `d`-Teil eines Gateway-Events
    pub fn aus_json(json: &str) -> ProtocolResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ProtocolError::ungueltig(format!("VOICE_SERVER_UPDATE nicht lesbar: {e}")))
    }
}
