//! voxgate – Bibliotheks-Root
//!
//! Verdrahtet Koordinator, WebSocket-Factory und Metriken zu einer
//! `VoiceRuntime`. Die aeussere Gateway-Schleife des Bots reicht jedes
//! `VOICE_SERVER_UPDATE` zusammen mit der Session-ID hier hinein.
//!
//! ```text
//! Gateway-Dispatch --> VoiceRuntime::dispatch_json
//!                          |
//!                          +- VoiceServerUpdate::aus_json
//!                          +- VoiceServerUpdateHandler::handle
//!                          +- VoiceMetrics (uebergang / abgelehnt)
//! ```

pub mod config;

use anyhow::Result;
use config::{LoggingEinstellungen, VoxgateConfig};
use std::sync::Arc;
use tokio::sync::broadcast;
use voxgate_core::error::{ProtocolError, ProtocolResult};
use voxgate_core::event::VoiceServerUpdate;
use voxgate_core::types::{ChannelId, GuildId, UserId};
use voxgate_observability::VoiceMetrics;
use voxgate_transport::{VoiceKontext, WsConnectionFactory};
use voxgate_voice::connection::{ConnectionFactory, VerbindungsEvent};
use voxgate_voice::{GuildStateManager, Uebergang, VoiceServerUpdateHandler};

/// Initialisiert tracing-subscriber mit dem konfigurierten Level und Format
pub fn logging_initialisieren(einstellungen: &LoggingEinstellungen) -> bool {
    voxgate_observability::logging_initialisieren(&einstellungen.level, &einstellungen.format)
}

/// Laufende Voice-Koordination eines Bots
///
/// Clone-faehig; alle Kopien teilen Koordinator und Metriken.
#[derive(Clone)]
pub struct VoiceRuntime {
    handler: VoiceServerUpdateHandler,
    metriken: Option<VoiceMetrics>,
}

impl VoiceRuntime {
    /// Baut die Runtime mit dem Voice-Gateway per WebSocket
    ///
    /// Muss innerhalb einer tokio-Runtime aufgerufen werden.
    pub fn neu(config: VoxgateConfig, user_id: UserId) -> Result<Self> {
        let kontext = VoiceKontext::neu(user_id, config.transport.clone());
        let factory = WsConnectionFactory::neu(kontext)?;
        Self::mit_factory(config, Arc::new(factory))
    }

    /// Baut die Runtime mit einer eigenen Factory
    pub fn mit_factory(config: VoxgateConfig, factory: Arc<dyn ConnectionFactory>) -> Result<Self> {
        let gilden = GuildStateManager::mit_auto_reconnect(config.voice.auto_reconnect);
        let handler = VoiceServerUpdateHandler::neu(gilden, factory)
            .mit_port_suffix(config.voice.port_suffix.clone());
        let metriken = if config.metriken.aktiviert {
            Some(VoiceMetrics::neu()?)
        } else {
            None
        };

        tracing::info!(
            port_suffix = %config.voice.port_suffix,
            auto_reconnect = config.voice.auto_reconnect,
            gateway_version = config.transport.gateway_version,
            metriken = config.metriken.aktiviert,
            "Voice-Runtime initialisiert"
        );
        Ok(Self { handler, metriken })
    }

    /// Verarbeitet ein bereits gelesenes Update
    pub fn voice_server_update(
        &self,
        session_id: &str,
        update: VoiceServerUpdate,
    ) -> ProtocolResult<Uebergang> {
        let ergebnis = self.handler.handle(session_id, update);
        self.erfassen(&ergebnis);
        ergebnis
    }

    /// Verarbeitet den rohen `d`-Payload eines `VOICE_SERVER_UPDATE`
    pub fn dispatch_json(&self, session_id: &str, json: &str) -> ProtocolResult<Uebergang> {
        match VoiceServerUpdate::aus_json(json) {
            Ok(update) => self.voice_server_update(session_id, update),
            Err(e) => {
                tracing::warn!(fehler = %e, "VOICE_SERVER_UPDATE nicht lesbar");
                let ergebnis = Err(e);
                self.erfassen(&ergebnis);
                ergebnis
            }
        }
    }

    /// Merkt den Ziel-Kanal fuer kuenftige Verbindungen der Guild vor
    pub fn kanal_vormerken(&self, guild_id: &GuildId, kanal_id: Option<ChannelId>) {
        self.handler
            .gilden()
            .state_holen_oder_erstellen(guild_id)
            .kanal_vormerken(kanal_id);
    }

    /// Externer Disconnect der Guild
    pub fn trennen(&self, guild_id: &GuildId) -> bool {
        let getrennt = self
            .handler
            .gilden()
            .state(guild_id)
            .is_some_and(|state| state.verbindung_schliessen());
        self.gilden_erfassen();
        getrennt
    }

    /// Status-Events einer Guild
    pub fn abonnieren(&self, guild_id: &GuildId) -> broadcast::Receiver<VerbindungsEvent> {
        self.handler
            .gilden()
            .state_holen_oder_erstellen(guild_id)
            .abonnieren()
    }

    pub fn handler(&self) -> &VoiceServerUpdateHandler {
        &self.handler
    }

    pub fn metriken(&self) -> Option<&VoiceMetrics> {
        self.metriken.as_ref()
    }

    fn erfassen(&self, ergebnis: &ProtocolResult<Uebergang>) {
        let Some(metriken) = &self.metriken else {
            return;
        };
        match ergebnis {
            Ok(uebergang) => metriken.update_verarbeitet(uebergang.als_str()),
            Err(e) => metriken.update_abgelehnt(grund_label(e)),
        }
        self.gilden_erfassen();
    }

    fn gilden_erfassen(&self) {
        if let Some(metriken) = &self.metriken {
            let gilden = self.handler.gilden();
            metriken.gilden_setzen(gilden.gilden_anzahl(), gilden.verbundene_gilden());
        }
    }
}

fn grund_label(fehler: &ProtocolError) -> &'static str {
    match fehler {
        ProtocolError::UngueltigesArgument(_) => "ungueltig",
        ProtocolError::Transport(_) => "transport",
        ProtocolError::Konfiguration(_) => "konfiguration",
        ProtocolError::Intern(_) | ProtocolError::Anyhow(_) => "intern",
    }
}
