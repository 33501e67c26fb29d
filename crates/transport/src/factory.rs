//! Factory fuer Gateway-Verbindungen

use std::sync::Arc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use voxgate_core::error::{ProtocolError, ProtocolResult};
use voxgate_core::types::UserId;
use voxgate_voice::connection::{ConnectionFactory, VerbindungsParameter, VoiceConnection};

use crate::config::TransportConfig;
use crate::connection::WsVoiceConnection;

/// Gemeinsamer Kontext aller Verbindungen eines Bots
#[derive(Debug, Clone)]
pub struct VoiceKontext {
    /// Eigene User-ID, wird im Identify gesendet
    pub user_id: UserId,
    pub config: TransportConfig,
}

impl VoiceKontext {
    pub fn neu(user_id: UserId, config: TransportConfig) -> Self {
        Self { user_id, config }
    }
}

/// Baut `WsVoiceConnection`s auf einer tokio-Runtime
///
/// `bauen` selbst oeffnet keine Sockets; der Handshake laeuft erst nach
/// `handshake_starten` im Hintergrund.
#[derive(Clone)]
pub struct WsConnectionFactory {
    kontext: Arc<VoiceKontext>,
    runtime: tokio::runtime::Handle,
}

impl WsConnectionFactory {
    /// Verwendet die aktuelle tokio-Runtime
    pub fn neu(kontext: VoiceKontext) -> ProtocolResult<Self> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            ProtocolError::Konfiguration(format!("Keine tokio-Runtime verfuegbar: {e}"))
        })?;
        Ok(Self::mit_runtime(kontext, runtime))
    }

    pub fn mit_runtime(kontext: VoiceKontext, runtime: tokio::runtime::Handle) -> Self {
        Self {
            kontext: Arc::new(kontext),
            runtime,
        }
    }

    pub fn kontext(&self) -> &VoiceKontext {
        &self.kontext
    }

    /// Wie `bauen`, liefert aber den konkreten Typ (z.B. fuer `ready_daten`)
    pub fn verbindung_bauen(&self, parameter: VerbindungsParameter) -> ProtocolResult<WsVoiceConnection> {
        if parameter.endpunkt.trim().is_empty() {
            return Err(ProtocolError::transport("Leerer Voice-Endpunkt"));
        }
        let url = self.kontext.config.url(&parameter.endpunkt);
        url.as_str()
            .into_client_request()
            .map_err(|e| ProtocolError::transport(format!("Ungueltige Gateway-URL {url}: {e}")))?;

        tracing::debug!(
            guild_id = %parameter.guild_id,
            url = %url,
            "Gateway-Verbindung gebaut"
        );
        Ok(WsVoiceConnection::neu(
            parameter,
            Arc::clone(&self.kontext),
            self.runtime.clone(),
        ))
    }
}

impl ConnectionFactory for WsConnectionFactory {
    fn bauen(&self, parameter: VerbindungsParameter) -> ProtocolResult<Arc<dyn VoiceConnection>> {
        Ok(Arc::new(self.verbindung_bauen(parameter)?))
    }
}
