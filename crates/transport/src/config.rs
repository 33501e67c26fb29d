//! Transport-Konfiguration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Einstellungen fuer den Voice-Gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// URL-Schema: "wss" im Betrieb, "ws" fuer lokale Tests
    pub schema: String,
    /// Version des Voice-Gateway-Protokolls
    pub gateway_version: u8,
    /// Frist vom Verbindungsaufbau bis Ready
    pub handshake_timeout_ms: u64,
    /// Maximale Wiederholungen bei Auto-Reconnect
    pub max_wiederholungen: u32,
    /// Wartezeit vor der ersten Wiederholung, waechst linear
    pub wiederholung_basis_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            schema: "wss".into(),
            gateway_version: 4,
            handshake_timeout_ms: 10_000,
            max_wiederholungen: 3,
            wiederholung_basis_ms: 1_000,
        }
    }
}

impl TransportConfig {
    /// Gateway-URL fuer einen normalisierten Endpunkt
    pub fn url(&self, endpunkt: &str) -> String {
        format!("{}://{}/?v={}", self.schema, endpunkt, self.gateway_version)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// Wartezeit vor Wiederholung `versuch` (ab 1)
    pub fn wartezeit(&self, versuch: u32) -> Duration {
        Duration::from_millis(self.wiederholung_basis_ms.saturating_mul(u64::from(versuch)))
    }
}
