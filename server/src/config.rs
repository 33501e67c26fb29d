//! voxgate-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! Standardwerte, eine fehlende Datei ist kein Fehler.

use serde::{Deserialize, Serialize};
use voxgate_transport::TransportConfig;
use voxgate_voice::endpoint::STANDARD_PORT_SUFFIX;

/// Vollstaendige Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoxgateConfig {
    /// Koordinator-Einstellungen
    pub voice: VoiceEinstellungen,
    /// Voice-Gateway (WebSocket)
    pub transport: TransportConfig,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Prometheus-Metriken
    pub metriken: MetrikEinstellungen,
}

/// Koordinator-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceEinstellungen {
    /// Wird am Ende des Endpunkts entfernt
    pub port_suffix: String,
    /// Standard fuer neue Guild-States
    pub auto_reconnect: bool,
}

impl Default for VoiceEinstellungen {
    fn default() -> Self {
        Self {
            port_suffix: STANDARD_PORT_SUFFIX.into(),
            auto_reconnect: true,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Filter-Direktive: "trace", "debug", "info", "warn", "error", ...
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Metrik-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetrikEinstellungen {
    pub aktiviert: bool,
}

impl Default for MetrikEinstellungen {
    fn default() -> Self {
        Self { aktiviert: true }
    }
}

impl VoxgateConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    pub fn aus_toml(inhalt: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(inhalt)
    }
}
