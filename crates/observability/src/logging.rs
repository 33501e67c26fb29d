//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `VG_LOG_LEVEL`: Filter-Direktive (z.B. `info`, `voxgate_voice=debug`), Standard: info
//! - `VG_LOG_FORMAT`: Format (text/json), Standard: text
//!
//! Die Umgebung hat Vorrang vor der Konfigurationsdatei.

use std::str::FromStr;
use tracing_subscriber::{fmt, EnvFilter};

pub const LEVEL_ENV: &str = "VG_LOG_LEVEL";
pub const FORMAT_ENV: &str = "VG_LOG_FORMAT";

/// Ausgabeformat der Logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            andere => Err(anyhow::anyhow!("Unbekanntes Log-Format '{andere}' (text/json)")),
        }
    }
}

/// Initialisiert das Logging-System.
///
/// Liest `VG_LOG_LEVEL` und `VG_LOG_FORMAT` aus der Umgebung und faellt
/// auf die uebergebenen Werte zurueck. Ein bereits gesetzter globaler
/// Subscriber ist kein Fehler (z.B. in Tests); `false` zeigt das an.
pub fn logging_initialisieren(level: &str, format: &str) -> bool {
    let filter = EnvFilter::try_from_env(LEVEL_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = std::env::var(FORMAT_ENV).unwrap_or_else(|_| format.to_string());
    let format = LogFormat::from_str(&format).unwrap_or_default();

    let ergebnis = match format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(true).try_init(),
    };
    ergebnis.is_ok()
}

/// Validiert eine Filter-Direktive (`info`, `voxgate_transport=trace`, ...)
pub fn log_level_gueltig(level: &str) -> bool {
    !level.is_empty() && EnvFilter::try_new(level).is_ok()
}
