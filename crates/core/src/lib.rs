//! voxgate-core – Gemeinsame Typen, Notification-Payloads und Fehlertypen
//!
//! Dieses Crate stellt die Bausteine bereit, die Koordinator, Transport und
//! Runtime gemeinsam nutzen.

pub mod error;
pub mod event;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{ProtocolError, ProtocolResult};
pub use event::VoiceServerUpdate;
pub use types::{ChannelId, GuildId, SessionId, UserId};
