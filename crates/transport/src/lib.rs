//! voxgate-transport – Voice-Gateway per WebSocket
//!
//! Implementiert die `ConnectionFactory` des Koordinators fuer den
//! Voice-Gateway der Plattform. Der UDP-Medienpfad ist nicht Teil dieses
//! Crates.
//!
//! ## Handshake
//!
//! ```text
//! connect_async(wss://{endpunkt}/?v=4)
//!     |
//!     +--> Identify (op 0)
//!     |<-- Hello (op 8)    -> Heartbeat-Intervall starten
//!     |<-- Ready (op 2)    -> Zustand Verbunden
//!     |
//!     +--> Heartbeat (op 3) ... <-- Heartbeat ACK (op 6)
//! ```
//!
//! Schlaegt der Handshake fehl und ist Auto-Reconnect aktiv, wird mit
//! linearem Backoff bis `max_wiederholungen` erneut verbunden.

pub mod config;
pub mod connection;
pub mod factory;
pub mod protocol;

pub use config::TransportConfig;
pub use connection::WsVoiceConnection;
pub use factory::{VoiceKontext, WsConnectionFactory};
pub use protocol::{GatewayNachricht, GatewayPayload, ReadyDaten};
