//! voxgate-voice – Voice-Session-Koordinator
//!
//! Setzt `VOICE_SERVER_UPDATE`-Notifications in geordnete Uebergaenge der
//! Voice-Verbindung einer Guild um (Verbindungsaufbau, Region-Wechsel,
//! Warten auf Endpunkt).
//!
//! ## Module
//! - [`registry`] – Letzter Endpunkt pro Session-ID
//! - [`state`] – Verbindungszustand pro Guild inkl. Gate
//! - [`connection`] – Schnittstelle zur Connection Factory
//! - [`endpoint`] – Normalisierung der Endpunkte
//! - [`coordinator`] – Verarbeitung der Notifications
//!
//! ## Ablauf
//!
//! ```text
//! VoiceServerUpdate
//!     |
//!     v
//! Validierung -> ausstehenden Versuch verwerfen -> (kein Endpunkt: fertig)
//!     |
//!     v
//! Guild-Gate sperren
//!     |  Registry tauschen, Region-Wechsel erkennen
//!     |  ConnectionFactory::bauen()
//!     |  alte Verbindung migrieren + schliessen
//!     v
//! neue Verbindung installieren -> handshake_starten()
//! ```

pub mod connection;
pub mod coordinator;
pub mod endpoint;
pub mod registry;
pub mod state;

pub use connection::{
    ConnectionFactory, EventArt, VerbindungsEvent, VerbindungsId, VerbindungsParameter,
    VerbindungsZustand, VoiceConnection,
};
pub use coordinator::{Uebergang, VoiceServerUpdateHandler};
pub use registry::SessionRegistry;
pub use state::{GuildStateManager, GuildVoiceState, VerbindungsSlot};
