//! Schnittstelle zur Connection Factory
//!
//! Der Koordinator baut Verbindungen nur ueber [`ConnectionFactory`] und
//! steuert sie ueber [`VoiceConnection`]. Die konkrete Implementierung
//! (Voice-Gateway per WebSocket) liegt in `voxgate-transport`.
//!
//! Handshake- und Verbindungsfehler laufen nicht ueber den Rueckgabewert
//! des Koordinators, sondern als [`VerbindungsEvent`] ueber den
//! Status-Kanal der Guild.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;
use voxgate_core::error::ProtocolResult;
use voxgate_core::types::{ChannelId, GuildId, SessionId};

// ---------------------------------------------------------------------------
// Verbindungs-ID
// ---------------------------------------------------------------------------

/// Eindeutige ID einer gebauten Verbindung (fuer Logs und Events)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VerbindungsId(pub Uuid);

impl VerbindungsId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VerbindungsId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VerbindungsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Zustand & Events
// ---------------------------------------------------------------------------

/// Lebenszyklus einer Voice-Verbindung
///
/// ```text
/// Neu -> Verbindet -> Verbunden
///  |        |            |
///  +--------+------------+--> RegionWechsel | Geschlossen | Fehlgeschlagen
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbindungsZustand {
    /// Gebaut, Handshake noch nicht gestartet
    Neu,
    /// Handshake laeuft (ausstehender Verbindungsversuch)
    Verbindet,
    /// Handshake abgeschlossen
    Verbunden,
    /// Wird fuer einen Region-Wechsel abgebaut
    RegionWechsel,
    Geschlossen,
    Fehlgeschlagen,
}

impl VerbindungsZustand {
    /// Endzustaende werden nicht mehr verlassen
    pub fn ist_beendet(self) -> bool {
        matches!(
            self,
            Self::RegionWechsel | Self::Geschlossen | Self::Fehlgeschlagen
        )
    }
}

/// Art eines Status-Events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventArt {
    HandshakeGestartet { endpunkt: String },
    Verbunden { endpunkt: String },
    RegionWechsel { endpunkt: String },
    /// Transportfehler (Handshake, Verbindungsabbruch)
    Fehler { grund: String },
    Geschlossen,
}

/// Status-Event einer Verbindung, verteilt per Broadcast pro Guild
#[derive(Debug, Clone)]
pub struct VerbindungsEvent {
    pub guild_id: GuildId,
    pub verbindung_id: VerbindungsId,
    pub art: EventArt,
    pub zeitpunkt: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Parameter
// ---------------------------------------------------------------------------

/// Alles, was die Factory fuer eine neue Verbindung braucht
#[derive(Debug, Clone)]
pub struct VerbindungsParameter {
    /// Normalisierter Endpunkt (ohne Standard-Port)
    pub endpunkt: String,
    pub guild_id: GuildId,
    pub session_id: SessionId,
    pub token: String,
    pub auto_reconnect: bool,
    /// Vorgemerkter Ziel-Kanal, den die Verbindung wieder aufnehmen soll
    pub kanal_id: Option<ChannelId>,
    /// Status-Kanal der Guild
    pub events: broadcast::Sender<VerbindungsEvent>,
}

impl VerbindungsParameter {
    /// Sendet ein Status-Event; fehlende Abonnenten sind kein Fehler
    pub fn event_senden(&self, verbindung_id: VerbindungsId, art: EventArt) {
        let _ = self.events.send(VerbindungsEvent {
            guild_id: self.guild_id.clone(),
            verbindung_id,
            art,
            zeitpunkt: Utc::now(),
        });
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Handle auf eine Voice-Verbindung
///
/// Alle Methoden sind nicht-blockierend. `schliessen` und
/// `region_wechsel_vorbereiten` sind idempotent.
pub trait VoiceConnection: Send + Sync + 'static {
    fn id(&self) -> VerbindungsId;

    fn guild_id(&self) -> &GuildId;

    /// Normalisierter Endpunkt, mit dem die Verbindung gebaut wurde
    fn endpunkt(&self) -> &str;

    fn kanal_id(&self) -> Option<&ChannelId>;

    fn zustand(&self) -> VerbindungsZustand;

    fn ist_verbunden(&self) -> bool {
        self.zustand() == VerbindungsZustand::Verbunden
    }

    /// Startet den Handshake asynchron
    fn handshake_starten(&self);

    /// Migrations-Hook vor einem Region-Wechsel
    ///
    /// Darf laufende Audio-Zustaende abgeben, kehrt aber sofort zurueck.
    fn region_wechsel_vorbereiten(&self);

    /// Baut die Verbindung ab bzw. bricht den laufenden Handshake ab
    fn schliessen(&self);
}

/// Baut neue Verbindungen, ohne selbst I/O auszufuehren
pub trait ConnectionFactory: Send + Sync + 'static {
    fn bauen(&self, parameter: VerbindungsParameter) -> ProtocolResult<Arc<dyn VoiceConnection>>;
}
