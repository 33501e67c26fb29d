//! Guild-Voice-State – Verbindungszustand pro Guild
//!
//! Pro Guild:
//! - aktive Verbindung (hoechstens eine)
//! - vorgemerkter Ziel-Kanal
//! - Auto-Reconnect-Flag
//! - Status-Kanal fuer Verbindungs-Events
//!
//! Die Felder liegen hinter einem Gate (parking_lot Mutex) pro Guild.
//! Guilds sind per DashMap unabhaengig geschluesselt, verschiedene Guilds
//! konkurrieren nie um dasselbe Gate.

use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use tokio::sync::broadcast;
use voxgate_core::types::{ChannelId, GuildId};

use crate::connection::{VerbindungsEvent, VerbindungsId, VoiceConnection};

/// Groesse des Broadcast-Kanals fuer Verbindungs-Events
const EVENT_KANAL_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// VerbindungsSlot
// ---------------------------------------------------------------------------

/// Durch das Gate geschuetzte Felder einer Guild
pub struct VerbindungsSlot {
    aktiv: Option<Arc<dyn VoiceConnection>>,
    vorgemerkter_kanal: Option<ChannelId>,
    auto_reconnect: bool,
    /// State wurde aus dem Manager entfernt, nimmt keine Verbindung mehr an
    entfernt: bool,
}

impl VerbindungsSlot {
    pub fn aktive_verbindung(&self) -> Option<&Arc<dyn VoiceConnection>> {
        self.aktiv.as_ref()
    }

    /// Aktive Verbindung vorhanden und Handshake abgeschlossen
    pub fn ist_verbunden(&self) -> bool {
        self.aktiv.as_ref().is_some_and(|v| v.ist_verbunden())
    }

    pub fn vorgemerkter_kanal(&self) -> Option<&ChannelId> {
        self.vorgemerkter_kanal.as_ref()
    }

    pub fn auto_reconnect(&self) -> bool {
        self.auto_reconnect
    }

    /// Installiert `neu` als aktive Verbindung und gibt die ersetzte zurueck
    pub fn installieren(&mut self, neu: Arc<dyn VoiceConnection>) -> Option<Arc<dyn VoiceConnection>> {
        self.aktiv.replace(neu)
    }

    pub fn entnehmen(&mut self) -> Option<Arc<dyn VoiceConnection>> {
        self.aktiv.take()
    }

    /// Entnimmt die aktive Verbindung nur, wenn sie `id` hat
    pub fn entnehmen_wenn(&mut self, id: VerbindungsId) -> Option<Arc<dyn VoiceConnection>> {
        if self.aktiv.as_ref().is_some_and(|v| v.id() == id) {
            self.aktiv.take()
        } else {
            None
        }
    }

    pub fn ist_entfernt(&self) -> bool {
        self.entfernt
    }
}

// ---------------------------------------------------------------------------
// GuildVoiceState
// ---------------------------------------------------------------------------

/// Voice-Zustand einer einzelnen Guild
pub struct GuildVoiceState {
    guild_id: GuildId,
    gate: Mutex<VerbindungsSlot>,
    events: broadcast::Sender<VerbindungsEvent>,
}

impl GuildVoiceState {
    pub fn neu(guild_id: GuildId, auto_reconnect: bool) -> Self {
        let (events, _) = broadcast::channel(EVENT_KANAL_GROESSE);
        Self {
            guild_id,
            gate: Mutex::new(VerbindungsSlot {
                aktiv: None,
                vorgemerkter_kanal: None,
                auto_reconnect,
                entfernt: false,
            }),
            events,
        }
    }

    pub fn guild_id(&self) -> &GuildId {
        &self.guild_id
    }

    /// Sperrt das Gate der Guild
    ///
    /// Blockiert, solange ein anderer Pfad (Notification, Disconnect) fuer
    /// dieselbe Guild das Gate haelt. Das Gate darf nie ueber ein `.await`
    /// gehalten werden.
    pub fn sperren(&self) -> MutexGuard<'_, VerbindungsSlot> {
        self.gate.lock()
    }

    pub fn ist_verbunden(&self) -> bool {
        self.gate.lock().ist_verbunden()
    }

    pub fn aktive_verbindung(&self) -> Option<Arc<dyn VoiceConnection>> {
        self.gate.lock().aktiv.clone()
    }

    /// Merkt einen Ziel-Kanal fuer die naechste Verbindung vor
    pub fn kanal_vormerken(&self, kanal_id: Option<ChannelId>) {
        self.gate.lock().vorgemerkter_kanal = kanal_id;
    }

    pub fn vorgemerkter_kanal(&self) -> Option<ChannelId> {
        self.gate.lock().vorgemerkter_kanal.clone()
    }

    pub fn auto_reconnect_setzen(&self, aktiv: bool) {
        self.gate.lock().auto_reconnect = aktiv;
    }

    pub fn auto_reconnect(&self) -> bool {
        self.gate.lock().auto_reconnect
    }

    /// Externer Disconnect: schliesst die aktive Verbindung unter dem Gate
    ///
    /// Gibt `true` zurueck wenn eine Verbindung geschlossen wurde.
    pub fn verbindung_schliessen(&self) -> bool {
        let mut slot = self.gate.lock();
        self.schliessen_unter_gate(&mut slot)
    }

    /// Markiert den State als entfernt und schliesst die aktive Verbindung
    fn stilllegen(&self) {
        let mut slot = self.gate.lock();
        slot.entfernt = true;
        self.schliessen_unter_gate(&mut slot);
    }

    fn schliessen_unter_gate(&self, slot: &mut VerbindungsSlot) -> bool {
        match slot.entnehmen() {
            Some(verbindung) => {
                tracing::info!(
                    guild_id = %self.guild_id,
                    verbindung = %verbindung.id(),
                    "Voice-Verbindung getrennt"
                );
                verbindung.schliessen();
                true
            }
            None => false,
        }
    }

    /// Abonniert die Verbindungs-Events dieser Guild
    pub fn abonnieren(&self) -> broadcast::Receiver<VerbindungsEvent> {
        self.events.subscribe()
    }

    pub fn event_sender(&self) -> broadcast::Sender<VerbindungsEvent> {
        self.events.clone()
    }
}

// ---------------------------------------------------------------------------
// GuildStateManager
// ---------------------------------------------------------------------------

/// Verwaltet die Guild-States und die ausstehenden Verbindungsversuche
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct GuildStateManager {
    inner: Arc<GuildStateManagerInner>,
}

struct GuildStateManagerInner {
    gilden: DashMap<GuildId, Arc<GuildVoiceState>>,
    /// Verbindungen, deren Handshake gestartet wurde
    ausstehend: DashMap<GuildId, Arc<dyn VoiceConnection>>,
    /// Auto-Reconnect neuer Guild-States
    auto_reconnect_standard: bool,
}

impl GuildStateManager {
    pub fn neu() -> Self {
        Self::mit_auto_reconnect(true)
    }

    pub fn mit_auto_reconnect(auto_reconnect_standard: bool) -> Self {
        Self {
            inner: Arc::new(GuildStateManagerInner {
                gilden: DashMap::new(),
                ausstehend: DashMap::new(),
                auto_reconnect_standard,
            }),
        }
    }

    /// Liefert den State der Guild und legt ihn bei Bedarf an
    pub fn state_holen_oder_erstellen(&self, guild_id: &GuildId) -> Arc<GuildVoiceState> {
        if let Some(state) = self.inner.gilden.get(guild_id) {
            return Arc::clone(state.value());
        }
        let eintrag = self.inner.gilden.entry(guild_id.clone()).or_insert_with(|| {
            tracing::debug!(guild_id = %guild_id, "Guild-Voice-State angelegt");
            Arc::new(GuildVoiceState::neu(
                guild_id.clone(),
                self.inner.auto_reconnect_standard,
            ))
        });
        Arc::clone(eintrag.value())
    }

    pub fn state(&self, guild_id: &GuildId) -> Option<Arc<GuildVoiceState>> {
        self.inner.gilden.get(guild_id).map(|r| Arc::clone(r.value()))
    }

    /// Merkt eine Verbindung mit laufendem Handshake als ausstehend vor
    pub fn ausstehend_registrieren(&self, guild_id: GuildId, verbindung: Arc<dyn VoiceConnection>) {
        self.inner.ausstehend.insert(guild_id, verbindung);
    }

    /// Verwirft einen ausstehenden Verbindungsversuch der Guild
    ///
    /// Eine bereits aufgebaute Verbindung wird nur aus der Buchfuehrung
    /// entfernt, nicht geschlossen. Ist der abgebrochene Versuch die aktive
    /// Verbindung der Guild, wird auch der Slot geleert. Gibt `true`
    /// zurueck wenn ein laufender Versuch abgebrochen wurde.
    ///
    /// Darf nicht unter dem Gate der Guild aufgerufen werden.
    pub fn ausstehende_entfernen(&self, guild_id: &GuildId) -> bool {
        let Some((_, versuch)) = self.inner.ausstehend.remove(guild_id) else {
            return false;
        };
        let zustand = versuch.zustand();
        if versuch.ist_verbunden() || zustand.ist_beendet() {
            return false;
        }
        tracing::debug!(
            guild_id = %guild_id,
            verbindung = %versuch.id(),
            ?zustand,
            "Ausstehender Verbindungsversuch verworfen"
        );
        match self.state(guild_id) {
            Some(state) => {
                let mut slot = state.sperren();
                slot.entnehmen_wenn(versuch.id());
                versuch.schliessen();
            }
            None => versuch.schliessen(),
        }
        true
    }

    pub fn hat_ausstehende(&self, guild_id: &GuildId) -> bool {
        self.inner.ausstehend.contains_key(guild_id)
    }

    /// Entfernt den State der Guild und schliesst deren Verbindung
    pub fn state_entfernen(&self, guild_id: &GuildId) -> bool {
        self.ausstehende_entfernen(guild_id);
        match self.inner.gilden.remove(guild_id) {
            Some((_, state)) => {
                state.stilllegen();
                tracing::debug!(guild_id = %guild_id, "Guild-Voice-State entfernt");
                true
            }
            None => false,
        }
    }

    pub fn gilden_anzahl(&self) -> usize {
        self.inner.gilden.len()
    }

    /// Anzahl der Guilds mit abgeschlossenem Handshake
    pub fn verbundene_gilden(&self) -> usize {
        self.inner
            .gilden
            .iter()
            .filter(|eintrag| eintrag.value().ist_verbunden())
            .count()
    }
}

impl Default for GuildStateManager {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{VerbindungsId, VerbindungsZustand};

    struct TestVerbindung {
        id: VerbindungsId,
        guild_id: GuildId,
        zustand: Mutex<VerbindungsZustand>,
    }

    impl TestVerbindung {
        fn neu(guild: &str, zustand: VerbindungsZustand) -> Arc<Self> {
            Arc::new(Self {
                id: VerbindungsId::new(),
                guild_id: GuildId::from(guild),
                zustand: Mutex::new(zustand),
            })
        }
    }

    impl VoiceConnection for TestVerbindung {
        fn id(&self) -> VerbindungsId {
            self.id
        }
        fn guild_id(&self) -> &GuildId {
            &self.guild_id
        }
        fn endpunkt(&self) -> &str {
            "test.media"
        }
        fn kanal_id(&self) -> Option<&ChannelId> {
            None
        }
        fn zustand(&self) -> VerbindungsZustand {
            *self.zustand.lock()
        }
        fn handshake_starten(&self) {
            *self.zustand.lock() = VerbindungsZustand::Verbunden;
        }
        fn region_wechsel_vorbereiten(&self) {
            *self.zustand.lock() = VerbindungsZustand::RegionWechsel;
        }
        fn schliessen(&self) {
            *self.zustand.lock() = VerbindungsZustand::Geschlossen;
        }
    }

    #[test]
    fn state_wird_einmal_angelegt() {
        let manager = GuildStateManager::neu();
        let gid = GuildId::from("1");

        let a = manager.state_holen_oder_erstellen(&gid);
        let b = manager.state_holen_oder_erstellen(&gid);

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(manager.gilden_anzahl(), 1);
        assert!(a.auto_reconnect());
    }

    #[test]
    fn auto_reconnect_standard_wird_uebernommen() {
        let manager = GuildStateManager::mit_auto_reconnect(false);
        let state = manager.state_holen_oder_erstellen(&GuildId::from("1"));
        assert!(!state.auto_reconnect());
        state.auto_reconnect_setzen(true);
        assert!(state.sperren().auto_reconnect());
    }

    #[test]
    fn ausstehender_versuch_wird_geschlossen() {
        let manager = GuildStateManager::neu();
        let gid = GuildId::from("1");
        let versuch = TestVerbindung::neu("1", VerbindungsZustand::Verbindet);
        manager.ausstehend_registrieren(gid.clone(), versuch.clone());

        assert!(manager.ausstehende_entfernen(&gid));
        assert_eq!(versuch.zustand(), VerbindungsZustand::Geschlossen);
        assert!(!manager.hat_ausstehende(&gid));
    }

    #[test]
    fn verworfener_versuch_verlaesst_den_slot() {
        let manager = GuildStateManager::neu();
        let gid = GuildId::from("1");
        let state = manager.state_holen_oder_erstellen(&gid);
        let versuch = TestVerbindung::neu("1", VerbindungsZustand::Verbindet);
        state.sperren().installieren(versuch.clone());
        manager.ausstehend_registrieren(gid.clone(), versuch.clone());

        assert!(manager.ausstehende_entfernen(&gid));
        assert_eq!(versuch.zustand(), VerbindungsZustand::Geschlossen);
        assert!(state.aktive_verbindung().is_none());
    }

    #[test]
    fn verworfener_versuch_laesst_andere_aktive_verbindung_stehen() {
        let manager = GuildStateManager::neu();
        let gid = GuildId::from("1");
        let state = manager.state_holen_oder_erstellen(&gid);
        let aktiv = TestVerbindung::neu("1", VerbindungsZustand::Verbindet);
        let versuch = TestVerbindung::neu("1", VerbindungsZustand::Verbindet);
        state.sperren().installieren(aktiv.clone());
        manager.ausstehend_registrieren(gid.clone(), versuch.clone());

        assert!(manager.ausstehende_entfernen(&gid));
        assert_eq!(state.aktive_verbindung().unwrap().id(), aktiv.id());
        assert_eq!(aktiv.zustand(), VerbindungsZustand::Verbindet);
    }

    #[test]
    fn aufgebaute_verbindung_bleibt_offen() {
        let manager = GuildStateManager::neu();
        let gid = GuildId::from("1");
        let verbindung = TestVerbindung::neu("1", VerbindungsZustand::Verbunden);
        manager.ausstehend_registrieren(gid.clone(), verbindung.clone());

        assert!(!manager.ausstehende_entfernen(&gid));
        assert_eq!(verbindung.zustand(), VerbindungsZustand::Verbunden);
        assert!(!manager.hat_ausstehende(&gid));
    }

    #[test]
    fn ohne_ausstehenden_versuch_nichts_zu_tun() {
        let manager = GuildStateManager::neu();
        assert!(!manager.ausstehende_entfernen(&GuildId::from("unbekannt")));
    }

    #[test]
    fn externer_disconnect_schliesst_aktive_verbindung() {
        let state = GuildVoiceState::neu(GuildId::from("1"), true);
        let verbindung = TestVerbindung::neu("1", VerbindungsZustand::Verbunden);
        state.sperren().installieren(verbindung.clone());
        assert!(state.ist_verbunden());

        assert!(state.verbindung_schliessen());
        assert_eq!(verbindung.zustand(), VerbindungsZustand::Geschlossen);
        assert!(state.aktive_verbindung().is_none());
        assert!(!state.verbindung_schliessen());
    }

    #[test]
    fn state_entfernen_schliesst_verbindung() {
        let manager = GuildStateManager::neu();
        let gid = GuildId::from("1");
        let verbindung = TestVerbindung::neu("1", VerbindungsZustand::Verbunden);
        manager
            .state_holen_oder_erstellen(&gid)
            .sperren()
            .installieren(verbindung.clone());
        assert_eq!(manager.verbundene_gilden(), 1);

        assert!(manager.state_entfernen(&gid));
        assert_eq!(verbindung.zustand(), VerbindungsZustand::Geschlossen);
        assert!(manager.state(&gid).is_none());
        assert_eq!(manager.verbundene_gilden(), 0);
    }

    #[test]
    fn entfernter_state_ist_markiert() {
        let manager = GuildStateManager::neu();
        let gid = GuildId::from("1");
        let alt = manager.state_holen_oder_erstellen(&gid);
        assert!(!alt.sperren().ist_entfernt());

        assert!(manager.state_entfernen(&gid));
        assert!(alt.sperren().ist_entfernt());

        let neu = manager.state_holen_oder_erstellen(&gid);
        assert!(!Arc::ptr_eq(&alt, &neu));
        assert!(!neu.sperren().ist_entfernt());
    }

    #[test]
    fn kanal_vormerken() {
        let state = GuildVoiceState::neu(GuildId::from("1"), true);
        state.kanal_vormerken(Some(ChannelId::from("99")));
        assert_eq!(state.vorgemerkter_kanal(), Some(ChannelId::from("99")));
        assert_eq!(
            state.sperren().vorgemerkter_kanal(),
            Some(&ChannelId::from("99"))
        );
    }
}
