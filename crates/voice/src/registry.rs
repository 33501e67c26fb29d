//! Session-Registry – letzter bekannter Voice-Endpunkt pro Session
//!
//! Eine Session kann nacheinander mehrere Guild-Verbindungen aufbauen,
//! daher ist die Registry unabhaengig vom Guild-State geschluesselt.
//! Eintraege werden nie explizit geloescht.
//!
//! Thread-safe durch DashMap (Sharded Locks, keine globale Sperre).
//! Lesen-Vergleichen-Schreiben pro Session ist atomar.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use voxgate_core::types::SessionId;

/// Zuordnung SessionId -> letzter normalisierter Endpunkt
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<SessionRegistryInner>,
}

#[derive(Default)]
struct SessionRegistryInner {
    endpunkte: DashMap<SessionId, String>,
}

impl SessionRegistry {
    /// Erstellt eine leere Registry
    pub fn neu() -> Self {
        Self::default()
    }

    /// Letzter verarbeiteter Endpunkt der Session
    pub fn letzter_endpunkt(&self, session_id: &SessionId) -> Option<String> {
        self.inner.endpunkte.get(session_id).map(|r| r.value().clone())
    }

    /// Setzt den Endpunkt und gibt atomar den vorherigen Wert zurueck
    pub fn endpunkt_ersetzen(&self, session_id: SessionId, endpunkt: String) -> Option<String> {
        self.inner.endpunkte.insert(session_id, endpunkt)
    }

    /// Macht ein `endpunkt_ersetzen` rueckgaengig
    ///
    /// Greift nur, wenn der Eintrag noch `erwartet` enthaelt. Hat inzwischen
    /// eine andere Notification derselben Session geschrieben, bleibt deren
    /// Wert stehen.
    pub fn zuruecksetzen(&self, session_id: SessionId, erwartet: &str, vorher: Option<String>) {
        match self.inner.endpunkte.entry(session_id) {
            Entry::Occupied(mut eintrag) if eintrag.get() == erwartet => match vorher {
                Some(alt) => {
                    eintrag.insert(alt);
                }
                None => {
                    eintrag.remove();
                }
            },
            _ => {}
        }
    }

    pub fn anzahl(&self) -> usize {
        self.inner.endpunkte.len()
    }

    pub fn ist_leer(&self) -> bool {
        self.inner.endpunkte.is_empty()
    }
}
