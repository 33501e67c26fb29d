//! Voice-Server-Update-Handler – Koordinator der Voice-Sessions
//!
//! Verarbeitet `VOICE_SERVER_UPDATE`-Notifications und entscheidet pro
//! Guild zwischen Verbindungsaufbau, Region-Wechsel und Warten auf einen
//! Endpunkt.
//!
//! ## Reihenfolge
//! 1. Validierung (Session-ID, Guild-ID)
//! 2. Ausstehenden Verbindungsversuch der Guild verwerfen – auch wenn noch
//!    kein Endpunkt zugewiesen ist
//! 3. Endpunkt normalisieren, Token pruefen
//! 4. Gate der Guild sperren (bis zum Ende gehalten)
//! 5. Registry atomar tauschen, Region-Wechsel erkennen
//! 6. Neue Verbindung bauen
//! 7. Migrations-Hook der alten Verbindung, dann installieren und die
//!    ersetzte Verbindung schliessen
//! 8. Handshake asynchron starten
//!
//! Mehrfach zugestellte Updates mit identischem Endpunkt sind unkritisch:
//! sie bauen die Verbindung neu auf, ohne Migrations-Hook.

use parking_lot::MutexGuard;
use std::sync::Arc;
use voxgate_core::error::{ProtocolError, ProtocolResult};
use voxgate_core::event::VoiceServerUpdate;
use voxgate_core::types::{GuildId, SessionId};

use crate::connection::{ConnectionFactory, VerbindungsParameter};
use crate::endpoint::{self, STANDARD_PORT_SUFFIX};
use crate::registry::SessionRegistry;
use crate::state::{GuildStateManager, GuildVoiceState, VerbindungsSlot};

/// Ergebnis einer verarbeiteten Notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uebergang {
    /// Noch kein Endpunkt zugewiesen, es folgt ein weiteres Update
    Zurueckgestellt,
    /// Neue Verbindung ohne Migration (Erstverbindung oder erneute Zustellung)
    Verbindungsaufbau,
    /// Aktive Verbindung wurde auf einen neuen Endpunkt migriert
    RegionWechsel,
}

impl Uebergang {
    /// Label fuer Logs und Metriken
    pub fn als_str(self) -> &'static str {
        match self {
            Self::Zurueckgestellt => "zurueckgestellt",
            Self::Verbindungsaufbau => "verbindungsaufbau",
            Self::RegionWechsel => "region_wechsel",
        }
    }
}

/// Koordinator fuer Voice-Server-Zuweisungen
///
/// Clone-faehig; alle Kopien teilen Registry und Guild-States.
#[derive(Clone)]
pub struct VoiceServerUpdateHandler {
    gilden: GuildStateManager,
    registry: SessionRegistry,
    factory: Arc<dyn ConnectionFactory>,
    port_suffix: String,
}

impl VoiceServerUpdateHandler {
    pub fn neu(gilden: GuildStateManager, factory: Arc<dyn ConnectionFactory>) -> Self {
        Self {
            gilden,
            registry: SessionRegistry::neu(),
            factory,
            port_suffix: STANDARD_PORT_SUFFIX.to_owned(),
        }
    }

    /// Ueberschreibt den zu entfernenden Port-Suffix (Standard `:80`)
    pub fn mit_port_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.port_suffix = suffix.into();
        self
    }

    pub fn gilden(&self) -> &GuildStateManager {
        &self.gilden
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Verarbeitet eine Voice-Server-Zuweisung
    ///
    /// Eine fehlende Session-ID wird als leerer String uebergeben.
    /// Validierungsfehler treten auf, bevor irgendein Zustand veraendert
    /// wird. Fehler des Handshakes kommen nicht hier an, sondern ueber den
    /// Status-Kanal der Guild.
    pub fn handle(&self, session_id: &str, update: VoiceServerUpdate) -> ProtocolResult<Uebergang> {
        if session_id.is_empty() {
            return Err(ProtocolError::ungueltig("Session-ID fehlt oder ist leer"));
        }
        let guild_id = match update.guild_id {
            Some(gid) if !gid.is_empty() => gid,
            _ => {
                return Err(ProtocolError::ungueltig(
                    "VOICE_SERVER_UPDATE ohne guild_id",
                ))
            }
        };
        let session_id = SessionId::from(session_id);

        // Laufende Aushandlung fuer einen womoeglich veralteten Endpunkt abbrechen
        self.gilden.ausstehende_entfernen(&guild_id);

        let endpunkt = update
            .endpoint
            .as_deref()
            .map(|e| endpoint::normalisieren(e, &self.port_suffix))
            .filter(|e| !e.is_empty());
        let Some(endpunkt) = endpunkt else {
            tracing::debug!(
                guild_id = %guild_id,
                session_id = %session_id,
                "Noch kein Voice-Server zugewiesen, warte auf weiteres Update"
            );
            return Ok(Uebergang::Zurueckgestellt);
        };

        let token = update
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProtocolError::ungueltig("VOICE_SERVER_UPDATE mit Endpunkt, aber ohne Token"))?;

        self.verbinden(guild_id, session_id, endpunkt, token)
    }

    fn verbinden(
        &self,
        guild_id: GuildId,
        session_id: SessionId,
        endpunkt: String,
        token: String,
    ) -> ProtocolResult<Uebergang> {
        let mut state = self.gilden.state_holen_oder_erstellen(&guild_id);
        loop {
            let slot = state.sperren();
            if !slot.ist_entfernt() {
                return self.verbinden_unter_gate(&state, slot, guild_id, session_id, endpunkt, token);
            }
            // Parallel entfernter State nimmt keine Verbindung mehr an
            drop(slot);
            state = self.gilden.state_holen_oder_erstellen(&guild_id);
        }
    }

    fn verbinden_unter_gate(
        &self,
        state: &GuildVoiceState,
        mut slot: MutexGuard<'_, VerbindungsSlot>,
        guild_id: GuildId,
        session_id: SessionId,
        endpunkt: String,
        token: String,
    ) -> ProtocolResult<Uebergang> {
        let vorheriger = self
            .registry
            .endpunkt_ersetzen(session_id.clone(), endpunkt.clone());
        let region_wechsel =
            slot.ist_verbunden() && vorheriger.as_deref() != Some(endpunkt.as_str());

        let parameter = VerbindungsParameter {
            endpunkt: endpunkt.clone(),
            guild_id: guild_id.clone(),
            session_id: session_id.clone(),
            token,
            auto_reconnect: slot.auto_reconnect(),
            kanal_id: slot.vorgemerkter_kanal().cloned(),
            events: state.event_sender(),
        };

        let neu = match self.factory.bauen(parameter) {
            Ok(verbindung) => verbindung,
            Err(e) => {
                self.registry.zuruecksetzen(session_id, &endpunkt, vorheriger);
                tracing::warn!(
                    guild_id = %guild_id,
                    endpunkt = %endpunkt,
                    fehler = %e,
                    "Voice-Verbindung konnte nicht gebaut werden"
                );
                return Err(e);
            }
        };

        if region_wechsel {
            if let Some(alt) = slot.aktive_verbindung() {
                tracing::info!(
                    guild_id = %guild_id,
                    von = ?vorheriger,
                    nach = %endpunkt,
                    verbindung = %alt.id(),
                    "Region-Wechsel – alte Verbindung wird migriert"
                );
                alt.region_wechsel_vorbereiten();
            }
        }

        if let Some(alt) = slot.installieren(Arc::clone(&neu)) {
            alt.schliessen();
        }
        self.gilden
            .ausstehend_registrieren(guild_id.clone(), Arc::clone(&neu));
        neu.handshake_starten();

        let uebergang = if region_wechsel {
            Uebergang::RegionWechsel
        } else {
            Uebergang::Verbindungsaufbau
        };
        tracing::info!(
            guild_id = %guild_id,
            session_id = %session_id,
            endpunkt = %endpunkt,
            verbindung = %neu.id(),
            uebergang = uebergang.als_str(),
            "Voice-Verbindung installiert"
        );
        Ok(uebergang)
    }
}
