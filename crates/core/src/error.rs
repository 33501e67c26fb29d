//! Fehlertypen fuer voxgate
//!
//! `UngueltigesArgument` wird synchron an den Aufrufer gemeldet,
//! `Transport` entweder synchron beim Bau einer Verbindung oder asynchron
//! ueber den Status-Kanal der Verbindung.

use thiserror::Error;

/// Result-Alias fuer Koordinator und Transport
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

/// Alle Fehler beim Verarbeiten von Voice-Server-Zuweisungen
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Fehlerhafte Notification (Session-ID, Guild-ID oder Token fehlt)
    #[error("Ungueltiges Argument: {0}")]
    UngueltigesArgument(String),

    /// Verbindung konnte nicht gebaut oder ausgehandelt werden
    #[error("Transportfehler: {0}")]
    Transport(String),

    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl ProtocolError {
    /// Erstellt einen Validierungsfehler
    pub fn ungueltig(msg: impl Into<String>) -> Self {
        Self::UngueltigesArgument(msg.into())
    }

    /// Erstellt einen Transportfehler
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Erstellt einen internen Fehler
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Validierungsfehler duerfen mit demselben Payload nicht wiederholt werden
    pub fn ist_wiederholbar(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = ProtocolError::ungueltig("Session-ID fehlt");
        assert_eq!(e.to_string(), "Ungueltiges Argument: Session-ID fehlt");
    }

    #[test]
    fn nur_transport_ist_wiederholbar() {
        assert!(ProtocolError::transport("timeout").ist_wiederholbar());
        assert!(!ProtocolError::ungueltig("guild_id").ist_wiederholbar());
        assert!(!ProtocolError::intern("x").ist_wiederholbar());
    }
}
