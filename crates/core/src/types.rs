//! Identifikationstypen fuer voxgate
//!
//! Die Plattform liefert alle IDs als Strings (Snowflakes bzw. opake
//! Session-Kennungen). Newtypes verhindern Verwechslungen zwischen Guild-,
//! Session-, Kanal- und Benutzer-IDs zur Compilezeit.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $praefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Erstellt die ID aus einem beliebigen String
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Gibt die ID als `&str` zurueck
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Leere IDs gelten als nicht vorhanden
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($praefix, ":{}"), self.0)
            }
        }
    };
}

string_id!(
    /// Guild (Server) der Plattform – pro Guild hoechstens eine Voice-Verbindung
    GuildId,
    "guild"
);

string_id!(
    /// Kennung einer Gateway-Session des Clients
    SessionId,
    "session"
);

string_id!(
    /// Voice-Kanal innerhalb einer Guild
    ChannelId,
    "channel"
);

string_id!(
    /// Benutzerkonto des lokalen Clients
    UserId,
    "user"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mit_praefix() {
        assert_eq!(GuildId::from("41771983423143937").to_string(), "guild:41771983423143937");
        assert_eq!(SessionId::from("abc").to_string(), "session:abc");
    }

    #[test]
    fn leere_id_erkannt() {
        assert!(GuildId::new("").is_empty());
        assert!(!ChannelId::new("1").is_empty());
    }

    #[test]
    fn ids_sind_transparent_serialisiert() {
        let gid = GuildId::from("123");
        assert_eq!(serde_json::to_string(&gid).unwrap(), "\"123\"");
        let zurueck: GuildId = serde_json::from_str("\"123\"").unwrap();
        assert_eq!(zurueck, gid);
    }
}
