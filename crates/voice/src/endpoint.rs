//! Normalisierung der Voice-Endpunkte
//!
//! Die Kontrollebene haengt an den Host einen Standard-Port (`:80`) an,
//! der fuer den Voice-Gateway bedeutungslos ist.

/// Standard-Port-Suffix der Kontrollebene
pub const STANDARD_PORT_SUFFIX: &str = ":80";

/// Entfernt `suffix` am Ende des Endpunkts und trimmt Leerraum
///
/// Nur ein Suffix am Ende wird entfernt, `host:8080` bleibt unveraendert.
pub fn normalisieren(endpunkt: &str, suffix: &str) -> String {
    let endpunkt = endpunkt.trim();
    if suffix.is_empty() {
        return endpunkt.to_owned();
    }
    endpunkt.strip_suffix(suffix).unwrap_or(endpunkt).to_owned()
}
