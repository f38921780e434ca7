//! Lesesicht fuer die Praesentationsschicht
//!
//! Unveraenderliche Kopie des Session-Zustands. Wird nach jeder Aenderung neu
//! ueber einen `watch`-Kanal veroeffentlicht.

use podium_core::{ChannelName, PeerId, Role, SessionState};
use serde::Serialize;

use crate::registry::LogEintrag;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub zustand: SessionState,
    pub kanal: Option<ChannelName>,
    /// Eigene ID laut `ChannelJoined`
    pub lokale_id: Option<PeerId>,
    /// Nur im Zustand `Joined` gesetzt
    pub rolle: Option<Role>,
    /// Nur im Zustand `Joined` gesetzt
    pub rederecht: Option<bool>,
    /// Als Zuhoerer beigetreten, Rederecht kann angefragt werden
    pub rederecht_verfolgt: bool,
    pub peers: Vec<PeerId>,
    pub protokoll: Vec<LogEintrag>,
    pub lautsprecher: bool,
    pub letzter_fehler: Option<String>,
}

impl SessionSnapshot {
    pub fn ist_beigetreten(&self) -> bool {
        self.zustand == SessionState::Joined
    }

    /// Darf die Oberflaeche "Frage stellen" / "Antwort erhalten" anbieten?
    pub fn rederecht_verfuegbar(&self) -> bool {
        self.ist_beigetreten() && self.rederecht_verfolgt
    }
}
