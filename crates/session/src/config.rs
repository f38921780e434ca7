//! Session-Konfiguration
//!
//! Teil der Anwendungskonfiguration (`[sitzung]`). Alle Felder haben
//! Standardwerte.

use std::time::Duration;

use podium_core::ChannelProfile;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Profil, das nach dem Beitritt gesetzt wird
    pub kanalprofil: ChannelProfile,
    /// Lautsprecher statt Hoermuschel nach dem Beitritt
    pub lautsprecher: bool,
    /// Groesse der Befehlswarteschlange zum Session-Task
    pub befehls_queue: usize,
    /// Groesse des Engine-Ereigniskanals
    pub event_queue: usize,
    /// Wartezeit auf `ChannelJoined` nach angenommenen Beitrittsbefehlen
    pub beitritt_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            kanalprofil: ChannelProfile::LiveBroadcasting,
            lautsprecher: true,
            befehls_queue: 32,
            event_queue: 256,
            beitritt_timeout_ms: 10_000,
        }
    }
}

impl SessionConfig {
    pub fn beitritt_frist(&self) -> Duration {
        Duration::from_millis(self.beitritt_timeout_ms)
    }
}
