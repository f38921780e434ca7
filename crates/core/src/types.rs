//! Gemeinsame Typen fuer Podium
//!
//! Kanalnamen und Credentials verwenden das Newtype-Pattern, damit ein
//! ungeprueftes `String` nie versehentlich an die Engine durchgereicht wird.

use serde::{Deserialize, Serialize};

use crate::error::{PodiumError, Result};

/// Eindeutige Teilnehmer-ID, vom Transport vergeben
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub u32);

impl From<u32> for PeerId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Gepruefter Kanalname (mindestens [`ChannelName::MIN_LAENGE`] Zeichen)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ChannelName(String);

impl ChannelName {
    /// Minimale Laenge in Zeichen
    pub const MIN_LAENGE: usize = 4;

    /// Prueft einen Kanalnamen, bevor irgendein Netzwerk- oder Engine-Aufruf erfolgt
    pub fn parse(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let laenge = name.chars().count();
        if laenge == 0 {
            return Err(PodiumError::Validierung("Kanalname fehlt".into()));
        }
        if laenge < Self::MIN_LAENGE {
            return Err(PodiumError::Validierung(format!(
                "Kanalname '{name}' zu kurz: {laenge} Zeichen, mindestens {} erforderlich",
                Self::MIN_LAENGE
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ChannelName {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let roh = String::deserialize(deserializer)?;
        Self::parse(roh).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for ChannelName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaker Beitritts-Token, pro Beitrittsversuch frisch geholt
///
/// `Debug` gibt den Inhalt nicht aus, damit Tokens nicht im Log landen.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Gibt den rohen Token zurueck (nur fuer die Engine bestimmt)
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential(<{} Bytes>)", self.0.len())
    }
}

/// Rolle des lokalen Teilnehmers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Nur Empfang
    Audience,
    /// Darf Audio senden
    Broadcaster,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Audience => write!(f, "audience"),
            Self::Broadcaster => write!(f, "broadcaster"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = PodiumError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "audience" | "zuhoerer" => Ok(Self::Audience),
            "broadcaster" | "sprecher" => Ok(Self::Broadcaster),
            anders => Err(PodiumError::Validierung(format!("Unbekannte Rolle: {anders}"))),
        }
    }
}

/// Lebenszyklus einer Kanal-Session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Connecting,
    Joined,
    Leaving,
}

impl SessionState {
    /// Laeuft gerade ein Beitritt oder Austritt?
    pub fn ist_uebergang(&self) -> bool {
        matches!(self, Self::Connecting | Self::Leaving)
    }
}

/// Kanalprofil, das nach dem Beitritt an die Engine gemeldet wird
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelProfile {
    /// Alle Teilnehmer gleichberechtigt
    Communication,
    /// Sprecher und Zuhoerer getrennt
    #[default]
    LiveBroadcasting,
}
