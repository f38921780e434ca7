//! Engine-Ereignisse
//!
//! Alles, was die Echtzeit-Engine asynchron meldet. Der Session-Koordinator
//! konsumiert diese Ereignisse in Empfangsreihenfolge ueber einen Kanal.

use serde::{Deserialize, Serialize};

use crate::types::{ChannelName, PeerId};

/// Grund, warum ein Teilnehmer den Kanal verlassen hat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfflineReason {
    /// Teilnehmer hat selbst verlassen
    Quit,
    /// Keine Pakete mehr empfangen (Timeout)
    Dropped,
    /// Sprecher wurde zum Zuhoerer
    BecameAudience,
}

/// Von der Engine gemeldete Ereignisse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "typ", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Warnung – wird nur geloggt
    Warning { code: i32 },
    /// Fataler Fehler fuer die laufende Session
    Error { code: i32 },
    /// Entfernter Teilnehmer ist beigetreten
    PeerJoined { peer: PeerId },
    /// Entfernter Teilnehmer hat verlassen
    PeerLeft { peer: PeerId, reason: OfflineReason },
    /// Lokaler Teilnehmer ist dem Kanal beigetreten
    ChannelJoined { channel: ChannelName, local_id: PeerId },
}

impl EngineEvent {
    /// Kurzname fuer Logs
    pub fn art(&self) -> &'static str {
        match self {
            Self::Warning { .. } => "warning",
            Self::Error { .. } => "error",
            Self::PeerJoined { .. } => "peer_joined",
            Self::PeerLeft { .. } => "peer_left",
            Self::ChannelJoined { .. } => "channel_joined",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_ist_serde_kompatibel() {
        let event = EngineEvent::PeerLeft {
            peer: PeerId(42),
            reason: OfflineReason::Dropped,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"typ\":\"peer_left\""));
        let zurueck: EngineEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(zurueck, event);
    }

    #[test]
    fn channel_joined_prueft_kanalnamen() {
        let json = r#"{"typ":"channel_joined","channel":"ab","local_id":7}"#;
        assert!(serde_json::from_str::<EngineEvent>(json).is_err());
    }

    #[test]
    fn art_fuer_logs() {
        assert_eq!(EngineEvent::Warning { code: 8 }.art(), "warning");
        assert_eq!(EngineEvent::PeerJoined { peer: PeerId(1) }.art(), "peer_joined");
    }
}
