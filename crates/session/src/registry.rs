//! Peer-Registry – Teilnehmer im Kanal und Ereignisprotokoll
//!
//! Die Menge der entfernten Teilnehmer ist duplikatfrei. Das Protokoll dagegen
//! nimmt jedes gemeldete Ereignis auf, auch doppelte Beitritte und Austritte
//! unbekannter IDs, damit Auffaelligkeiten der Engine sichtbar bleiben.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use podium_core::PeerId;
use serde::Serialize;

/// Ein Eintrag im Ereignisprotokoll (nur Anzeige, steuert keine Logik)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEintrag {
    /// Fortlaufende Nummer, auch ueber `reset()` hinweg eindeutig
    pub sequenz: u64,
    pub zeitpunkt: DateTime<Utc>,
    pub text: String,
}

/// Teilnehmer-Menge plus Protokoll
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: BTreeSet<PeerId>,
    protokoll: Vec<LogEintrag>,
    naechste_sequenz: u64,
}

impl PeerRegistry {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Teilnehmer beigetreten. Gibt true zurueck wenn er neu in der Menge ist.
    pub fn on_peer_joined(&mut self, peer: PeerId) -> bool {
        let neu = self.peers.insert(peer);
        self.log_entry(format!("{peer} joined the event"));
        if !neu {
            tracing::debug!(peer = %peer, "Doppelter Beitritt gemeldet");
        }
        neu
    }

    /// Teilnehmer verlassen. Gibt true zurueck wenn er in der Menge war.
    pub fn on_peer_left(&mut self, peer: PeerId) -> bool {
        let war_da = self.peers.remove(&peer);
        self.log_entry(format!("{peer} left the event"));
        if !war_da {
            tracing::warn!(peer = %peer, "Austritt eines unbekannten Teilnehmers");
        }
        war_da
    }

    /// Leert Menge und Protokoll
    pub fn reset(&mut self) {
        self.peers.clear();
        self.protokoll.clear();
    }

    /// Haengt einen freien Protokolleintrag an
    pub fn log_entry(&mut self, text: impl Into<String>) {
        let eintrag = LogEintrag {
            sequenz: self.naechste_sequenz,
            zeitpunkt: Utc::now(),
            text: text.into(),
        };
        self.naechste_sequenz += 1;
        self.protokoll.push(eintrag);
    }

    /// Aktuelle Teilnehmer, aufsteigend sortiert
    pub fn peers(&self) -> Vec<PeerId> {
        self.peers.iter().copied().collect()
    }

    pub fn enthaelt(&self, peer: PeerId) -> bool {
        self.peers.contains(&peer)
    }

    pub fn anzahl(&self) -> usize {
        self.peers.len()
    }

    pub fn protokoll(&self) -> &[LogEintrag] {
        &self.protokoll
    }
}
