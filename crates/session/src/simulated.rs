//! Simulierte Engine und simulierter Token-Dienst
//!
//! Laufen komplett im Prozess: jeder Befehl wird aufgezeichnet, einzelne
//! Befehlsarten koennen gezielt zum Fehlschlagen gebracht oder angehalten
//! werden. Genutzt von
//! der Konsolen-Anwendung (Offline-Betrieb) und von den Tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use podium_core::{ChannelName, ChannelProfile, Credential, EngineEvent, PeerId, Role};
use tokio::sync::{mpsc, Semaphore};

use crate::engine::{CredentialFetcher, RealtimeEngine};

// ---------------------------------------------------------------------------
// Aufgezeichnete Befehle
// ---------------------------------------------------------------------------

/// Art eines Engine-Befehls (fuer Fehler-Skripte)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BefehlsArt {
    Join,
    Leave,
    SetRole,
    EnableAudio,
    DisableAudio,
    SetChannelProfile,
    SetSpeakerphone,
}

/// Ein an die Engine gesendeter Befehl
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineBefehl {
    Join { kanal: String, rolle: Role },
    Leave,
    SetRole(Role),
    EnableAudio,
    DisableAudio,
    SetChannelProfile(ChannelProfile),
    SetSpeakerphone(bool),
}

impl EngineBefehl {
    pub fn art(&self) -> BefehlsArt {
        match self {
            Self::Join { .. } => BefehlsArt::Join,
            Self::Leave => BefehlsArt::Leave,
            Self::SetRole(_) => BefehlsArt::SetRole,
            Self::EnableAudio => BefehlsArt::EnableAudio,
            Self::DisableAudio => BefehlsArt::DisableAudio,
            Self::SetChannelProfile(_) => BefehlsArt::SetChannelProfile,
            Self::SetSpeakerphone(_) => BefehlsArt::SetSpeakerphone,
        }
    }
}

// ---------------------------------------------------------------------------
// SimulatedEngine
// ---------------------------------------------------------------------------

/// In-Prozess-Engine
///
/// Clone teilt den inneren Zustand (Befehlsliste, Fehler-Skript, Event-Sender).
#[derive(Clone)]
pub struct SimulatedEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    /// Alle versuchten Befehle, auch fehlgeschlagene
    befehle: Mutex<Vec<EngineBefehl>>,
    /// Befehlsarten, die mit Fehler antworten
    fehler: Mutex<HashSet<BefehlsArt>>,
    /// Befehlsarten, die bis zu einer Freigabe warten
    angehalten: Mutex<HashSet<BefehlsArt>>,
    freigabe: Semaphore,
    /// `ChannelJoined` nach `join` melden
    bestaetigen: AtomicBool,
    /// Ereigniskanal zum Session-Koordinator
    events: mpsc::Sender<EngineEvent>,
    /// Lokale ID, die nach einem Beitritt gemeldet wird
    lokale_id: PeerId,
}

impl SimulatedEngine {
    /// Erstellt eine neue Engine samt Ereigniskanal
    pub fn neu(lokale_id: PeerId, event_queue: usize) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (events, rx) = mpsc::channel(event_queue.max(1));
        let engine = Self {
            inner: Arc::new(EngineInner {
                befehle: Mutex::new(Vec::new()),
                fehler: Mutex::new(HashSet::new()),
                angehalten: Mutex::new(HashSet::new()),
                freigabe: Semaphore::new(0),
                bestaetigen: AtomicBool::new(true),
                events,
                lokale_id,
            }),
        };
        (engine, rx)
    }

    /// Laesst alle kuenftigen Befehle dieser Art fehlschlagen
    pub fn fehlschlagen_bei(&self, art: BefehlsArt) {
        self.inner.fehler.lock().insert(art);
    }

    /// Hebt ein Fehler-Skript wieder auf
    pub fn wieder_erfolgreich(&self, art: BefehlsArt) {
        self.inner.fehler.lock().remove(&art);
    }

    /// Befehle dieser Art warten nach dem Aufzeichnen auf [`fortsetzen`](Self::fortsetzen)
    pub fn anhalten_bei(&self, art: BefehlsArt) {
        self.inner.angehalten.lock().insert(art);
    }

    /// Gibt genau einen wartenden (oder kuenftigen) angehaltenen Befehl frei
    pub fn fortsetzen(&self) {
        self.inner.freigabe.add_permits(1);
    }

    /// Schaltet die `ChannelJoined`-Meldung nach `join` ab oder wieder an
    pub fn beitritt_bestaetigen(&self, aktiv: bool) {
        self.inner.bestaetigen.store(aktiv, Ordering::Relaxed);
    }

    /// Gibt alle bisher versuchten Befehle zurueck
    pub fn befehle(&self) -> Vec<EngineBefehl> {
        self.inner.befehle.lock().clone()
    }

    /// Leert die Befehlsliste
    pub fn befehle_leeren(&self) {
        self.inner.befehle.lock().clear();
    }

    /// Speist ein beliebiges Ereignis in den Ereigniskanal ein
    pub async fn inject(&self, event: EngineEvent) -> anyhow::Result<()> {
        self.inner
            .events
            .send(event)
            .await
            .map_err(|_| anyhow::anyhow!("Ereigniskanal geschlossen"))
    }

    async fn ausfuehren(&self, befehl: EngineBefehl) -> anyhow::Result<()> {
        let art = befehl.art();
        tracing::debug!(befehl = ?befehl, "Simulierte Engine: Befehl");
        self.inner.befehle.lock().push(befehl);

        let angehalten = self.inner.angehalten.lock().contains(&art);
        if angehalten {
            self.inner.freigabe.acquire().await?.forget();
        }

        if self.inner.fehler.lock().contains(&art) {
            anyhow::bail!("simulierter Fehler bei {art:?}");
        }
        Ok(())
    }
}

#[async_trait]
impl RealtimeEngine for SimulatedEngine {
    async fn join(
        &self,
        _credential: &Credential,
        kanal: &ChannelName,
        rolle: Role,
    ) -> anyhow::Result<()> {
        self.ausfuehren(EngineBefehl::Join {
            kanal: kanal.to_string(),
            rolle,
        })
        .await?;

        if !self.inner.bestaetigen.load(Ordering::Relaxed) {
            return Ok(());
        }

        // Echte Engines melden den Beitritt asynchron
        let event = EngineEvent::ChannelJoined {
            channel: kanal.clone(),
            local_id: self.inner.lokale_id,
        };
        if self.inner.events.try_send(event).is_err() {
            tracing::warn!(channel = %kanal, "ChannelJoined konnte nicht zugestellt werden");
        }
        Ok(())
    }

    async fn leave(&self) -> anyhow::Result<()> {
        self.ausfuehren(EngineBefehl::Leave).await
    }

    async fn set_role(&self, rolle: Role) -> anyhow::Result<()> {
        self.ausfuehren(EngineBefehl::SetRole(rolle)).await
    }

    async fn enable_audio(&self) -> anyhow::Result<()> {
        self.ausfuehren(EngineBefehl::EnableAudio).await
    }

    async fn disable_audio(&self) -> anyhow::Result<()> {
        self.ausfuehren(EngineBefehl::DisableAudio).await
    }

    async fn set_channel_profile(&self, profil: ChannelProfile) -> anyhow::Result<()> {
        self.ausfuehren(EngineBefehl::SetChannelProfile(profil)).await
    }

    async fn set_speakerphone(&self, aktiv: bool) -> anyhow::Result<()> {
        self.ausfuehren(EngineBefehl::SetSpeakerphone(aktiv)).await
    }
}

// ---------------------------------------------------------------------------
// SimulatedCredentials
// ---------------------------------------------------------------------------

/// Token-Dienst ohne Netzwerk
///
/// Optional angehalten: `fetch` wartet dann, bis [`freigeben`](Self::freigeben)
/// aufgerufen wird. So laesst sich ein Beitritt im Zustand `Connecting` festhalten.
pub struct SimulatedCredentials {
    abrufe: Mutex<Vec<ChannelName>>,
    fehler: Mutex<Option<String>>,
    sperre: Option<Semaphore>,
    zaehler: AtomicU64,
}

impl SimulatedCredentials {
    pub fn neu() -> Self {
        Self {
            abrufe: Mutex::new(Vec::new()),
            fehler: Mutex::new(None),
            sperre: None,
            zaehler: AtomicU64::new(0),
        }
    }

    /// Jeder Abruf wartet auf eine Freigabe
    pub fn angehalten() -> Self {
        Self {
            sperre: Some(Semaphore::new(0)),
            ..Self::neu()
        }
    }

    /// Gibt genau einen wartenden (oder kuenftigen) Abruf frei
    pub fn freigeben(&self) {
        if let Some(sperre) = &self.sperre {
            sperre.add_permits(1);
        }
    }

    /// Laesst kuenftige Abrufe mit der Nachricht fehlschlagen (`None` = wieder erfolgreich)
    pub fn fehlschlagen(&self, nachricht: Option<&str>) {
        *self.fehler.lock() = nachricht.map(str::to_string);
    }

    /// Kanalnamen aller bisherigen Abrufe
    pub fn abrufe(&self) -> Vec<ChannelName> {
        self.abrufe.lock().clone()
    }
}

impl Default for SimulatedCredentials {
    fn default() -> Self {
        Self::neu()
    }
}

#[async_trait]
impl CredentialFetcher for SimulatedCredentials {
    async fn fetch(&self, kanal: &ChannelName) -> anyhow::Result<Credential> {
        self.abrufe.lock().push(kanal.clone());

        if let Some(sperre) = &self.sperre {
            sperre.acquire().await?.forget();
        }

        if let Some(nachricht) = self.fehler.lock().clone() {
            anyhow::bail!(nachricht);
        }

        let n = self.zaehler.fetch_add(1, Ordering::Relaxed);
        Ok(Credential::new(format!("sim-{kanal}-{n}")))
    }
}
