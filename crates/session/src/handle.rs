//! Session-Task und Handle
//!
//! Ein einzelner Tokio-Task besitzt den [`SessionStateMachine`]. Benutzer-
//! befehle kommen ueber eine `mpsc`-Warteschlange mit `oneshot`-Antwort,
//! Engine-Ereignisse ueber den Ereigniskanal der Engine.
//!
//! Waehrend ein Uebergang laeuft (Connecting, Leaving, Rollenwechsel) gilt:
//! - weitere Befehle werden sofort mit `PodiumError::Beschaeftigt` beantwortet
//! - Engine-Ereignisse werden gepuffert und nach dem Uebergang in
//!   Eingangsreihenfolge angewendet, bevor der Aufrufer seine Antwort erhaelt
//!
//! Ein Beitritt ist erst abgeschlossen, wenn die Engine `ChannelJoined` fuer
//! den Kanal meldet. Kommt vorher `Error` oder laeuft die Frist
//! (`beitritt_timeout_ms`) ab, wird der Kanal verlassen und der Aufrufer
//! erhaelt den Fehler.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use podium_core::{EngineEvent, PodiumError, Result, Role, SessionState};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::config::SessionConfig;
use crate::engine::{CredentialFetcher, RealtimeEngine};
use crate::machine::SessionStateMachine;
use crate::snapshot::SessionSnapshot;

type Antwort = oneshot::Sender<Result<()>>;

enum Befehl {
    Beitreten {
        kanal: String,
        rolle: Role,
        antwort: Antwort,
    },
    Verlassen {
        antwort: Antwort,
    },
    RederechtAnfordern {
        antwort: Antwort,
    },
    RederechtAbgeben {
        antwort: Antwort,
    },
    Lautsprecher {
        aktiv: bool,
        antwort: Antwort,
    },
    Beenden,
}

impl Befehl {
    fn beschaeftigt_ablehnen(self) {
        let antwort = match self {
            Self::Beitreten { antwort, .. }
            | Self::Verlassen { antwort }
            | Self::RederechtAnfordern { antwort }
            | Self::RederechtAbgeben { antwort }
            | Self::Lautsprecher { antwort, .. } => antwort,
            Self::Beenden => return,
        };
        let _ = antwort.send(Err(PodiumError::Beschaeftigt));
    }
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// Klonbarer Zugriff auf den Session-Task
#[derive(Clone)]
pub struct SessionHandle {
    befehle: mpsc::Sender<Befehl>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Startet den Session-Task
    ///
    /// `ereignisse` ist der Ereigniskanal derselben Engine.
    pub fn start(
        engine: Arc<dyn RealtimeEngine>,
        credentials: Arc<dyn CredentialFetcher>,
        ereignisse: mpsc::Receiver<EngineEvent>,
        config: SessionConfig,
    ) -> (Self, JoinHandle<()>) {
        let (befehle_tx, befehle_rx) = mpsc::channel(config.befehls_queue.max(1));
        let beitritt_frist = config.beitritt_frist();
        let maschine = SessionStateMachine::neu(engine, credentials, config);
        let snapshot = maschine.abonnieren();

        let eingaenge = Eingaenge {
            befehle: befehle_rx,
            ereignisse,
            ereignisse_offen: true,
            beenden: false,
            puffer: Vec::new(),
            beitritt_frist,
        };
        let task = tokio::spawn(besitzer_schleife(maschine, eingaenge));

        (
            Self {
                befehle: befehle_tx,
                snapshot,
            },
            task,
        )
    }

    pub async fn request_join(&self, kanal: impl Into<String>, rolle: Role) -> Result<()> {
        let kanal = kanal.into();
        self.anfragen(|antwort| Befehl::Beitreten {
            kanal,
            rolle,
            antwort,
        })
        .await
    }

    pub async fn request_leave(&self) -> Result<()> {
        self.anfragen(|antwort| Befehl::Verlassen { antwort }).await
    }

    pub async fn request_floor(&self) -> Result<()> {
        self.anfragen(|antwort| Befehl::RederechtAnfordern { antwort })
            .await
    }

    pub async fn release_floor(&self) -> Result<()> {
        self.anfragen(|antwort| Befehl::RederechtAbgeben { antwort })
            .await
    }

    pub async fn set_speakerphone(&self, aktiv: bool) -> Result<()> {
        self.anfragen(|antwort| Befehl::Lautsprecher { aktiv, antwort })
            .await
    }

    /// Aktueller Zustand (ohne den Task zu befragen)
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Empfaenger, der bei jeder Zustandsaenderung benachrichtigt wird
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// Beendet den Session-Task. Ein beigetretener Kanal wird vorher verlassen.
    pub async fn shutdown(&self) {
        if self.befehle.send(Befehl::Beenden).await.is_err() {
            tracing::debug!("Session-Task bereits beendet");
        }
    }

    async fn anfragen(&self, befehl: impl FnOnce(Antwort) -> Befehl) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.befehle
            .send(befehl(tx))
            .await
            .map_err(|_| PodiumError::intern("Session-Task beendet"))?;
        rx.await
            .map_err(|_| PodiumError::intern("Session-Task hat nicht geantwortet"))?
    }
}

// ---------------------------------------------------------------------------
// Besitzer-Task
// ---------------------------------------------------------------------------

struct Eingaenge {
    befehle: mpsc::Receiver<Befehl>,
    ereignisse: mpsc::Receiver<EngineEvent>,
    ereignisse_offen: bool,
    beenden: bool,
    /// Waehrend eines Uebergangs eingegangene Engine-Ereignisse
    puffer: Vec<EngineEvent>,
    beitritt_frist: Duration,
}

impl Eingaenge {
    /// Treibt einen Uebergang an und bedient nebenbei die Eingaenge
    async fn waehrend<F>(&mut self, uebergang: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        tokio::pin!(uebergang);
        loop {
            tokio::select! {
                biased;
                ergebnis = &mut uebergang => return ergebnis,
                befehl = self.befehle.recv(), if !self.beenden => self.befehl_waehrend_uebergang(befehl),
                event = self.ereignisse.recv(), if self.ereignisse_offen => match event {
                    Some(event) => self.puffer.push(event),
                    None => self.ereignisse_offen = false,
                },
            }
        }
    }

    /// Ein Befehl waehrend eines Uebergangs
    fn befehl_waehrend_uebergang(&mut self, befehl: Option<Befehl>) {
        match befehl {
            Some(Befehl::Beenden) | None => {
                tracing::debug!("Beenden waehrend Uebergang vorgemerkt");
                self.beenden = true;
            }
            Some(befehl) => befehl.beschaeftigt_ablehnen(),
        }
    }

    /// Wartet nach angenommenen Beitrittsbefehlen auf die Antwort der Engine
    ///
    /// Andere Ereignisse bleiben im Puffer und werden nach dem Abschluss
    /// angewendet.
    async fn bestaetigung_abwarten(&mut self, maschine: &mut SessionStateMachine) -> Result<()> {
        let ablauf = tokio::time::sleep(self.beitritt_frist);
        tokio::pin!(ablauf);

        loop {
            while let Ok(event) = self.ereignisse.try_recv() {
                self.puffer.push(event);
            }
            if let Some(pos) = self
                .puffer
                .iter()
                .position(|event| maschine.entscheidet_beitritt(event))
            {
                let event = self.puffer.remove(pos);
                return self.waehrend(maschine.beitritt_abschliessen(event)).await;
            }

            tokio::select! {
                biased;
                _ = &mut ablauf => break,
                befehl = self.befehle.recv(), if !self.beenden => self.befehl_waehrend_uebergang(befehl),
                event = self.ereignisse.recv(), if self.ereignisse_offen => match event {
                    Some(event) => self.puffer.push(event),
                    None => self.ereignisse_offen = false,
                },
            }
        }

        let fehler = PodiumError::EngineBefehl {
            befehl: "join",
            grund: format!(
                "keine Bestaetigung nach {} ms",
                self.beitritt_frist.as_millis()
            ),
        };
        self.waehrend(async { Err(maschine.beitritt_abbrechen(fehler).await) })
            .await
    }

    /// Wendet gepufferte und bereits wartende Ereignisse an
    fn puffer_anwenden(&mut self, maschine: &mut SessionStateMachine) {
        while let Ok(event) = self.ereignisse.try_recv() {
            self.puffer.push(event);
        }
        if !self.puffer.is_empty() {
            tracing::debug!(anzahl = self.puffer.len(), "Gepufferte Engine-Ereignisse anwenden");
        }
        for event in self.puffer.drain(..) {
            maschine.on_engine_event(event);
        }
    }

    async fn ausfuehren(&mut self, maschine: &mut SessionStateMachine, befehl: Befehl) {
        let (ergebnis, antwort) = match befehl {
            Befehl::Beitreten {
                kanal,
                rolle,
                antwort,
            } => {
                let mut ergebnis = self.waehrend(maschine.request_join(&kanal, rolle)).await;
                if ergebnis.is_ok() {
                    ergebnis = self.bestaetigung_abwarten(maschine).await;
                }
                (ergebnis, antwort)
            }
            Befehl::Verlassen { antwort } => {
                (self.waehrend(maschine.request_leave()).await, antwort)
            }
            Befehl::RederechtAnfordern { antwort } => {
                (self.waehrend(maschine.request_floor()).await, antwort)
            }
            Befehl::RederechtAbgeben { antwort } => {
                (self.waehrend(maschine.release_floor()).await, antwort)
            }
            Befehl::Lautsprecher { aktiv, antwort } => {
                (self.waehrend(maschine.set_speakerphone(aktiv)).await, antwort)
            }
            Befehl::Beenden => {
                self.beenden = true;
                return;
            }
        };

        self.puffer_anwenden(maschine);
        if antwort.send(ergebnis).is_err() {
            tracing::debug!("Aufrufer wartet nicht mehr auf Antwort");
        }
    }
}

async fn besitzer_schleife(mut maschine: SessionStateMachine, mut eingaenge: Eingaenge) {
    tracing::debug!("Session-Task gestartet");

    while !eingaenge.beenden {
        tokio::select! {
            befehl = eingaenge.befehle.recv() => match befehl {
                Some(befehl) => eingaenge.ausfuehren(&mut maschine, befehl).await,
                None => eingaenge.beenden = true,
            },
            event = eingaenge.ereignisse.recv(), if eingaenge.ereignisse_offen => match event {
                Some(event) => maschine.on_engine_event(event),
                None => {
                    tracing::warn!("Ereigniskanal der Engine geschlossen");
                    eingaenge.ereignisse_offen = false;
                }
            },
        }
    }

    if maschine.zustand() == SessionState::Joined {
        if let Err(e) = maschine.request_leave().await {
            tracing::warn!(fehler = %e, "Kanal beim Beenden nicht sauber verlassen");
        }
    }
    tracing::debug!("Session-Task beendet");
}
