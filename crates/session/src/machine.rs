//! Session-Zustandsautomat
//!
//! Besitzt Kanal-Lebenszyklus, Rolle, Rederecht und Teilnehmer und haelt sie
//! gemeinsam konsistent:
//!
//! ```text
//! Idle --request_join--> Connecting --ChannelJoined--> Joined --request_leave--> Leaving --> Idle
//!                            |
//!                            +--Befehlsfehler / Error / Frist--> Idle
//! beliebig --EngineEvent::Error--> Idle
//! ```
//!
//! Ein Beitritt hat zwei Phasen: [`SessionStateMachine::request_join`] schickt
//! die Befehlsfolge an die Engine, erst [`SessionStateMachine::beitritt_abschliessen`]
//! mit dem `ChannelJoined` der Engine macht daraus `Joined`.
//!
//! Der Automat selbst ist nicht thread-safe, alle Methoden nehmen `&mut self`.
//! Serialisierung von Benutzerbefehlen und Engine-Ereignissen uebernimmt
//! [`crate::handle::SessionHandle`].

use std::sync::Arc;

use podium_core::{
    ChannelName, EngineEvent, PeerId, PodiumError, Result, Role, SessionState,
};
use tokio::sync::watch;

use crate::config::SessionConfig;
use crate::engine::{CredentialFetcher, RealtimeEngine};
use crate::floor::FloorControlCoordinator;
use crate::registry::PeerRegistry;
use crate::role::RoleController;
use crate::snapshot::SessionSnapshot;

pub struct SessionStateMachine {
    engine: Arc<dyn RealtimeEngine>,
    credentials: Arc<dyn CredentialFetcher>,
    config: SessionConfig,

    zustand: SessionState,
    kanal: Option<ChannelName>,
    lokale_id: Option<PeerId>,
    lautsprecher: bool,
    letzter_fehler: Option<String>,
    /// Befehlsfolge angenommen, `ChannelJoined` steht noch aus
    bestaetigung_offen: bool,

    peers: PeerRegistry,
    rollen: RoleController,
    floor: FloorControlCoordinator,

    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl SessionStateMachine {
    pub fn neu(
        engine: Arc<dyn RealtimeEngine>,
        credentials: Arc<dyn CredentialFetcher>,
        config: SessionConfig,
    ) -> Self {
        let lautsprecher = config.lautsprecher;
        let (snapshot_tx, _) = watch::channel(SessionSnapshot {
            lautsprecher,
            ..SessionSnapshot::default()
        });
        Self {
            rollen: RoleController::neu(Arc::clone(&engine)),
            floor: FloorControlCoordinator::neu(Arc::clone(&engine)),
            engine,
            credentials,
            config,
            zustand: SessionState::Idle,
            kanal: None,
            lokale_id: None,
            lautsprecher,
            letzter_fehler: None,
            bestaetigung_offen: false,
            peers: PeerRegistry::neu(),
            snapshot_tx,
        }
    }

    pub fn zustand(&self) -> SessionState {
        self.zustand
    }

    /// Wartet ein Beitritt auf die Bestaetigung der Engine?
    pub fn bestaetigung_offen(&self) -> bool {
        self.bestaetigung_offen
    }

    /// Neuer Empfaenger fuer Snapshot-Aenderungen
    pub fn abonnieren(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Erstellt eine Lesesicht des aktuellen Zustands
    pub fn snapshot(&self) -> SessionSnapshot {
        let beigetreten = self.zustand == SessionState::Joined;
        SessionSnapshot {
            zustand: self.zustand,
            kanal: self.kanal.clone(),
            lokale_id: self.lokale_id,
            rolle: if beigetreten { self.rollen.rolle() } else { None },
            rederecht: beigetreten.then(|| self.floor.rederecht()),
            rederecht_verfolgt: beigetreten && self.floor.ist_verfolgt(),
            peers: self.peers.peers(),
            protokoll: self.peers.protokoll().to_vec(),
            lautsprecher: self.lautsprecher,
            letzter_fehler: self.letzter_fehler.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Beitritt
    // -----------------------------------------------------------------------

    /// Startet den Beitritt zu einem Kanal (alles oder nichts)
    ///
    /// Der Kanalname wird vor jedem Netzwerk- oder Engine-Aufruf geprueft.
    /// Scheitert ein Schritt nach erfolgreichem `join`, wird die Engine
    /// wieder aus dem Kanal genommen. Bei `Ok` bleibt der Zustand
    /// `Connecting`, bis [`beitritt_abschliessen`](Self::beitritt_abschliessen)
    /// oder [`beitritt_abbrechen`](Self::beitritt_abbrechen) folgt.
    pub async fn request_join(&mut self, kanal: &str, rolle: Role) -> Result<()> {
        match self.zustand {
            SessionState::Idle => {}
            SessionState::Connecting | SessionState::Leaving => {
                return Err(PodiumError::Beschaeftigt)
            }
            SessionState::Joined => {
                let aktuell = self
                    .kanal
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                return Err(self.fehler_merken(PodiumError::zustand(format!(
                    "bereits Kanal '{aktuell}' beigetreten"
                ))));
            }
        }

        let kanal = ChannelName::parse(kanal).map_err(|e| self.fehler_merken(e))?;

        tracing::info!(channel = %kanal, role = %rolle, "Beitritt gestartet");
        self.zustand = SessionState::Connecting;
        self.kanal = Some(kanal.clone());
        self.letzter_fehler = None;
        self.veroeffentlichen();

        match self.beitritt_durchfuehren(&kanal, rolle).await {
            Ok(()) => {
                tracing::debug!(channel = %kanal, "Beitrittsbefehle angenommen, warte auf ChannelJoined");
                self.bestaetigung_offen = true;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(channel = %kanal, fehler = %e, "Beitritt fehlgeschlagen");
                self.lokal_zuruecksetzen();
                self.zustand = SessionState::Idle;
                Err(self.fehler_merken(e))
            }
        }
    }

    /// Entscheidet das Ereignis ueber den offenen Beitritt?
    ///
    /// Das sind `ChannelJoined` fuer den angefragten Kanal und `Error`.
    pub fn entscheidet_beitritt(&self, event: &EngineEvent) -> bool {
        if !self.bestaetigung_offen {
            return false;
        }
        match event {
            EngineEvent::Error { .. } => true,
            EngineEvent::ChannelJoined { channel, .. } => self.kanal.as_ref() == Some(channel),
            _ => false,
        }
    }

    /// Schliesst den offenen Beitritt mit der Antwort der Engine ab
    ///
    /// `ChannelJoined` fuehrt nach `Joined`, `Error` bricht den Beitritt ab.
    pub async fn beitritt_abschliessen(&mut self, event: EngineEvent) -> Result<()> {
        match event {
            EngineEvent::ChannelJoined { channel, local_id }
                if self.bestaetigung_offen && self.kanal.as_ref() == Some(&channel) =>
            {
                self.beitritt_bestaetigen(local_id);
                Ok(())
            }
            EngineEvent::Error { code } if self.bestaetigung_offen => {
                Err(self.beitritt_abbrechen(PodiumError::EngineGemeldet { code }).await)
            }
            anders => Err(PodiumError::intern(format!(
                "{} schliesst keinen offenen Beitritt ab",
                anders.art()
            ))),
        }
    }

    /// Bricht einen angenommenen, aber unbestaetigten Beitritt ab
    ///
    /// Die Engine wird aus dem Kanal genommen, der Zustand geht nach `Idle`
    /// und `fehler` wird gemerkt und zurueckgegeben.
    pub async fn beitritt_abbrechen(&mut self, fehler: PodiumError) -> PodiumError {
        if !self.bestaetigung_offen {
            return fehler;
        }
        tracing::warn!(
            channel = ?self.kanal.as_ref().map(ToString::to_string),
            fehler = %fehler,
            "Beitritt ohne Bestaetigung abgebrochen"
        );
        if let Err(leave) = self.engine.leave().await {
            tracing::error!(
                fehler = %format!("{leave:#}"),
                "Kanal nach abgebrochenem Beitritt nicht verlassen"
            );
        }
        self.lokal_zuruecksetzen();
        self.zustand = SessionState::Idle;
        self.fehler_merken(fehler)
    }

    fn beitritt_bestaetigen(&mut self, local_id: PeerId) {
        self.bestaetigung_offen = false;
        self.zustand = SessionState::Joined;
        self.lokale_id = Some(local_id);

        if let Some(rolle) = self.rollen.rolle() {
            if rolle == Role::Audience {
                self.floor.aktivieren();
            }
            self.peers.log_entry(format!("local role: {rolle}"));
        }
        let kanal = self.kanal.as_ref().map(ToString::to_string).unwrap_or_default();
        self.peers.log_entry(format!("{local_id} joined {kanal}"));
        tracing::info!(channel = %kanal, local_id = %local_id, role = ?self.rollen.rolle(), "Kanal beigetreten");
        self.veroeffentlichen();
    }

    async fn beitritt_durchfuehren(&mut self, kanal: &ChannelName, rolle: Role) -> Result<()> {
        let credential = self
            .credentials
            .fetch(kanal)
            .await
            .map_err(|e| PodiumError::Credential(format!("{e:#}")))?;

        self.engine
            .join(&credential, kanal, rolle)
            .await
            .map_err(|e| PodiumError::engine("join", e))?;

        if let Err(e) = self.nach_beitritt_einrichten(rolle).await {
            if let Err(leave) = self.engine.leave().await {
                tracing::error!(
                    channel = %kanal,
                    fehler = %format!("{leave:#}"),
                    "Kanal nach abgebrochenem Beitritt nicht verlassen"
                );
            }
            return Err(e);
        }
        Ok(())
    }

    async fn nach_beitritt_einrichten(&mut self, rolle: Role) -> Result<()> {
        self.engine
            .set_channel_profile(self.config.kanalprofil)
            .await
            .map_err(|e| PodiumError::engine("set_channel_profile", e))?;
        self.engine
            .set_speakerphone(self.config.lautsprecher)
            .await
            .map_err(|e| PodiumError::engine("set_speakerphone", e))?;
        self.lautsprecher = self.config.lautsprecher;

        self.rollen.assume_role(rolle).await
    }

    // -----------------------------------------------------------------------
    // Austritt
    // -----------------------------------------------------------------------

    /// Verlaesst den Kanal. Im Zustand `Idle` ein No-op.
    ///
    /// Der lokale Zustand wird auch dann zurueckgesetzt, wenn `leave` an der
    /// Engine scheitert; der Fehler wird trotzdem gemeldet.
    pub async fn request_leave(&mut self) -> Result<()> {
        match self.zustand {
            SessionState::Idle => {
                tracing::debug!("Austritt ohne Kanal ignoriert");
                return Ok(());
            }
            SessionState::Connecting | SessionState::Leaving => {
                return Err(PodiumError::Beschaeftigt)
            }
            SessionState::Joined => {}
        }

        tracing::info!(channel = ?self.kanal.as_ref().map(ToString::to_string), "Austritt gestartet");
        self.zustand = SessionState::Leaving;
        self.veroeffentlichen();

        let ergebnis = self
            .engine
            .leave()
            .await
            .map_err(|e| PodiumError::engine("leave", e));

        self.lokal_zuruecksetzen();
        self.zustand = SessionState::Idle;

        match ergebnis {
            Ok(()) => {
                tracing::info!("Kanal verlassen");
                self.veroeffentlichen();
                Ok(())
            }
            Err(e) => Err(self.fehler_merken(e)),
        }
    }

    // -----------------------------------------------------------------------
    // Rederecht und Lautsprecher
    // -----------------------------------------------------------------------

    pub async fn request_floor(&mut self) -> Result<()> {
        self.beigetreten_pruefen("Rederecht anfordern")?;
        match self.floor.request_floor(&mut self.rollen).await {
            Ok(()) => {
                self.peers.log_entry("local role: broadcaster (floor granted)");
                self.veroeffentlichen();
                Ok(())
            }
            Err(e) => Err(self.fehler_merken(e)),
        }
    }

    pub async fn release_floor(&mut self) -> Result<()> {
        self.beigetreten_pruefen("Rederecht abgeben")?;
        let hatte_rederecht = self.floor.rederecht();
        let ergebnis = self.floor.release_floor(&mut self.rollen).await;
        if hatte_rederecht && !self.floor.rederecht() {
            self.peers.log_entry("local role: audience (floor released)");
        }
        match ergebnis {
            Ok(()) => {
                self.veroeffentlichen();
                Ok(())
            }
            Err(e) => Err(self.fehler_merken(e)),
        }
    }

    /// Schaltet zwischen Lautsprecher und Hoermuschel um
    pub async fn set_speakerphone(&mut self, aktiv: bool) -> Result<()> {
        self.beigetreten_pruefen("Lautsprecher umschalten")?;
        match self.engine.set_speakerphone(aktiv).await {
            Ok(()) => {
                self.lautsprecher = aktiv;
                tracing::debug!(lautsprecher = aktiv, "Audioausgabe umgeschaltet");
                self.veroeffentlichen();
                Ok(())
            }
            Err(e) => Err(self.fehler_merken(PodiumError::engine("set_speakerphone", e))),
        }
    }

    // -----------------------------------------------------------------------
    // Engine-Ereignisse
    // -----------------------------------------------------------------------

    /// Wendet ein Engine-Ereignis an. Blockiert nie.
    ///
    /// Ein `Error` waehrend eines offenen Beitritts sollte ueber
    /// [`beitritt_abschliessen`](Self::beitritt_abschliessen) laufen, damit die
    /// Engine den Kanal wieder verlaesst.
    pub fn on_engine_event(&mut self, event: EngineEvent) {
        let beigetreten = self.zustand == SessionState::Joined;

        match event {
            EngineEvent::Warning { code } => {
                tracing::warn!(code, "Engine-Warnung");
                return;
            }
            EngineEvent::Error { code } if self.zustand == SessionState::Idle => {
                // Nichts zurueckzusetzen, frueheren Fehlergrund behalten
                let meldung = PodiumError::EngineGemeldet { code }.to_string();
                tracing::warn!(code, "Engine-Fehler ohne Session");
                self.letzter_fehler = Some(match self.letzter_fehler.take() {
                    Some(vorher) => format!("{vorher}; {meldung}"),
                    None => meldung,
                });
            }
            EngineEvent::Error { code } => {
                tracing::error!(code, zustand = ?self.zustand, "Fataler Engine-Fehler, Session wird zurueckgesetzt");
                self.lokal_zuruecksetzen();
                self.zustand = SessionState::Idle;
                self.letzter_fehler = Some(PodiumError::EngineGemeldet { code }.to_string());
            }
            EngineEvent::ChannelJoined { channel, local_id }
                if self.bestaetigung_offen && self.kanal.as_ref() == Some(&channel) =>
            {
                self.beitritt_bestaetigen(local_id);
                return;
            }
            EngineEvent::ChannelJoined { channel, local_id }
                if beigetreten && self.kanal.as_ref() == Some(&channel) =>
            {
                self.lokale_id = Some(local_id);
                self.peers.log_entry(format!("{local_id} joined {channel}"));
            }
            EngineEvent::PeerJoined { peer } if beigetreten => {
                self.peers.on_peer_joined(peer);
                tracing::info!(peer = %peer, anzahl = self.peers.anzahl(), "Teilnehmer beigetreten");
            }
            EngineEvent::PeerLeft { peer, reason } if beigetreten => {
                self.peers.on_peer_left(peer);
                tracing::info!(peer = %peer, grund = ?reason, anzahl = self.peers.anzahl(), "Teilnehmer gegangen");
            }
            veraltet => {
                tracing::warn!(
                    art = veraltet.art(),
                    zustand = ?self.zustand,
                    "Engine-Ereignis ausserhalb einer Session ignoriert"
                );
                return;
            }
        }

        self.veroeffentlichen();
    }

    // -----------------------------------------------------------------------
    // Intern
    // -----------------------------------------------------------------------

    fn beigetreten_pruefen(&mut self, aktion: &str) -> Result<()> {
        match self.zustand {
            SessionState::Joined => Ok(()),
            s if s.ist_uebergang() => Err(PodiumError::Beschaeftigt),
            _ => Err(self.fehler_merken(PodiumError::zustand(format!(
                "{aktion}: kein Kanal beigetreten"
            )))),
        }
    }

    /// Vergisst alles, was an einer Kanal-Session haengt
    fn lokal_zuruecksetzen(&mut self) {
        self.peers.reset();
        self.rollen.zuruecksetzen();
        self.floor.zuruecksetzen();
        self.kanal = None;
        self.lokale_id = None;
        self.bestaetigung_offen = false;
        self.lautsprecher = self.config.lautsprecher;
    }

    /// Merkt den Fehler fuer die Lesesicht und gibt ihn weiter
    fn fehler_merken(&mut self, fehler: PodiumError) -> PodiumError {
        self.letzter_fehler = Some(fehler.to_string());
        self.veroeffentlichen();
        fehler
    }

    fn veroeffentlichen(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::{BefehlsArt, EngineBefehl, SimulatedCredentials, SimulatedEngine};
    use podium_core::{ChannelProfile, OfflineReason};
    use tokio::sync::mpsc;

    struct Aufbau {
        maschine: SessionStateMachine,
        engine: SimulatedEngine,
        credentials: Arc<SimulatedCredentials>,
        ereignisse: mpsc::Receiver<EngineEvent>,
    }

    impl Aufbau {
        /// Beitritt samt `ChannelJoined` der simulierten Engine
        async fn beitreten(&mut self, kanal: &str, rolle: Role) -> Result<()> {
            self.maschine.request_join(kanal, rolle).await?;
            let event = self.ereignisse.recv().await.expect("ChannelJoined erwartet");
            self.maschine.beitritt_abschliessen(event).await
        }
    }

    fn aufbau() -> Aufbau {
        let (engine, ereignisse) = SimulatedEngine::neu(PeerId(7), 16);
        let credentials = Arc::new(SimulatedCredentials::neu());
        let maschine = SessionStateMachine::neu(
            Arc::new(engine.clone()),
            Arc::clone(&credentials) as Arc<dyn CredentialFetcher>,
            SessionConfig::default(),
        );
        Aufbau {
            maschine,
            engine,
            credentials,
            ereignisse,
        }
    }

    #[tokio::test]
    async fn kurzer_kanalname_ohne_io_abgelehnt() {
        let mut a = aufbau();
        for name in ["", "a", "ab", "abc"] {
            let e = a.maschine.request_join(name, Role::Audience).await.unwrap_err();
            assert!(matches!(e, PodiumError::Validierung(_)));
        }
        assert_eq!(a.maschine.zustand(), SessionState::Idle);
        assert!(a.credentials.abrufe().is_empty(), "Kein Token-Abruf");
        assert!(a.engine.befehle().is_empty(), "Kein Engine-Befehl");
        assert!(a.maschine.snapshot().letzter_fehler.is_some());
    }

    #[tokio::test]
    async fn beitritt_als_zuhoerer() {
        let mut a = aufbau();
        a.beitreten("general-chat", Role::Audience).await.unwrap();

        let s = a.maschine.snapshot();
        assert_eq!(s.zustand, SessionState::Joined);
        assert_eq!(s.rolle, Some(Role::Audience));
        assert_eq!(s.rederecht, Some(false));
        assert!(s.rederecht_verfolgt);
        assert_eq!(s.kanal.as_ref().map(ChannelName::as_str), Some("general-chat"));
        assert_eq!(
            a.engine.befehle(),
            vec![
                EngineBefehl::Join {
                    kanal: "general-chat".into(),
                    rolle: Role::Audience
                },
                EngineBefehl::SetChannelProfile(ChannelProfile::LiveBroadcasting),
                EngineBefehl::SetSpeakerphone(true),
                EngineBefehl::SetRole(Role::Audience),
            ]
        );
    }

    #[tokio::test]
    async fn beitritt_als_sprecher_aktiviert_audio() {
        let mut a = aufbau();
        a.beitreten("general-chat", Role::Broadcaster).await.unwrap();

        let s = a.maschine.snapshot();
        assert_eq!(s.rolle, Some(Role::Broadcaster));
        assert_eq!(s.rederecht, Some(false));
        assert!(!s.rederecht_verfolgt);
        assert_eq!(a.engine.befehle().last(), Some(&EngineBefehl::EnableAudio));
    }

    #[tokio::test]
    async fn token_fehler_zurueck_nach_idle() {
        let mut a = aufbau();
        a.credentials.fehlschlagen(Some("HTTP 503"));

        let e = a
            .maschine
            .request_join("general-chat", Role::Audience)
            .await
            .unwrap_err();
        assert!(matches!(e, PodiumError::Credential(_)));

        let s = a.maschine.snapshot();
        assert_eq!(s.zustand, SessionState::Idle);
        assert_eq!(s.rolle, None);
        assert!(s.letzter_fehler.unwrap().contains("HTTP 503"));
        assert!(a.engine.befehle().is_empty());
    }

    #[tokio::test]
    async fn rollenfehler_beim_beitritt_verlaesst_kanal() {
        let mut a = aufbau();
        a.engine.fehlschlagen_bei(BefehlsArt::SetRole);

        let e = a
            .maschine
            .request_join("general-chat", Role::Audience)
            .await
            .unwrap_err();
        assert!(matches!(e, PodiumError::Rollenwechsel { .. }));
        assert_eq!(a.maschine.zustand(), SessionState::Idle);
        assert_eq!(a.maschine.snapshot().rolle, None);
        assert_eq!(a.engine.befehle().last(), Some(&EngineBefehl::Leave));
    }

    #[tokio::test]
    async fn engine_join_fehler_ohne_leave() {
        let mut a = aufbau();
        a.engine.fehlschlagen_bei(BefehlsArt::Join);

        let e = a
            .maschine
            .request_join("general-chat", Role::Audience)
            .await
            .unwrap_err();
        assert!(matches!(e, PodiumError::EngineBefehl { befehl: "join", .. }));
        assert!(!a.engine.befehle().contains(&EngineBefehl::Leave));
    }

    #[tokio::test]
    async fn zweiter_beitritt_im_kanal_abgelehnt() {
        let mut a = aufbau();
        a.beitreten("general-chat", Role::Audience).await.unwrap();
        let anzahl = a.engine.befehle().len();

        let e = a.maschine.request_join("other-room", Role::Audience).await.unwrap_err();
        assert!(matches!(e, PodiumError::Zustand(_)));
        assert_eq!(a.maschine.zustand(), SessionState::Joined);
        assert_eq!(a.engine.befehle().len(), anzahl);
    }

    #[tokio::test]
    async fn austritt_leert_alles() {
        let mut a = aufbau();
        a.beitreten("general-chat", Role::Audience).await.unwrap();
        a.maschine.on_engine_event(EngineEvent::PeerJoined { peer: PeerId(1) });
        a.maschine.on_engine_event(EngineEvent::PeerJoined { peer: PeerId(2) });
        a.maschine.request_floor().await.unwrap();

        a.maschine.request_leave().await.unwrap();

        let s = a.maschine.snapshot();
        assert_eq!(s.zustand, SessionState::Idle);
        assert!(s.peers.is_empty());
        assert!(s.protokoll.is_empty());
        assert_eq!(s.rolle, None);
        assert_eq!(s.rederecht, None);
        assert_eq!(s.kanal, None);
    }

    #[tokio::test]
    async fn austritt_im_idle_ist_noop() {
        let mut a = aufbau();
        a.maschine.request_leave().await.unwrap();
        a.maschine.request_leave().await.unwrap();
        assert!(a.engine.befehle().is_empty());
    }

    #[tokio::test]
    async fn austritt_trotz_engine_fehler_idle() {
        let mut a = aufbau();
        a.beitreten("general-chat", Role::Audience).await.unwrap();
        a.maschine.on_engine_event(EngineEvent::PeerJoined { peer: PeerId(3) });
        a.engine.fehlschlagen_bei(BefehlsArt::Leave);

        let e = a.maschine.request_leave().await.unwrap_err();
        assert!(matches!(e, PodiumError::EngineBefehl { befehl: "leave", .. }));
        let s = a.maschine.snapshot();
        assert_eq!(s.zustand, SessionState::Idle);
        assert!(s.peers.is_empty());
        assert!(s.letzter_fehler.is_some());
    }

    #[tokio::test]
    async fn rederecht_rundreise() {
        let mut a = aufbau();
        a.beitreten("general-chat", Role::Audience).await.unwrap();
        let vorher = a.maschine.snapshot();

        a.maschine.request_floor().await.unwrap();
        let mitte = a.maschine.snapshot();
        assert_eq!(mitte.rolle, Some(Role::Broadcaster));
        assert_eq!(mitte.rederecht, Some(true));

        a.maschine.release_floor().await.unwrap();
        let nachher = a.maschine.snapshot();
        assert_eq!(nachher.rolle, vorher.rolle);
        assert_eq!(nachher.rederecht, vorher.rederecht);
    }

    #[tokio::test]
    async fn rederecht_ohne_kanal_abgelehnt() {
        let mut a = aufbau();
        let e = a.maschine.request_floor().await.unwrap_err();
        assert!(matches!(e, PodiumError::Zustand(_)));
        let e = a.maschine.release_floor().await.unwrap_err();
        assert!(matches!(e, PodiumError::Zustand(_)));
        assert!(a.engine.befehle().is_empty());
    }

    #[tokio::test]
    async fn rederecht_als_sprecher_abgelehnt_und_gemerkt() {
        let mut a = aufbau();
        a.beitreten("general-chat", Role::Broadcaster).await.unwrap();

        let e = a.maschine.request_floor().await.unwrap_err();
        assert!(matches!(e, PodiumError::Zustand(_)));
        let s = a.maschine.snapshot();
        assert_eq!(s.rolle, Some(Role::Broadcaster));
        assert_eq!(s.rederecht, Some(false));
        assert!(s.letzter_fehler.is_some());
    }

    #[tokio::test]
    async fn peer_ereignisse_nur_im_kanal() {
        let mut a = aufbau();
        a.maschine.on_engine_event(EngineEvent::PeerJoined { peer: PeerId(42) });
        assert!(a.maschine.snapshot().peers.is_empty());

        a.beitreten("general-chat", Role::Audience).await.unwrap();
        a.maschine.on_engine_event(EngineEvent::PeerJoined { peer: PeerId(42) });
        a.maschine.on_engine_event(EngineEvent::PeerJoined { peer: PeerId(42) });
        assert_eq!(a.maschine.snapshot().peers, vec![PeerId(42)]);

        a.maschine.on_engine_event(EngineEvent::PeerLeft {
            peer: PeerId(42),
            reason: OfflineReason::Quit,
        });
        assert!(a.maschine.snapshot().peers.is_empty());
    }

    #[tokio::test]
    async fn beitritt_wartet_auf_channel_joined() {
        let mut a = aufbau();
        a.maschine.request_join("general-chat", Role::Audience).await.unwrap();

        let s = a.maschine.snapshot();
        assert_eq!(s.zustand, SessionState::Connecting);
        assert!(a.maschine.bestaetigung_offen());
        assert_eq!(s.lokale_id, None);
        assert_eq!(s.rolle, None);

        // Bestaetigung fuer einen anderen Kanal zaehlt nicht
        let fremd = EngineEvent::ChannelJoined {
            channel: ChannelName::parse("other-room").unwrap(),
            local_id: PeerId(7),
        };
        assert!(!a.maschine.entscheidet_beitritt(&fremd));
        a.maschine.on_engine_event(fremd);
        assert_eq!(a.maschine.zustand(), SessionState::Connecting);

        let event = a.ereignisse.recv().await.unwrap();
        assert!(a.maschine.entscheidet_beitritt(&event));
        a.maschine.beitritt_abschliessen(event).await.unwrap();

        let s = a.maschine.snapshot();
        assert_eq!(s.zustand, SessionState::Joined);
        assert_eq!(s.lokale_id, Some(PeerId(7)));
        assert_eq!(s.rederecht, Some(false));
        let texte: Vec<&str> = s.protokoll.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texte, vec!["local role: audience", "7 joined general-chat"]);
    }

    #[tokio::test]
    async fn channel_joined_ueber_ereignis_schliesst_beitritt_ab() {
        let mut a = aufbau();
        a.maschine.request_join("general-chat", Role::Broadcaster).await.unwrap();
        let event = a.ereignisse.recv().await.unwrap();
        a.maschine.on_engine_event(event);

        let s = a.maschine.snapshot();
        assert_eq!(s.zustand, SessionState::Joined);
        assert_eq!(s.rolle, Some(Role::Broadcaster));
        assert!(!a.maschine.bestaetigung_offen());
    }

    #[tokio::test]
    async fn engine_fehler_vor_bestaetigung_verlaesst_kanal() {
        let mut a = aufbau();
        a.maschine.request_join("general-chat", Role::Audience).await.unwrap();

        let e = a
            .maschine
            .beitritt_abschliessen(EngineEvent::Error { code: 17 })
            .await
            .unwrap_err();
        assert!(matches!(e, PodiumError::EngineGemeldet { code: 17 }));

        let s = a.maschine.snapshot();
        assert_eq!(s.zustand, SessionState::Idle);
        assert_eq!(s.kanal, None);
        assert_eq!(s.letzter_fehler.as_deref(), Some("Engine meldet Fehlercode 17"));
        assert_eq!(a.engine.befehle().last(), Some(&EngineBefehl::Leave));

        // Spaetes ChannelJoined aendert nichts mehr
        let spaet = a.ereignisse.recv().await.unwrap();
        a.maschine.on_engine_event(spaet);
        assert_eq!(a.maschine.zustand(), SessionState::Idle);
    }

    #[tokio::test]
    async fn abbruch_ohne_bestaetigung_verlaesst_kanal() {
        let mut a = aufbau();
        a.maschine.request_join("general-chat", Role::Broadcaster).await.unwrap();

        let e = a
            .maschine
            .beitritt_abbrechen(PodiumError::EngineBefehl {
                befehl: "join",
                grund: "keine Bestaetigung".into(),
            })
            .await;
        assert!(matches!(e, PodiumError::EngineBefehl { befehl: "join", .. }));
        assert_eq!(a.maschine.zustand(), SessionState::Idle);
        assert_eq!(a.maschine.snapshot().rolle, None);
        assert_eq!(a.engine.befehle().last(), Some(&EngineBefehl::Leave));
    }

    #[tokio::test]
    async fn abbruch_ohne_offenen_beitritt_ist_wirkungslos() {
        let mut a = aufbau();
        a.beitreten("general-chat", Role::Audience).await.unwrap();
        let anzahl = a.engine.befehle().len();

        a.maschine.beitritt_abbrechen(PodiumError::intern("spaet")).await;
        assert_eq!(a.maschine.zustand(), SessionState::Joined);
        assert_eq!(a.engine.befehle().len(), anzahl);
    }

    #[tokio::test]
    async fn anderes_ereignis_schliesst_beitritt_nicht_ab() {
        let mut a = aufbau();
        a.maschine.request_join("general-chat", Role::Audience).await.unwrap();

        let e = a
            .maschine
            .beitritt_abschliessen(EngineEvent::PeerJoined { peer: PeerId(3) })
            .await
            .unwrap_err();
        assert!(matches!(e, PodiumError::Intern(_)));
        assert_eq!(a.maschine.zustand(), SessionState::Connecting);
        assert!(a.maschine.bestaetigung_offen());
    }

    #[tokio::test]
    async fn channel_joined_im_kanal_aktualisiert_lokale_id() {
        let mut a = aufbau();
        a.beitreten("general-chat", Role::Audience).await.unwrap();
        a.maschine.on_engine_event(EngineEvent::ChannelJoined {
            channel: ChannelName::parse("general-chat").unwrap(),
            local_id: PeerId(8),
        });

        let s = a.maschine.snapshot();
        assert_eq!(s.lokale_id, Some(PeerId(8)));
        assert!(s.protokoll.iter().any(|e| e.text == "8 joined general-chat"));
    }

    #[tokio::test]
    async fn engine_fehler_nach_gescheitertem_beitritt_behaelt_grund() {
        let mut a = aufbau();
        a.credentials.fehlschlagen(Some("HTTP 503"));
        a.maschine.request_join("general-chat", Role::Audience).await.unwrap_err();

        a.maschine.on_engine_event(EngineEvent::Error { code: 17 });

        let fehler = a.maschine.snapshot().letzter_fehler.unwrap();
        assert!(fehler.contains("HTTP 503"), "{fehler}");
        assert!(fehler.contains("Fehlercode 17"), "{fehler}");
        assert_eq!(a.maschine.zustand(), SessionState::Idle);
    }

    #[tokio::test]
    async fn warnung_aendert_nichts() {
        let mut a = aufbau();
        a.beitreten("general-chat", Role::Audience).await.unwrap();
        let vorher = a.maschine.snapshot();
        a.maschine.on_engine_event(EngineEvent::Warning { code: 104 });
        assert_eq!(a.maschine.snapshot(), vorher);
    }

    #[tokio::test]
    async fn engine_fehler_setzt_session_zurueck() {
        let mut a = aufbau();
        a.beitreten("general-chat", Role::Audience).await.unwrap();
        a.maschine.on_engine_event(EngineEvent::PeerJoined { peer: PeerId(5) });

        a.maschine.on_engine_event(EngineEvent::Error { code: 17 });

        let s = a.maschine.snapshot();
        assert_eq!(s.zustand, SessionState::Idle);
        assert!(s.peers.is_empty());
        assert_eq!(s.rolle, None);
        assert_eq!(s.rederecht, None);
        assert!(s.letzter_fehler.unwrap().contains("17"));

        // Erneuter Beitritt moeglich
        a.beitreten("general-chat", Role::Audience).await.unwrap();
        assert_eq!(a.maschine.zustand(), SessionState::Joined);
    }

    #[tokio::test]
    async fn lautsprecher_umschalten() {
        let mut a = aufbau();
        assert!(a.maschine.set_speakerphone(false).await.is_err());

        a.beitreten("general-chat", Role::Audience).await.unwrap();
        a.maschine.set_speakerphone(false).await.unwrap();
        assert!(!a.maschine.snapshot().lautsprecher);
        assert_eq!(
            a.engine.befehle().last(),
            Some(&EngineBefehl::SetSpeakerphone(false))
        );

        a.maschine.request_leave().await.unwrap();
        assert!(a.maschine.snapshot().lautsprecher, "Nach Austritt wieder Standard");
    }

    #[tokio::test]
    async fn snapshot_wird_veroeffentlicht() {
        let mut a = aufbau();
        let mut rx = a.maschine.abonnieren();
        a.beitreten("general-chat", Role::Audience).await.unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().zustand, SessionState::Joined);
    }

    #[tokio::test]
    async fn beitritt_holt_jedes_mal_frisches_token() {
        let mut a = aufbau();
        a.beitreten("general-chat", Role::Audience).await.unwrap();
        a.maschine.request_leave().await.unwrap();
        a.beitreten("other-room", Role::Audience).await.unwrap();

        let abrufe: Vec<String> = a
            .credentials
            .abrufe()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(abrufe, vec!["general-chat", "other-room"]);
    }
}
