//! Rederecht (Floor Control) fuer Zuhoerer
//!
//! Zwei Zustaende: frei / erteilt. Nur fuer Sessions, die als Zuhoerer
//! beigetreten sind. Anfragen und Erteilen sind derselbe lokale Schritt, es
//! gibt keine Moderator-Bestaetigung.
//!
//! Nicht anwendbare Aufrufe werden mit `PodiumError::Zustand` abgelehnt,
//! nie stillschweigend ignoriert.

use std::sync::Arc;

use podium_core::{PodiumError, Result, Role};

use crate::engine::RealtimeEngine;
use crate::role::RoleController;

pub struct FloorControlCoordinator {
    engine: Arc<dyn RealtimeEngine>,
    /// `None` = nicht verfolgt (nicht beigetreten oder als Sprecher beigetreten)
    rederecht: Option<bool>,
}

impl FloorControlCoordinator {
    pub fn neu(engine: Arc<dyn RealtimeEngine>) -> Self {
        Self {
            engine,
            rederecht: None,
        }
    }

    /// Beginnt die Verfolgung (Beitritt als Zuhoerer)
    pub fn aktivieren(&mut self) {
        self.rederecht = Some(false);
    }

    pub fn zuruecksetzen(&mut self) {
        self.rederecht = None;
    }

    pub fn ist_verfolgt(&self) -> bool {
        self.rederecht.is_some()
    }

    /// Haelt der lokale Teilnehmer gerade das Rederecht?
    pub fn rederecht(&self) -> bool {
        self.rederecht == Some(true)
    }

    /// Frage stellen: Zuhoerer wird zum Sprecher
    pub async fn request_floor(&mut self, rollen: &mut RoleController) -> Result<()> {
        match self.rederecht {
            None => {
                return Err(PodiumError::zustand(
                    "Rederecht gibt es nur fuer als Zuhoerer beigetretene Teilnehmer",
                ))
            }
            Some(true) => return Err(PodiumError::zustand("Rederecht bereits erteilt")),
            Some(false) => {}
        }

        rollen.assume_role(Role::Broadcaster).await?;
        self.rederecht = Some(true);
        tracing::info!("Rederecht erteilt");
        Ok(())
    }

    /// Antwort erhalten: zurueck zum Zuhoerer
    ///
    /// Scheitert `disable_audio` nach der Rueckstufung, wird die Sprecherrolle
    /// wiederhergestellt und das Rederecht bleibt erteilt. Nur wenn auch das
    /// misslingt, gilt die Rueckstufung.
    pub async fn release_floor(&mut self, rollen: &mut RoleController) -> Result<()> {
        if self.rederecht != Some(true) {
            return Err(PodiumError::zustand("Kein Rederecht erteilt"));
        }

        rollen.assume_role(Role::Audience).await?;

        if let Err(e) = self.engine.disable_audio().await {
            let fehler = PodiumError::engine("disable_audio", e);
            tracing::warn!(fehler = %fehler, "Audio nicht abgeschaltet, Sprecherrolle wird wiederhergestellt");
            if let Err(zurueck) = rollen.assume_role(Role::Broadcaster).await {
                tracing::error!(
                    fehler = %zurueck,
                    "Sprecherrolle nicht wiederhergestellt, Rederecht verfaellt"
                );
                self.rederecht = Some(false);
            }
            return Err(fehler);
        }

        self.rederecht = Some(false);
        tracing::info!("Rederecht abgegeben");
        Ok(())
    }
}
