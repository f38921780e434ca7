//! Rollen-Steuerung des lokalen Teilnehmers
//!
//! Erst anwenden, dann merken: die lokale Rolle aendert sich nur, wenn alle
//! Engine-Befehle des Wechsels erfolgreich waren.
//!
//! Befehlsfolge:
//! - Audience: `set_role(Audience)`, lokales Audio bleibt unveraendert
//! - Broadcaster: `set_role(Broadcaster)`, danach `enable_audio()`

use std::sync::Arc;

use podium_core::{PodiumError, Result, Role};

use crate::engine::RealtimeEngine;

pub struct RoleController {
    engine: Arc<dyn RealtimeEngine>,
    rolle: Option<Role>,
}

impl RoleController {
    pub fn neu(engine: Arc<dyn RealtimeEngine>) -> Self {
        Self { engine, rolle: None }
    }

    /// Zuletzt erfolgreich angewendete Rolle
    pub fn rolle(&self) -> Option<Role> {
        self.rolle
    }

    /// Wechselt zur Zielrolle
    ///
    /// Bei Fehler bleibt die bisherige Rolle stehen. Ist `set_role` schon
    /// durchgegangen und erst `enable_audio` gescheitert, wird die Engine
    /// auf die bisherige Rolle zurueckgestellt.
    pub async fn assume_role(&mut self, ziel: Role) -> Result<()> {
        self.engine
            .set_role(ziel)
            .await
            .map_err(|e| rollenfehler(ziel, "set_role", e))?;

        if ziel == Role::Broadcaster {
            if let Err(e) = self.engine.enable_audio().await {
                self.engine_rolle_wiederherstellen(ziel).await;
                return Err(rollenfehler(ziel, "enable_audio", e));
            }
        }

        tracing::debug!(von = ?self.rolle, zu = %ziel, "Rolle gewechselt");
        self.rolle = Some(ziel);
        Ok(())
    }

    /// Vergisst die Rolle (Austritt, fataler Fehler)
    pub fn zuruecksetzen(&mut self) {
        self.rolle = None;
    }

    async fn engine_rolle_wiederherstellen(&self, ziel: Role) {
        let Some(vorher) = self.rolle else {
            return;
        };
        if vorher == ziel {
            return;
        }
        if let Err(e) = self.engine.set_role(vorher).await {
            tracing::error!(
                rolle = %vorher,
                fehler = %format!("{e:#}"),
                "Engine-Rolle konnte nicht wiederhergestellt werden"
            );
        }
    }
}

fn rollenfehler(ziel: Role, schritt: &str, fehler: anyhow::Error) -> PodiumError {
    PodiumError::Rollenwechsel {
        ziel,
        grund: format!("{schritt}: {fehler:#}"),
    }
}
