//! Fehlertypen fuer Podium
//!
//! Zentraler Fehler-Enum fuer den Session-Koordinator. Externe Kollaborateure
//! (Engine, Token-Dienst) liefern `anyhow::Error`, das hier in die passende
//! Variante uebersetzt wird.

use thiserror::Error;

use crate::types::Role;

/// Globaler Result-Alias fuer Podium
pub type Result<T> = std::result::Result<T, PodiumError>;

/// Alle moeglichen Fehler des Session-Koordinators
#[derive(Debug, Error)]
pub enum PodiumError {
    // --- Eingabe ---
    #[error("Ungueltige Eingabe: {0}")]
    Validierung(String),

    // --- Token-Dienst ---
    #[error("Credential konnte nicht geholt werden: {0}")]
    Credential(String),

    // --- Engine ---
    #[error("Engine-Befehl '{befehl}' fehlgeschlagen: {grund}")]
    EngineBefehl { befehl: &'static str, grund: String },

    #[error("Rollenwechsel zu {ziel} fehlgeschlagen: {grund}")]
    Rollenwechsel { ziel: Role, grund: String },

    /// Fataler Fehler, den die Engine asynchron gemeldet hat
    #[error("Engine meldet Fehlercode {code}")]
    EngineGemeldet { code: i32 },

    // --- Zustand ---
    #[error("Ein anderer Uebergang laeuft bereits")]
    Beschaeftigt,

    #[error("Im aktuellen Zustand nicht moeglich: {0}")]
    Zustand(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl PodiumError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Erstellt einen Zustandsfehler
    pub fn zustand(msg: impl Into<String>) -> Self {
        Self::Zustand(msg.into())
    }

    /// Uebersetzt einen abgelehnten Engine-Befehl
    ///
    /// Die komplette Fehlerkette wird uebernommen (`{:#}`).
    pub fn engine(befehl: &'static str, fehler: anyhow::Error) -> Self {
        Self::EngineBefehl {
            befehl,
            grund: format!("{fehler:#}"),
        }
    }

    /// Gibt true zurueck wenn ein erneuter Versuch durch den Aufrufer sinnvoll ist
    ///
    /// Der Koordinator selbst wiederholt nie automatisch.
    pub fn ist_wiederholbar(&self) -> bool {
        matches!(
            self,
            Self::Credential(_)
                | Self::EngineBefehl { .. }
                | Self::EngineGemeldet { .. }
                | Self::Beschaeftigt
        )
    }
}
