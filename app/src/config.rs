//! Anwendungs-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Bis auf die App-ID der
//! Engine haben alle Felder Standardwerte.

use std::time::Duration;

use podium_observability::LoggingConfig;
use podium_session::SessionConfig;
use serde::{Deserialize, Serialize};

/// Umgebungsvariable, die `[engine] app_id` ueberschreibt
pub const ENV_APP_ID: &str = "PODIUM_APP_ID";

/// Vollstaendige Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PodiumConfig {
    pub engine: EngineEinstellungen,
    pub token: TokenEinstellungen,
    pub sitzung: SessionConfig,
    pub logging: LoggingConfig,
}

/// Echtzeit-Engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineEinstellungen {
    /// Anwendungs-ID beim Engine-Anbieter (Pflicht)
    pub app_id: String,
}

/// Token-Dienst
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenEinstellungen {
    /// Leer = simulierter Token-Dienst ohne Netzwerk
    pub url: String,
    pub timeout_sekunden: u64,
}

impl Default for TokenEinstellungen {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_sekunden: 10,
        }
    }
}

impl TokenEinstellungen {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_sekunden.max(1))
    }

    pub fn ist_simuliert(&self) -> bool {
        self.url.trim().is_empty()
    }
}

impl PodiumConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Uebernimmt `PODIUM_APP_ID`, falls gesetzt
    pub fn mit_umgebung(mut self) -> Self {
        if let Ok(app_id) = std::env::var(ENV_APP_ID) {
            if !app_id.trim().is_empty() {
                self.engine.app_id = app_id;
            }
        }
        self
    }

    /// Prueft Pflichtfelder vor dem Start
    pub fn pruefen(&self) -> anyhow::Result<()> {
        if self.engine.app_id.trim().is_empty() {
            anyhow::bail!(
                "Keine Engine-App-ID konfiguriert ([engine] app_id oder {ENV_APP_ID})"
            );
        }
        if self.sitzung.befehls_queue == 0 || self.sitzung.event_queue == 0 {
            anyhow::bail!("Warteschlangen-Groessen muessen groesser 0 sein");
        }
        if self.sitzung.beitritt_timeout_ms == 0 {
            anyhow::bail!("[sitzung] beitritt_timeout_ms muss groesser 0 sein");
        }
        Ok(())
    }
}
