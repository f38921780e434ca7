//! Structured Logging Setup via tracing-subscriber
//!
//! Ueberschreibbar per Umgebungsvariable:
//! - `PODIUM_LOG_LEVEL`: Filter-Direktive (z.B. `debug` oder `podium_session=trace`)
//! - `PODIUM_LOG_FORMAT`: `text` oder `json`

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LEVEL: &str = "PODIUM_LOG_LEVEL";
pub const ENV_FORMAT: &str = "PODIUM_LOG_FORMAT";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unbekanntes Log-Format '{0}' (erlaubt: text, json)")]
pub struct UnbekanntesFormat(String);

/// Ausgabeformat der Logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = UnbekanntesFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(UnbekanntesFormat(s.to_string())),
        }
    }
}

/// Abschnitt `[logging]` der Anwendungskonfiguration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Text,
        }
    }
}

impl LoggingConfig {
    /// Wendet gesetzte Umgebungsvariablen an
    pub fn mit_umgebung(self) -> Self {
        self.ueberschreiben(
            std::env::var(ENV_LEVEL).ok(),
            std::env::var(ENV_FORMAT).ok(),
        )
    }

    fn ueberschreiben(mut self, level: Option<String>, format: Option<String>) -> Self {
        if let Some(level) = level.filter(|l| !l.trim().is_empty()) {
            self.level = level;
        }
        if let Some(format) = format {
            match format.parse() {
                Ok(f) => self.format = f,
                // Subscriber existiert noch nicht, daher stderr
                Err(e) => eprintln!("{ENV_FORMAT} ignoriert: {e}"),
            }
        }
        self
    }

    /// Baut den Filter, bei ungueltiger Direktive `info`
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.level).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Initialisiert das Logging-System
///
/// Schlaegt fehl, wenn bereits ein globaler Subscriber gesetzt ist.
pub fn logging_initialisieren(config: &LoggingConfig) -> anyhow::Result<()> {
    let config = config.clone().mit_umgebung();
    let filter = config.filter();

    match config.format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(true).try_init(),
    }
    .map_err(|e| anyhow::anyhow!("Logging konnte nicht initialisiert werden: {e}"))?;

    tracing::debug!(level = %config.level, format = ?config.format, "Logging initialisiert");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsen() {
        assert_eq!("text".parse(), Ok(LogFormat::Text));
        assert_eq!("JSON".parse(), Ok(LogFormat::Json));
        assert!("xml".parse::<LogFormat>().is_err());
        assert!("".parse::<LogFormat>().is_err());
    }

    #[test]
    fn standardwerte() {
        let cfg = LoggingConfig::default();
        assert_eq!(cfg.level, "info");
        assert_eq!(cfg.format, LogFormat::Text);
    }

    #[test]
    fn umgebung_ueberschreibt() {
        let cfg = LoggingConfig::default()
            .ueberschreiben(Some("podium_session=trace".into()), Some("json".into()));
        assert_eq!(cfg.level, "podium_session=trace");
        assert_eq!(cfg.format, LogFormat::Json);
    }

    #[test]
    fn leere_oder_ungueltige_umgebung_wird_ignoriert() {
        let cfg = LoggingConfig::default().ueberschreiben(Some("  ".into()), Some("xml".into()));
        assert_eq!(cfg.level, "info");
        assert_eq!(cfg.format, LogFormat::Text);
    }

    #[test]
    fn aus_toml() {
        let cfg: LoggingConfig = toml::from_str("format = \"json\"").unwrap();
        assert_eq!(cfg.format, LogFormat::Json);
        assert_eq!(cfg.level, "info");
    }
}
