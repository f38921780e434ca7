//! # podium-observability
//!
//! Structured Logging fuer Podium via `tracing-subscriber`, wahlweise als
//! Text oder JSON. Level und Format kommen aus der Konfiguration und koennen
//! per Umgebungsvariable ueberschrieben werden.

pub mod logging;

pub use logging::{logging_initialisieren, LogFormat, LoggingConfig};
