//! podium-core – Gemeinsame Typen, Engine-Events und Fehlertypen
//!
//! Dieses Crate stellt die Bausteine bereit, die von Session-Koordinator,
//! Credential-Dienst und Anwendung gemeinsam genutzt werden.

pub mod error;
pub mod event;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{PodiumError, Result};
pub use event::{EngineEvent, OfflineReason};
pub use types::{ChannelName, ChannelProfile, Credential, PeerId, Role, SessionState};
