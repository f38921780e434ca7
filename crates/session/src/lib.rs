//! podium-session – Session-Koordinator
//!
//! Koordiniert Kanal-Lebenszyklus, Rolle des lokalen Teilnehmers, Rederecht
//! und Teilnehmer-Menge ueber einer austauschbaren Echtzeit-Engine.
//!
//! Einstiegspunkt ist [`SessionHandle::start`]. Der Handle ist klonbar und
//! liefert Lesesichten ([`SessionSnapshot`]) ueber einen `watch`-Kanal.

pub mod config;
pub mod engine;
pub mod floor;
pub mod handle;
pub mod machine;
pub mod registry;
pub mod role;
pub mod simulated;
pub mod snapshot;

pub use config::SessionConfig;
pub use engine::{CredentialFetcher, RealtimeEngine};
pub use floor::FloorControlCoordinator;
pub use handle::SessionHandle;
pub use machine::SessionStateMachine;
pub use registry::{LogEintrag, PeerRegistry};
pub use role::RoleController;
pub use simulated::{SimulatedCredentials, SimulatedEngine};
pub use snapshot::SessionSnapshot;
