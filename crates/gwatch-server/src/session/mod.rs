//! Session lifecycle: registry, execution-engine seam, service façade.

pub mod executor;
pub mod registry;
pub mod service;

pub use executor::{GadgetExecutor, GadgetStream, SharedStatus, SyntheticRunner};
pub use registry::{generate_session_id, Session, SessionRegistry};
pub use service::SessionService;
