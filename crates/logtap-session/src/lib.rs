//! Session orchestration for the diagnostic log subsystem.
//!
//! Provides:
//! - `Session` - cursor-paged, TTL-bounded access to one log queue
//! - `SessionRegistry` - concurrent id -> session mapping with lazy expiry
//! - `Pruner` - background sweep for expired sessions
//! - `SessionConfig` - page size and TTL tunables

pub mod config;
pub mod pruner;
pub mod registry;
pub mod session;

pub use config::SessionConfig;
pub use pruner::Pruner;
pub use registry::{PruneSummary, SessionRegistry};
pub use session::Session;
