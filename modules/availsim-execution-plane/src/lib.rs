//! Fault dispatch (C4), the execution plane backends (C5), and the
//! discovery cache (C12).

pub mod cache;
pub mod dispatcher;
pub mod error;
pub mod plane;

pub use cache::DiscoveryCache;
pub use dispatcher::FaultDispatcher;
pub use error::{ExecutionError, ExecutionResult};
pub use plane::{ExecutionOutcome, ExecutionPlane, LocalBackend, RemoteBackend};
