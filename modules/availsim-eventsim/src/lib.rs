//! Discrete-event simulation core: failure-time sampling (C2) and the
//! scheduled-event queue (C3).

pub mod error;
pub mod generator;
pub mod queue;

pub use error::{EventSimError, EventSimResult};
pub use generator::FailureTimeGenerator;
pub use queue::{EventQueue, ScheduledEvent};
