//! Availability accounting (C7) and the shutdown/heal handler (C8).

pub mod error;
pub mod handler;
pub mod integrator;

pub use error::{AvailabilityError, AvailabilityResult};
pub use handler::{HealOutcome, ShutdownHealHandler};
pub use integrator::AvailabilityIntegrator;
