//! Top-level error type wrapping every sub-crate's error.

use thiserror::Error;

pub type DriverResult<T> = Result<T, DriverError>;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error(transparent)]
    Topology(#[from] availsim_topology::TopologyError),

    #[error(transparent)]
    EventSim(#[from] availsim_eventsim::EventSimError),

    #[error(transparent)]
    Execution(#[from] availsim_execution_plane::ExecutionError),

    #[error(transparent)]
    Recovery(#[from] availsim_recovery::RecoveryError),

    #[error(transparent)]
    Availability(#[from] availsim_availability::AvailabilityError),

    #[error(transparent)]
    Report(#[from] availsim_reporter::ReportError),
}
