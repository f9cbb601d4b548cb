//! Error types for the availability-accounting module

use thiserror::Error;

pub type AvailabilityResult<T> = Result<T, AvailabilityError>;

#[derive(Error, Debug)]
pub enum AvailabilityError {
    #[error(transparent)]
    Execution(#[from] availsim_execution_plane::ExecutionError),

    #[error(transparent)]
    Recovery(#[from] availsim_recovery::RecoveryError),

    #[error("shutdown/heal handler for {component} never observed a {phase} state after bounded polling")]
    HandlerStuck { component: String, phase: &'static str },
}
