//! Error types for the event-simulation module

use thiserror::Error;

pub type EventSimResult<T> = Result<T, EventSimError>;

#[derive(Error, Debug)]
pub enum EventSimError {
    #[error("cannot draw a failure time for non-positive mttf_hours: {mttf_hours}")]
    NonPositiveMttf { mttf_hours: f64 },
}
