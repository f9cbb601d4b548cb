//! Error types for the topology module

use thiserror::Error;

/// Result type for topology operations
pub type TopologyResult<T> = Result<T, TopologyError>;

/// Errors that can occur while loading or building a topology
#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("missing required configuration key: {key}")]
    MissingKey { key: String },

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("component {component} has no positive mttf_hours configured")]
    NonPositiveMttf { component: String },

    #[error("component {component} declares parent {parent}, which does not exist in the topology")]
    MissingParent { component: String, parent: String },

    #[error("component {component} has parent {parent} of incompatible type {parent_type:?}")]
    IncompatibleParent {
        component: String,
        parent: String,
        parent_type: crate::ComponentType,
    },

    #[error("duplicate component identifier: {0}")]
    DuplicateComponent(String),

    #[error("failed to parse topology configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read topology configuration: {0}")]
    Io(#[from] std::io::Error),
}
