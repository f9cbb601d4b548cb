//! Error types for the execution-plane module

use thiserror::Error;

pub type ExecutionResult<T> = Result<T, ExecutionError>;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("component {component} has no allowed operations configured")]
    NoOperations { component: String },

    #[error("discovery cache has no public address cached for node {node_id}")]
    NodeNotDiscovered { node_id: String },

    #[error("discovery cache has no bastion address configured")]
    BastionNotConfigured,

    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} against {target} exited with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        target: String,
        status: i32,
        stderr: String,
    },
}
