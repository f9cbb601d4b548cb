//! Component model and topology resolution (C1).
//!
//! Loads the external JSON topology/run configuration, resolves it against
//! the key-recognition rule into a concrete set of [`Component`]s, and
//! validates the parent/type-compatibility invariant.

pub mod component;
pub mod config;
pub mod error;

pub use component::{Component, ComponentStatus, ComponentType};
pub use config::{build_topology, ExperimentConfigSection, RateConfigSection, Topology, TopologyConfig};
pub use error::{TopologyError, TopologyResult};
