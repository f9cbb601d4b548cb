//! The Fault Dispatcher (C4): picks which allowed operation to fire against
//! a failing component.

use availsim_topology::Component;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use crate::error::{ExecutionError, ExecutionResult};

/// Selects an operation from a component's allowed-operations table,
/// uniformly at random, from a seeded RNG (kept separate from the
/// failure-time generator's RNG so operation selection doesn't perturb
/// the failure-time sequence when more component types are added).
pub struct FaultDispatcher {
    rng: StdRng,
}

impl FaultDispatcher {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Picks the operation to run for `component`'s current failure.
    ///
    /// `requested_op`, when given, is honored if it's in the component's
    /// allowed-operations table; otherwise the first allowed operation is
    /// used instead and the mismatch is logged. With no requested
    /// operation, one is chosen uniformly at random from the table.
    pub fn select_operation(
        &mut self,
        component: &Component,
        requested_op: Option<&str>,
    ) -> ExecutionResult<&'static str> {
        let ops = component.allowed_operations();
        if ops.is_empty() {
            return Err(ExecutionError::NoOperations {
                component: component.id.clone(),
            });
        }
        if let Some(requested) = requested_op {
            if let Some(&matched) = ops.iter().find(|op| **op == requested) {
                return Ok(matched);
            }
            warn!(
                component = %component.id,
                requested,
                fallback = ops[0],
                "requested operation not allowed for component, falling back to first allowed operation"
            );
            return Ok(ops[0]);
        }
        let idx = self.rng.gen_range(0..ops.len());
        Ok(ops[idx])
    }
}
