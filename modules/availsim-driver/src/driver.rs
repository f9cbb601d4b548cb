//! The Iteration Driver (C10): runs the per-iteration discrete-event loop
//! and aggregates results across iterations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use availsim_availability::{AvailabilityIntegrator, ShutdownHealHandler};
use availsim_eventsim::{EventQueue, FailureTimeGenerator};
use availsim_execution_plane::{DiscoveryCache, ExecutionPlane, FaultDispatcher};
use availsim_recovery::{HealthProbeClient, RecoveryDetector};
use availsim_reporter::{EventRecord, IncrementalReporter, IterationStats, IterationSummary};
use availsim_topology::{Component, ComponentType, Topology};
use tracing::{info, warn};

use crate::error::DriverResult;
use crate::interrupt::InterruptHandler;

/// Builds the HTTP URL a pod/container component is probed at. Kept as a
/// pluggable function rather than a fixed template since the real cluster's
/// service DNS scheme is an operational detail outside this core.
pub type PodUrlBuilder = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Extra settle time applied after a worker-node or control-plane event, on
/// top of `inter_failure_delay_secs`: these events can leave a node mid-boot
/// even once its own process checks pass, and the next event's fault
/// injection landing on a still-settling node tends to produce noisy,
/// unrepresentative recovery timings.
const NODE_CLASS_STABILIZATION_SLEEP_SECS: f64 = 30.0;

pub struct DriverConfig {
    pub seed: u64,
    pub recovery_timeout: Duration,
    pub recovery_poll_interval: Duration,
    pub shutdown_soak: Duration,
    /// How often the shutdown/heal handler polls a component's process state
    /// while waiting for it to reach "stopped" or "running".
    pub state_poll_interval: Duration,
    /// Bounds the shutdown/heal handler's polling: a component stuck in
    /// neither state after this many attempts is reported as a failure.
    pub state_poll_max_attempts: u32,
    /// Bounds the shutdown/heal handler's post-restart observational
    /// Recovery Detector pass (diagnostic only, never attributed as
    /// downtime).
    pub observation_timeout: Duration,
    pub pod_url: PodUrlBuilder,
}

pub struct IterationOutcome {
    pub iteration: u32,
    pub availability_ratio: f64,
    pub total_available_hours: f64,
    pub total_downtime_hours: f64,
    pub total_failures: u64,
    pub interrupted: bool,
}

/// What the Recovery Detector actually observed while accounting for a
/// non-shutdown-class event: kept distinct from the heal handler's
/// diagnostic-only reading, since here the observed recovery time *is* the
/// attributed downtime.
struct RecoveryAccounting {
    downtime_hours: f64,
    recovery_seconds: f64,
    available: u32,
}

pub struct IterationDriver<E: ExecutionPlane, P: HealthProbeClient> {
    topology: Topology,
    plane: Arc<E>,
    cache: Arc<DiscoveryCache>,
    recovery: RecoveryDetector<P>,
    reporter: IncrementalReporter,
    interrupt: InterruptHandler,
    config: DriverConfig,
}

impl<E: ExecutionPlane, P: HealthProbeClient> IterationDriver<E, P> {
    pub fn new(
        topology: Topology,
        plane: Arc<E>,
        cache: Arc<DiscoveryCache>,
        probe_client: Arc<P>,
        reporter: IncrementalReporter,
        interrupt: InterruptHandler,
        config: DriverConfig,
    ) -> Self {
        let recovery = RecoveryDetector::new(probe_client, config.recovery_poll_interval);
        Self {
            topology,
            plane,
            cache,
            recovery,
            reporter,
            interrupt,
            config,
        }
    }

    pub fn reporter_path(&self) -> &std::path::Path {
        self.reporter.directory().path()
    }

    /// Runs every configured iteration, writing incremental and final
    /// reports, and returns the per-iteration outcomes actually completed
    /// (fewer than `topology.iterations` if interrupted).
    pub async fn run(&mut self, config_snapshot: serde_json::Value) -> DriverResult<Vec<IterationOutcome>> {
        let mut outcomes = Vec::new();
        let mut component_downtime: HashMap<String, f64> = HashMap::new();

        for iteration in 0..self.topology.iterations {
            if self.interrupt.is_interrupted() {
                warn!(iteration, "interrupted before iteration started, stopping run");
                break;
            }
            let outcome = self
                .run_single_iteration(iteration, &mut component_downtime)
                .await?;
            let interrupted = outcome.interrupted;
            self.reporter.record_iteration_summary(IterationSummary {
                iteration: outcome.iteration,
                availability_ratio: outcome.availability_ratio,
                total_available_hours: outcome.total_available_hours,
                total_downtime_hours: outcome.total_downtime_hours,
                total_failures: outcome.total_failures,
                horizon_hours: self.topology.duration_hours,
            });
            outcomes.push(outcome);
            if interrupted {
                break;
            }
        }

        self.reporter
            .finalize(&config_snapshot, &self.topology.components, &component_downtime)?;
        Ok(outcomes)
    }

    async fn run_single_iteration(
        &mut self,
        iteration: u32,
        component_downtime: &mut HashMap<String, f64>,
    ) -> DriverResult<IterationOutcome> {
        self.topology.reset();
        self.reporter.start_iteration(iteration)?;
        let iteration_started = Instant::now();
        let mut generator = FailureTimeGenerator::new(self.config.seed.wrapping_add(iteration as u64));
        let mut dispatcher = FaultDispatcher::new(self.config.seed.wrapping_add(1_000 + iteration as u64));
        let mut queue = EventQueue::new();

        for component in &self.topology.components {
            let t = generator.next_failure_time(component.mttf_hours, 0.0)?;
            queue.push(t, component.id.clone());
        }

        let mut integrator = AvailabilityIntegrator::new(self.topology.duration_hours);
        let mut system_available = true;
        let mut events_processed: u64 = 0;
        let mut interrupted = false;
        let required_pod_count = self.required_pod_count();

        loop {
            if self.interrupt.is_interrupted() {
                interrupted = true;
                break;
            }
            let Some(event) = queue.pop_min() else { break };
            if event.sim_time_hours > self.topology.duration_hours {
                break;
            }

            integrator.advance(event.sim_time_hours, system_available);

            let Some(component) = self.topology.find(&event.component_id).cloned() else {
                warn!(component_id = %event.component_id, "event for unknown component, skipping");
                continue;
            };
            let operation = dispatcher.select_operation(&component, None)?;
            let shutdown_class = component.component_type.is_shutdown_class_op(operation);

            let (downtime_hours, recovery_seconds, available_pod_count) = if shutdown_class {
                let handler = ShutdownHealHandler::new(
                    Arc::clone(&self.plane),
                    self.config.shutdown_soak,
                    self.config.state_poll_interval,
                    self.config.state_poll_max_attempts,
                    self.config.observation_timeout,
                );
                let observation_urls = self.all_pod_urls();
                let outcome = handler
                    .handle_shutdown(
                        &component,
                        &self.cache,
                        &self.recovery,
                        &observation_urls,
                        component.component_type.process_name(),
                        operation,
                    )
                    .await?;
                (
                    outcome.downtime_hours,
                    outcome.observed_recovery_seconds,
                    outcome.observed_healthy_count.unwrap_or(0) as u32,
                )
            } else {
                self.plane
                    .execute(&component.id, component.component_type.process_name(), operation)
                    .await?;
                let accounting = self.recovery_accounting(&component).await?;
                (
                    accounting.downtime_hours,
                    Some(accounting.recovery_seconds),
                    accounting.available,
                )
            };

            integrator.advance(event.sim_time_hours + downtime_hours, false);
            // The component is healed by the end of its own downtime slice;
            // each event owns its slice independently (no amortisation
            // across concurrently-degraded components), so the system is
            // back up for any subsequent gap until the next event.
            system_available = true;
            events_processed += 1;

            let cumulative_downtime_hours = {
                let entry = component_downtime.entry(component.id.clone()).or_insert(0.0);
                *entry += downtime_hours;
                *entry
            };
            if let Some(c) = self.topology.find_mut(&component.id) {
                c.record_failure();
                c.mark_healthy();
            }

            let running_availability_percent = if required_pod_count > 0 {
                (available_pod_count.min(required_pod_count) as f64 / required_pod_count as f64) * 100.0
            } else {
                100.0
            };

            self.reporter.record_event(&EventRecord {
                iteration,
                sim_time_hours: event.sim_time_hours,
                wall_time_seconds_from_iter_start: iteration_started.elapsed().as_secs_f64(),
                component_id: component.id.clone(),
                component_type: component.component_type.to_string(),
                operation: operation.to_string(),
                shutdown_class,
                recovered: true,
                downtime_hours,
                recovery_seconds,
                available_pod_count,
                required_pod_count,
                running_availability_percent,
                system_available_after: system_available,
                cumulative_downtime_hours,
            })?;

            self.reporter.rewrite_statistics(&IterationStats {
                iteration,
                events_processed,
                sim_time_hours: event.sim_time_hours,
                availability_ratio: integrator.availability_ratio(),
                total_available_hours: integrator.total_available_hours(),
                total_downtime_hours: integrator.total_downtime_hours(),
            })?;

            let next = generator.next_failure_time(component.mttf_hours, event.sim_time_hours + downtime_hours)?;
            queue.push(next, component.id.clone());

            tokio::time::sleep(Duration::from_secs_f64(self.topology.inter_failure_delay_secs)).await;
            if matches!(component.component_type, ComponentType::WorkerNode | ComponentType::ControlPlane) {
                tokio::time::sleep(Duration::from_secs_f64(NODE_CLASS_STABILIZATION_SLEEP_SECS)).await;
            }
        }

        if !interrupted {
            integrator.finish(system_available);
        }

        info!(
            iteration,
            availability_ratio = integrator.availability_ratio(),
            events_processed,
            "iteration complete"
        );

        Ok(IterationOutcome {
            iteration,
            availability_ratio: integrator.availability_ratio(),
            total_available_hours: integrator.total_available_hours(),
            total_downtime_hours: integrator.total_downtime_hours(),
            total_failures: events_processed,
            interrupted,
        })
    }

    /// Every application pod's probe URL, used both as the Recovery
    /// Detector's discovery set for infrastructure-level faults (there being
    /// no discrete HTTP surface on a kubelet or an etcd member itself) and as
    /// the shutdown/heal handler's post-restart observational pass.
    fn all_pod_urls(&self) -> Vec<String> {
        self.topology
            .components
            .iter()
            .filter(|c| matches!(c.component_type, ComponentType::Pod | ComponentType::Container))
            .map(|c| (self.config.pod_url)(&c.id))
            .collect()
    }

    fn required_pod_count(&self) -> u32 {
        self.topology.availability_criteria.values().sum()
    }

    /// Routes every non-shutdown-class operation through the real Recovery
    /// Detector: a pod/container fault is probed against its own URL and its
    /// own `availability_criteria` minimum; an infrastructure sub-component
    /// fault (kubelet, runtime, proxy, apiserver, manager, scheduler, store)
    /// is probed against every application pod, since "real recovery" from
    /// an infra-level fault is measured by whether the pods that depend on
    /// it come back, not by a configured MTTR guess.
    async fn recovery_accounting(&self, component: &Component) -> DriverResult<RecoveryAccounting> {
        let (discover, min_healthy) = match component.component_type {
            ComponentType::Pod | ComponentType::Container => {
                let min_healthy = *self.topology.availability_criteria.get(&component.id).unwrap_or(&1) as usize;
                (vec![(self.config.pod_url)(&component.id)], min_healthy)
            }
            _ => {
                let min_healthy = self.required_pod_count() as usize;
                (self.all_pod_urls(), min_healthy)
            }
        };
        let outcome = self
            .recovery
            .wait_for_recovery(move || discover.clone(), min_healthy, self.config.recovery_timeout)
            .await?;
        Ok(RecoveryAccounting {
            downtime_hours: outcome.elapsed.as_secs_f64() / 3600.0,
            recovery_seconds: outcome.elapsed.as_secs_f64(),
            available: outcome.healthy_count as u32,
        })
    }
}
