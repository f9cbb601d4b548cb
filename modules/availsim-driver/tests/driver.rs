use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use availsim_execution_plane::{DiscoveryCache, ExecutionOutcome, ExecutionPlane, ExecutionResult};
use availsim_recovery::{HealthProbeClient, RecoveryResult};
use availsim_reporter::{IncrementalReporter, RunDirectory};
use availsim_topology::{build_topology, TopologyConfig};

use availsim_driver::{DriverConfig, InterruptHandler, IterationDriver};

struct StubPlane {
    executions: AtomicUsize,
    running: AtomicBool,
}

#[async_trait]
impl ExecutionPlane for StubPlane {
    async fn execute(&self, _component_id: &str, _process_name: &str, _operation: &str) -> ExecutionResult<ExecutionOutcome> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        Ok(ExecutionOutcome::Applied { shutdown_class: false })
    }

    async fn restore(&self, _component_id: &str) -> ExecutionResult<()> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn is_running(&self, _component_id: &str, _process_name: &str) -> ExecutionResult<bool> {
        Ok(self.running.load(Ordering::SeqCst))
    }
}

struct AlwaysHealthyProbe;

#[async_trait]
impl HealthProbeClient for AlwaysHealthyProbe {
    async fn is_serving(&self, _url: &str) -> RecoveryResult<bool> {
        Ok(true)
    }
}

fn single_pod_config() -> TopologyConfig {
    TopologyConfig::from_json_str(
        r#"{
            "experiment_config": {"applications": {"web": true}, "worker_node": {}, "control_plane": {}},
            "mttf_config": {"pods": {"pod": 0.01}, "worker_node": {}, "control_plane": {}},
            "mttr_config": {"pods": {"pod": 0.001}, "worker_node": {}, "control_plane": {}},
            "availability_criteria": {"web": 1},
            "duration": 0.05,
            "iterations": 1,
            "delay": 0.0000005
        }"#,
    )
    .unwrap()
}

#[tokio::test]
async fn single_pod_deterministic_run_produces_a_final_report() {
    let topology_config = single_pod_config();
    let topology = build_topology(&topology_config).unwrap();

    let plane = Arc::new(StubPlane {
        executions: AtomicUsize::new(0),
        running: AtomicBool::new(true),
    });
    let cache = Arc::new(DiscoveryCache::new(Duration::from_secs(60)));
    let probe = Arc::new(AlwaysHealthyProbe);

    let tmp = tempfile::tempdir().unwrap();
    let run_dir = RunDirectory::create(tmp.path(), chrono::Utc::now()).unwrap();
    let reporter = IncrementalReporter::new(run_dir).unwrap();

    let (_tx, rx) = tokio::sync::watch::channel(false);
    let interrupt = InterruptHandler::from_receiver(rx);

    let config = DriverConfig {
        seed: 42,
        recovery_timeout: Duration::from_millis(50),
        recovery_poll_interval: Duration::from_millis(1),
        shutdown_soak: Duration::from_millis(1),
        state_poll_interval: Duration::from_millis(1),
        state_poll_max_attempts: 5,
        observation_timeout: Duration::from_millis(50),
        pod_url: Arc::new(|id: &str| format!("http://{id}.svc.local/healthz")),
    };

    let mut driver = IterationDriver::new(topology, plane, cache, probe, reporter, interrupt, config);
    let outcomes = driver.run(serde_json::json!({"duration": 0.05})).await.unwrap();

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].availability_ratio >= 0.0 && outcomes[0].availability_ratio <= 1.0);
    assert!(!outcomes[0].interrupted);

    let report_dir = driver.reporter_path();
    assert!(report_dir.join("experiment_config.json").is_file());
    assert!(report_dir.join("experiment_components.csv").is_file());
    assert!(report_dir.join("experiment_all_events.csv").is_file());
    assert!(report_dir.join("ITERACAO1").join("events.csv").is_file());
}

#[tokio::test]
async fn interrupted_run_still_leaves_partial_artifacts() {
    let topology_config = single_pod_config();
    let topology = build_topology(&topology_config).unwrap();

    let plane = Arc::new(StubPlane {
        executions: AtomicUsize::new(0),
        running: AtomicBool::new(true),
    });
    let cache = Arc::new(DiscoveryCache::new(Duration::from_secs(60)));
    let probe = Arc::new(AlwaysHealthyProbe);

    let tmp = tempfile::tempdir().unwrap();
    let run_dir = RunDirectory::create(tmp.path(), chrono::Utc::now()).unwrap();
    let reporter = IncrementalReporter::new(run_dir).unwrap();

    let (tx, rx) = tokio::sync::watch::channel(true); // already interrupted
    let _ = tx;
    let interrupt = InterruptHandler::from_receiver(rx);

    let config = DriverConfig {
        seed: 1,
        recovery_timeout: Duration::from_millis(10),
        recovery_poll_interval: Duration::from_millis(1),
        shutdown_soak: Duration::from_millis(1),
        state_poll_interval: Duration::from_millis(1),
        state_poll_max_attempts: 5,
        observation_timeout: Duration::from_millis(50),
        pod_url: Arc::new(|id: &str| format!("http://{id}.svc.local/healthz")),
    };

    let mut driver = IterationDriver::new(topology, plane, cache, probe, reporter, interrupt, config);
    let outcomes = driver.run(serde_json::json!({})).await.unwrap();
    assert!(outcomes.is_empty());

    let report_dir = driver.reporter_path();
    assert!(report_dir.join("experiment_config.json").is_file());
}
