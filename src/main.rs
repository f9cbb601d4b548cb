//! CLI entry point wiring the topology, execution plane, recovery, and
//! reporting crates into a runnable simulation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use availsim_driver::{DriverConfig, InterruptHandler, IterationDriver};
use availsim_execution_plane::{DiscoveryCache, LocalBackend, RemoteBackend};
use availsim_recovery::HttpProbeClient;
use availsim_reporter::{IncrementalReporter, RunDirectory};
use availsim_topology::{build_topology, TopologyConfig};

#[derive(Parser)]
#[command(name = "availsim", version, about = "Availability simulator with real-fault injection")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Runs the simulator against a topology/run configuration file.
    RunFromConfig {
        /// Path to the JSON topology configuration.
        config: PathBuf,
        /// Directory under which dated run output directories are created.
        #[arg(long, default_value = "runs")]
        output_dir: PathBuf,
        /// Use the remote (SSH) execution backend instead of local docker exec.
        #[arg(long)]
        remote: bool,
        /// SSH private key path, required when --remote is set.
        #[arg(long)]
        ssh_key: Option<PathBuf>,
        /// SSH user, required when --remote is set.
        #[arg(long, default_value = "ubuntu")]
        ssh_user: String,
        /// RNG seed; omit for a time-derived seed captured in the config snapshot.
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Discovers cluster topology and emits a ready-to-run config file.
    DiscoverAndEmitConfig,
    /// Probes live infrastructure to calibrate MTTR inputs.
    ProbeMttr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::RunFromConfig {
            config,
            output_dir,
            remote,
            ssh_key,
            ssh_user,
            seed,
        } => run_from_config(config, output_dir, remote, ssh_key, ssh_user, seed).await,
        Command::DiscoverAndEmitConfig => {
            eprintln!(
                "discover-and-emit-config is not implemented: cluster discovery requires an \
                 infrastructure API client this core does not define. Hand-author a topology \
                 config and pass it to run-from-config instead."
            );
            std::process::exit(1);
        }
        Command::ProbeMttr => {
            eprintln!(
                "probe-mttr is not implemented: MTTR calibration against live infrastructure is \
                 outside this core's scope. Supply mttr_config values directly in the topology \
                 config."
            );
            std::process::exit(1);
        }
    }
}

async fn run_from_config(
    config_path: PathBuf,
    output_dir: PathBuf,
    remote: bool,
    ssh_key: Option<PathBuf>,
    ssh_user: String,
    seed: u64,
) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(&config_path)
        .await
        .with_context(|| format!("reading topology config at {}", config_path.display()))?;
    let topology_config = TopologyConfig::from_json_str(&raw).context("parsing topology config")?;
    let topology = build_topology(&topology_config).context("resolving topology")?;

    let cache = Arc::new(DiscoveryCache::new(Duration::from_secs(300)));
    let probe_client = Arc::new(HttpProbeClient::new(Duration::from_secs(5)));

    let run_dir = RunDirectory::create(&output_dir, chrono::Utc::now()).context("creating run directory")?;
    tracing::info!(path = %run_dir.path().display(), "writing report to");
    let reporter = IncrementalReporter::new(run_dir).context("opening incremental reporter")?;

    let interrupt = InterruptHandler::spawn();

    // Snapshot the *resolved* topology, not the raw input document, so
    // experiment_config.json records what each component's mttf/mttr
    // actually resolved to after the key-recognition rule ran.
    let config_snapshot = serde_json::to_value(topology.resolved_config()).context("serializing config snapshot")?;

    let driver_config = DriverConfig {
        seed,
        recovery_timeout: Duration::from_secs(300),
        recovery_poll_interval: Duration::from_secs(5),
        shutdown_soak: Duration::from_secs(60),
        state_poll_interval: Duration::from_secs(2),
        state_poll_max_attempts: 30,
        observation_timeout: Duration::from_secs(300),
        pod_url: Arc::new(|id: &str| format!("http://{id}/healthz")),
    };

    if remote {
        let ssh_key = ssh_key.context("--ssh-key is required with --remote")?;
        let plane = Arc::new(RemoteBackend::new(
            ssh_key.display().to_string(),
            ssh_user,
            Arc::clone(&cache),
        ));
        let mut driver = IterationDriver::new(topology, plane, cache, probe_client, reporter, interrupt, driver_config);
        driver.run(config_snapshot).await.context("running simulation")?;
    } else {
        let plane = Arc::new(LocalBackend::new("docker"));
        let mut driver = IterationDriver::new(topology, plane, cache, probe_client, reporter, interrupt, driver_config);
        driver.run(config_snapshot).await.context("running simulation")?;
    }

    Ok(())
}
