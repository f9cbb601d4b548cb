//! The Component model (C1)

use serde::{Deserialize, Serialize};

/// Type tag for a component in the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentType {
    Pod,
    Container,
    WorkerNode,
    WorkerRuntime,
    WorkerProxy,
    WorkerKubelet,
    ControlPlane,
    CpApiserver,
    CpManager,
    CpScheduler,
    CpStore,
}

impl ComponentType {
    /// The normative allowed-operations table (spec §4.3). The first entry
    /// in each slice is the default operation for components where the spec
    /// calls one out explicitly (worker-node, control-plane).
    pub fn allowed_operations(self) -> &'static [&'static str] {
        match self {
            ComponentType::Pod | ComponentType::Container => {
                &["kill-all-processes", "kill-init"]
            }
            ComponentType::WorkerNode => &["shutdown-and-restart", "kill-critical-processes"],
            ComponentType::WorkerRuntime => &["restart-runtime"],
            ComponentType::WorkerProxy => &["kill-proxy"],
            ComponentType::WorkerKubelet => &["kill-kubelet"],
            ComponentType::ControlPlane => &["shutdown-and-restart", "kill-critical-processes"],
            ComponentType::CpApiserver => &["kill-apiserver"],
            ComponentType::CpManager => &["kill-controller-manager"],
            ComponentType::CpScheduler => &["kill-scheduler"],
            ComponentType::CpStore => &["kill-store"],
        }
    }

    /// Whether this component's allowed operations are all shutdown-class
    /// (i.e. require the Shutdown/Heal Handler rather than the Recovery
    /// Detector).
    pub fn is_shutdown_class_op(self, op: &str) -> bool {
        op == "shutdown-and-restart"
    }

    /// The sub-component config-key prefix recognised for this type, if any
    /// (spec §6's "key recognition rule"). `None` for types addressed only
    /// by bare type key.
    pub fn config_prefix(self) -> Option<&'static str> {
        match self {
            ComponentType::WorkerRuntime => Some("wn_runtime-"),
            ComponentType::WorkerProxy => Some("wn_proxy-"),
            ComponentType::WorkerKubelet => Some("wn_kubelet-"),
            ComponentType::CpApiserver => Some("cp_apiserver-"),
            ComponentType::CpManager => Some("cp_manager-"),
            ComponentType::CpScheduler => Some("cp_scheduler-"),
            ComponentType::CpStore => Some("cp_store-"),
            _ => None,
        }
    }

    /// The bare mttf/mttr config-type key for this type.
    pub fn config_type_key(self) -> &'static str {
        match self {
            ComponentType::Pod => "pod",
            ComponentType::Container => "container",
            ComponentType::WorkerNode => "worker_node",
            ComponentType::WorkerRuntime => "wn_runtime",
            ComponentType::WorkerProxy => "wn_proxy",
            ComponentType::WorkerKubelet => "wn_kubelet",
            ComponentType::ControlPlane => "control_plane",
            ComponentType::CpApiserver => "cp_apiserver",
            ComponentType::CpManager => "cp_manager",
            ComponentType::CpScheduler => "cp_scheduler",
            ComponentType::CpStore => "cp_store",
        }
    }

    /// The OS process name a fault operation targets for this type (used to
    /// build `pkill -f <process_name>`-style commands in the execution
    /// plane).
    pub fn process_name(self) -> &'static str {
        match self {
            ComponentType::Pod | ComponentType::Container => "app",
            ComponentType::WorkerNode => "kubelet",
            ComponentType::WorkerRuntime => "containerd",
            ComponentType::WorkerProxy => "kube-proxy",
            ComponentType::WorkerKubelet => "kubelet",
            ComponentType::ControlPlane => "kube-apiserver",
            ComponentType::CpApiserver => "kube-apiserver",
            ComponentType::CpManager => "kube-controller-manager",
            ComponentType::CpScheduler => "kube-scheduler",
            ComponentType::CpStore => "etcd",
        }
    }

    /// True if a component of `parent_type` is a valid parent for this type
    /// (spec §3's parent/type-compatibility invariant).
    pub fn compatible_parent(self, parent_type: ComponentType) -> bool {
        match self {
            ComponentType::WorkerRuntime
            | ComponentType::WorkerProxy
            | ComponentType::WorkerKubelet => parent_type == ComponentType::WorkerNode,
            ComponentType::CpApiserver
            | ComponentType::CpManager
            | ComponentType::CpScheduler
            | ComponentType::CpStore => parent_type == ComponentType::ControlPlane,
            _ => false,
        }
    }
}

impl std::fmt::Display for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.config_type_key())
    }
}

/// Runtime status of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentStatus {
    Healthy,
    Failed,
}

/// A single component in the topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub component_type: ComponentType,
    pub mttf_hours: f64,
    pub mttr_hours: Option<f64>,
    pub parent_id: Option<String>,
    pub status: ComponentStatus,
    pub failure_count: u64,
    pub accumulated_downtime_secs: f64,
}

impl Component {
    pub fn new(id: impl Into<String>, component_type: ComponentType, mttf_hours: f64) -> Self {
        Self {
            id: id.into(),
            component_type,
            mttf_hours,
            mttr_hours: None,
            parent_id: None,
            status: ComponentStatus::Healthy,
            failure_count: 0,
            accumulated_downtime_secs: 0.0,
        }
    }

    pub fn allowed_operations(&self) -> &'static [&'static str] {
        self.component_type.allowed_operations()
    }

    /// Resets mutable run state between iterations (driven by C10).
    pub fn reset(&mut self) {
        self.status = ComponentStatus::Healthy;
        self.failure_count = 0;
        self.accumulated_downtime_secs = 0.0;
    }

    pub fn record_failure(&mut self) {
        self.status = ComponentStatus::Failed;
        self.failure_count += 1;
    }

    pub fn mark_healthy(&mut self) {
        self.status = ComponentStatus::Healthy;
    }
}
