//! Topology configuration: parsing the external JSON document (spec §6) and
//! resolving it into a concrete [`crate::Topology`].

use crate::component::{Component, ComponentType};
use crate::error::{TopologyError, TopologyResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const DEFAULT_INTER_FAILURE_DELAY_SECS: f64 = 60.0;

/// `experiment_config.{applications,worker_node,control_plane}`: enablement
/// flags per category.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExperimentConfigSection {
    #[serde(default)]
    pub applications: HashMap<String, bool>,
    #[serde(default)]
    pub worker_node: HashMap<String, bool>,
    #[serde(default)]
    pub control_plane: HashMap<String, bool>,
}

/// Shape shared by `mttf_config` and `mttr_config`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RateConfigSection {
    #[serde(default)]
    pub pods: HashMap<String, f64>,
    #[serde(default)]
    pub worker_node: HashMap<String, f64>,
    #[serde(default)]
    pub control_plane: HashMap<String, f64>,
}

impl RateConfigSection {
    /// Resolve a value for `component_type` scoped to `id`, trying the
    /// identifier-specific key before falling back to the bare type key
    /// (spec §6's "key recognition rule").
    fn resolve(&self, section: &HashMap<String, f64>, component_type: ComponentType, id: &str) -> Option<f64> {
        if let Some(prefix) = component_type.config_prefix() {
            let specific = format!("{prefix}{id}");
            if let Some(v) = section.get(&specific) {
                return Some(*v);
            }
        } else if let Some(v) = section.get(id) {
            return Some(*v);
        }
        section.get(component_type.config_type_key()).copied()
    }

    pub fn resolve_for(&self, component_type: ComponentType, id: &str) -> Option<f64> {
        let bucket = match component_type {
            ComponentType::Pod | ComponentType::Container => &self.pods,
            ComponentType::WorkerNode
            | ComponentType::WorkerRuntime
            | ComponentType::WorkerProxy
            | ComponentType::WorkerKubelet => &self.worker_node,
            ComponentType::ControlPlane
            | ComponentType::CpApiserver
            | ComponentType::CpManager
            | ComponentType::CpScheduler
            | ComponentType::CpStore => &self.control_plane,
        };
        self.resolve(bucket, component_type, id)
    }
}

/// The full external JSON topology/run configuration document.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TopologyConfig {
    pub experiment_config: ExperimentConfigSection,
    #[serde(default)]
    pub mttf_config: RateConfigSection,
    #[serde(default)]
    pub mttr_config: RateConfigSection,
    #[serde(default)]
    pub availability_criteria: HashMap<String, u32>,
    pub duration: f64,
    pub iterations: u32,
    #[serde(default)]
    pub delay: Option<f64>,
}

impl TopologyConfig {
    pub fn from_json_str(raw: &str) -> TopologyResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// A resolved, immutable-shape topology ready to drive a simulation run.
#[derive(Debug, Clone)]
pub struct Topology {
    pub components: Vec<Component>,
    pub availability_criteria: HashMap<String, u32>,
    pub duration_hours: f64,
    pub iterations: u32,
    pub inter_failure_delay_secs: f64,
}

impl Topology {
    pub fn find(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.id == id)
    }

    /// Resets every component's mutable run state, used by the Iteration
    /// Driver (C10) between iterations.
    pub fn reset(&mut self) {
        for component in &mut self.components {
            component.reset();
        }
    }

    /// Rebuilds a [`TopologyConfig`] snapshot of this resolved topology: every
    /// component's mttf/mttr keyed by its own full id (bypassing the
    /// key-recognition rule's prefix/bare-type fallback), so the run report's
    /// `experiment_config.json` records what each component's rate actually
    /// resolved to rather than just echoing the raw input document.
    pub fn resolved_config(&self) -> TopologyConfig {
        let mut experiment_config = ExperimentConfigSection::default();
        let mut mttf_config = RateConfigSection::default();
        let mut mttr_config = RateConfigSection::default();

        for component in &self.components {
            let bucket_mttf = match component.component_type {
                ComponentType::Pod | ComponentType::Container => &mut mttf_config.pods,
                ComponentType::WorkerNode
                | ComponentType::WorkerRuntime
                | ComponentType::WorkerProxy
                | ComponentType::WorkerKubelet => &mut mttf_config.worker_node,
                ComponentType::ControlPlane
                | ComponentType::CpApiserver
                | ComponentType::CpManager
                | ComponentType::CpScheduler
                | ComponentType::CpStore => &mut mttf_config.control_plane,
            };
            bucket_mttf.insert(component.id.clone(), component.mttf_hours);

            if let Some(mttr_hours) = component.mttr_hours {
                let bucket_mttr = match component.component_type {
                    ComponentType::Pod | ComponentType::Container => &mut mttr_config.pods,
                    ComponentType::WorkerNode
                    | ComponentType::WorkerRuntime
                    | ComponentType::WorkerProxy
                    | ComponentType::WorkerKubelet => &mut mttr_config.worker_node,
                    ComponentType::ControlPlane
                    | ComponentType::CpApiserver
                    | ComponentType::CpManager
                    | ComponentType::CpScheduler
                    | ComponentType::CpStore => &mut mttr_config.control_plane,
                };
                bucket_mttr.insert(component.id.clone(), mttr_hours);
            }

            match component.component_type {
                ComponentType::Pod | ComponentType::Container if component.parent_id.is_none() => {
                    experiment_config.applications.insert(component.id.clone(), true);
                }
                ComponentType::WorkerNode => {
                    experiment_config.worker_node.insert(component.id.clone(), true);
                }
                ComponentType::ControlPlane => {
                    experiment_config.control_plane.insert(component.id.clone(), true);
                }
                _ => {}
            }
        }

        TopologyConfig {
            experiment_config,
            mttf_config,
            mttr_config,
            availability_criteria: self.availability_criteria.clone(),
            duration: self.duration_hours,
            iterations: self.iterations,
            delay: Some(self.inter_failure_delay_secs),
        }
    }
}

fn push_component(
    components: &mut Vec<Component>,
    seen: &mut std::collections::HashSet<String>,
    id: String,
    component_type: ComponentType,
    mttf: &RateConfigSection,
    mttr: &RateConfigSection,
    parent_id: Option<String>,
) -> TopologyResult<()> {
    if !seen.insert(id.clone()) {
        return Err(TopologyError::DuplicateComponent(id));
    }
    // Sub-components carry their parent's bare id as the lookup key; `resolve`
    // applies the type's own prefix on top of it. The component's stored `id`
    // is already prefixed (e.g. `wn_kubelet-node-a`) and would double up if
    // used here directly.
    let lookup_id = parent_id.as_deref().unwrap_or(&id);
    let mttf_hours = mttf
        .resolve_for(component_type, lookup_id)
        .ok_or_else(|| TopologyError::MissingKey {
            key: format!("mttf_config for {id} ({component_type})"),
        })?;
    if mttf_hours <= 0.0 {
        return Err(TopologyError::NonPositiveMttf { component: id });
    }
    let mttr_hours = mttr.resolve_for(component_type, lookup_id);

    let mut component = Component::new(id, component_type, mttf_hours);
    component.mttr_hours = mttr_hours;
    component.parent_id = parent_id;
    components.push(component);
    Ok(())
}

/// Builds a [`Topology`] from a [`TopologyConfig`], resolving enablement
/// flags, the key-recognition rule, and parent linkage (C1).
pub fn build_topology(config: &TopologyConfig) -> TopologyResult<Topology> {
    let mut components = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for (app_id, enabled) in &config.experiment_config.applications {
        if !*enabled {
            continue;
        }
        push_component(
            &mut components,
            &mut seen,
            app_id.clone(),
            ComponentType::Pod,
            &config.mttf_config,
            &config.mttr_config,
            None,
        )?;
    }

    for (node_id, enabled) in &config.experiment_config.worker_node {
        if !*enabled {
            continue;
        }
        push_component(
            &mut components,
            &mut seen,
            node_id.clone(),
            ComponentType::WorkerNode,
            &config.mttf_config,
            &config.mttr_config,
            None,
        )?;
        for sub_type in [
            ComponentType::WorkerKubelet,
            ComponentType::WorkerRuntime,
            ComponentType::WorkerProxy,
        ] {
            let sub_id = format!("{}{node_id}", sub_type.config_prefix().unwrap());
            push_component(
                &mut components,
                &mut seen,
                sub_id,
                sub_type,
                &config.mttf_config,
                &config.mttr_config,
                Some(node_id.clone()),
            )?;
        }
    }

    for (cp_id, enabled) in &config.experiment_config.control_plane {
        if !*enabled {
            continue;
        }
        push_component(
            &mut components,
            &mut seen,
            cp_id.clone(),
            ComponentType::ControlPlane,
            &config.mttf_config,
            &config.mttr_config,
            None,
        )?;
        for sub_type in [
            ComponentType::CpApiserver,
            ComponentType::CpManager,
            ComponentType::CpScheduler,
            ComponentType::CpStore,
        ] {
            let sub_id = format!("{}{cp_id}", sub_type.config_prefix().unwrap());
            push_component(
                &mut components,
                &mut seen,
                sub_id,
                sub_type,
                &config.mttf_config,
                &config.mttr_config,
                Some(cp_id.clone()),
            )?;
        }
    }

    // Validate the parent-type-compatibility invariant (spec §3).
    for component in &components {
        if let Some(parent_id) = &component.parent_id {
            let parent = components
                .iter()
                .find(|c| &c.id == parent_id)
                .ok_or_else(|| TopologyError::MissingParent {
                    component: component.id.clone(),
                    parent: parent_id.clone(),
                })?;
            if !component.component_type.compatible_parent(parent.component_type) {
                return Err(TopologyError::IncompatibleParent {
                    component: component.id.clone(),
                    parent: parent_id.clone(),
                    parent_type: parent.component_type,
                });
            }
        }
    }

    Ok(Topology {
        components,
        availability_criteria: config.availability_criteria.clone(),
        duration_hours: config.duration,
        iterations: config.iterations,
        inter_failure_delay_secs: config.delay.unwrap_or(DEFAULT_INTER_FAILURE_DELAY_SECS),
    })
}
