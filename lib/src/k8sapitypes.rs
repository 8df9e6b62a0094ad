//! Subset of API definitions for the Kubernetes Pod type.
//! We avoid dragging in all of k8s-openapi because it's *huge*, and
//! translation only needs the metadata maps and a few container fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::quantity::Quantity;

/// A pod, as far as translation is concerned.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    /// Standard object metadata
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// The pod specification
    #[serde(default)]
    pub spec: PodSpec,
}

/// Standard object metadata.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Unstructured key-value data set by the control plane
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
    /// Identifying key-value data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    /// Object name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Object namespace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// The subset of the pod specification we read.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    /// Containers in the pod, in declaration order
    #[serde(default)]
    pub containers: Vec<Container>,
}

/// A single container in a pod.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Container name, unique within the pod
    pub name: String,
    /// Image reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Whether a TTY is allocated
    #[serde(default)]
    pub tty: bool,
    /// Compute resources
    #[serde(default)]
    pub resources: ResourceRequirements,
}

/// Compute resources of a container, keyed by resource name.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequirements {
    /// Upper bounds
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<String, Quantity>,
    /// Amounts reserved for scheduling
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<String, Quantity>,
}

impl Pod {
    /// The workload's own container: the one named after the pod,
    /// otherwise the first one declared.
    pub fn user_container(&self) -> Option<&Container> {
        let containers = &self.spec.containers;
        self.metadata
            .name
            .as_deref()
            .and_then(|name| containers.iter().find(|c| c.name == name))
            .or_else(|| containers.first())
    }
}
