//! Workload specification and status types shared across UStore crates.
//!
//! Field names on the wire follow the `UStore` custom resource
//! (`dbType`, `dbServicePort`, `numOfInstances`, ...).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::EngineType;

/// Kind name of the owning custom resource.
pub const WORKLOAD_KIND: &str = "UStore";

/// API version of the owning custom resource.
pub const WORKLOAD_API_VERSION: &str = "unum.cloud/v1alpha1";

/// Namespace used when an identity is given without one.
pub const DEFAULT_NAMESPACE: &str = "default";

// ── Identity ───────────────────────────────────────────────────────

/// Identity of one workload: `{namespace}/{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkloadId {
    pub namespace: String,
    pub name: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("invalid workload identity: {0:?}")]
    Invalid(String),
}

impl WorkloadId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for WorkloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl FromStr for WorkloadId {
    type Err = IdentityError;

    /// Parses `namespace/name`, or a bare `name` in the default namespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, name) = s.split_once('/').unwrap_or((DEFAULT_NAMESPACE, s));
        if namespace.is_empty() || name.is_empty() || name.contains('/') {
            return Err(IdentityError::Invalid(s.to_string()));
        }
        Ok(Self::new(namespace, name))
    }
}

// ── Specification ──────────────────────────────────────────────────

/// A Kubernetes-style resource quantity, e.g. `10Gi` or `500m`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(pub String);

impl Quantity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Desired state of one database workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadSpec {
    /// Engine type. Mandatory and immutable once set.
    #[serde(rename = "dbType", default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineType>,
    /// Name of the config map holding the engine's `config.json`.
    #[serde(rename = "dbConfigMapName", default)]
    pub config_source: String,
    /// Port clients connect to.
    #[serde(rename = "dbServicePort")]
    pub service_port: i32,
    /// Persistent volumes, unique by mount path.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<VolumeRequest>,
    #[serde(rename = "numOfInstances", default, skip_serializing_if = "Option::is_none")]
    pub replica_count: Option<i32>,
    #[serde(rename = "memoryLimit", default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<Quantity>,
    /// CPU cores limit.
    #[serde(rename = "concurrencyLimit", default, skip_serializing_if = "Option::is_none")]
    pub concurrency_limit: Option<Quantity>,
    #[serde(rename = "nodeAffinityLabels", default, skip_serializing_if = "Vec::is_empty")]
    pub affinity: Vec<AffinityPreference>,
}

impl WorkloadSpec {
    /// Replica count, defaulting to 1 when unset or non-positive.
    pub fn replicas(&self) -> i32 {
        self.replica_count.filter(|n| *n > 0).unwrap_or(1)
    }
}

/// Storage access mode of a persistent volume claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AccessMode {
    #[default]
    ReadWriteOnce,
    ReadWriteMany,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::ReadWriteOnce => "ReadWriteOnce",
            AccessMode::ReadWriteMany => "ReadWriteMany",
        }
    }
}

/// One persistent volume requested by the workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeRequest {
    pub size: Quantity,
    /// Absolute path inside the database container.
    pub mount_path: String,
    #[serde(default)]
    pub access_mode: AccessMode,
}

/// Soft node-affinity preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffinityPreference {
    #[serde(rename = "label")]
    pub label_key: String,
    #[serde(rename = "value")]
    pub label_value: String,
    /// In the range 1..=100.
    pub weight: i32,
}

// ── Status ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeploymentState {
    #[default]
    Pending,
    Created,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ServiceState {
    #[default]
    Pending,
    Created,
    Updated,
    Failed,
}

/// Observed state of a workload, written on every reconcile pass.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadStatus {
    #[serde(default)]
    pub deployment_name: String,
    #[serde(default)]
    pub deployment_state: DeploymentState,
    /// `<service>.<namespace>.<cluster domain>:<port>` once the service is bound.
    #[serde(default)]
    pub service_endpoint: String,
    #[serde(default)]
    pub service_state: ServiceState,
}
