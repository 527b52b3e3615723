//! Dependent object model: deployments, services, and persistent volume claims.
//!
//! The shapes mirror the subset of the Kubernetes `apps/v1` and `core/v1`
//! objects the operator manages. Optional and empty fields are skipped on
//! serialization so the JSON form of an object only carries what was set,
//! which keeps merge patches computed over it minimal.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use ustore_core::{AccessMode, Quantity};

/// Kinds of dependent objects the store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Deployment,
    Service,
    PersistentVolumeClaim,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Deployment => "Deployment",
            Kind::Service => "Service",
            Kind::PersistentVolumeClaim => "PersistentVolumeClaim",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Namespaced name of a dependent object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

// ── Metadata ───────────────────────────────────────────────────────

/// Link from a dependent object to the workload that controls it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
    #[serde(default)]
    pub controller: bool,
    #[serde(default)]
    pub block_owner_deletion: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
    /// Assigned by the store on creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Bumped by the store on every write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<u64>,
}

impl ObjectMeta {
    pub fn new(key: &ObjectKey, labels: BTreeMap<String, String>) -> Self {
        Self {
            name: key.name.clone(),
            namespace: key.namespace.clone(),
            labels,
            ..Self::default()
        }
    }

    /// The controlling owner, if any.
    pub fn controller(&self) -> Option<&OwnerReference> {
        self.owner_references.iter().find(|owner| owner.controller)
    }

    /// Whether `uid` is the controlling owner of this object.
    pub fn is_controlled_by(&self, uid: &str) -> bool {
        self.controller().is_some_and(|owner| owner.uid == uid)
    }

    /// Install `owner` as the controlling owner, replacing any previous
    /// controller reference.
    pub fn set_controller(&mut self, owner: &OwnerReference) {
        self.owner_references.retain(|existing| !existing.controller);
        let mut owner = owner.clone();
        owner.controller = true;
        owner.block_owner_deletion = true;
        self.owner_references.push(owner);
    }
}

// ── Deployment ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub metadata: ObjectMeta,
    pub spec: DeploymentSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeploymentSpec {
    pub replicas: i32,
    pub selector: LabelSelector,
    pub template: PodTemplateSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PodTemplateSpec {
    pub metadata: PodMeta,
    pub spec: PodSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PodMeta {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    pub containers: Vec<Container>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<Affinity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_pull_secrets: Vec<LocalObjectReference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub name: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,
    #[serde(default)]
    pub resources: ResourceRequirements,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
}

/// Compute resources keyed by resource name (`cpu`, `memory`, `storage`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceRequirements {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<String, Quantity>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<String, Quantity>,
}

/// A pod volume. Exactly one source is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map: Option<LocalObjectReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_volume_claim: Option<ClaimVolumeSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimVolumeSource {
    pub claim_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalObjectReference {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Affinity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_affinity: Option<NodeAffinity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAffinity {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferred_during_scheduling_ignored_during_execution: Vec<PreferredSchedulingTerm>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferredSchedulingTerm {
    pub weight: i32,
    pub preference: NodeSelectorTerm,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSelectorTerm {
    pub match_expressions: Vec<NodeSelectorRequirement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSelectorRequirement {
    pub key: String,
    /// Always `In` for preferences built by the operator.
    pub operator: String,
    pub values: Vec<String>,
}

// ── Service ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub metadata: ObjectMeta,
    pub spec: ServiceSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    pub ports: Vec<ServicePort>,
    #[serde(default)]
    pub selector: BTreeMap<String, String>,
    #[serde(rename = "type")]
    pub service_type: String,
    /// Assigned by the cluster; the operator never sets or patches it.
    #[serde(rename = "clusterIP", default, skip_serializing_if = "Option::is_none")]
    pub cluster_ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    pub name: String,
    pub protocol: String,
    pub port: i32,
    pub target_port: i32,
}

impl Service {
    /// The first declared port, which carries the database traffic.
    pub fn primary_port(&self) -> Option<&ServicePort> {
        self.spec.ports.first()
    }
}

// ── PersistentVolumeClaim ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentVolumeClaim {
    pub metadata: ObjectMeta,
    pub spec: ClaimSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSpec {
    pub access_modes: Vec<AccessMode>,
    pub volume_mode: String,
    pub resources: ResourceRequirements,
}

impl PersistentVolumeClaim {
    pub fn requested_storage(&self) -> Option<&Quantity> {
        self.spec.resources.requests.get("storage")
    }
}

// ── Object ─────────────────────────────────────────────────────────

/// Any dependent object, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Object {
    Deployment(Deployment),
    Service(Service),
    PersistentVolumeClaim(PersistentVolumeClaim),
}

impl Object {
    pub fn kind(&self) -> Kind {
        match self {
            Object::Deployment(_) => Kind::Deployment,
            Object::Service(_) => Kind::Service,
            Object::PersistentVolumeClaim(_) => Kind::PersistentVolumeClaim,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Object::Deployment(d) => &d.metadata,
            Object::Service(s) => &s.metadata,
            Object::PersistentVolumeClaim(c) => &c.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            Object::Deployment(d) => &mut d.metadata,
            Object::Service(s) => &mut s.metadata,
            Object::PersistentVolumeClaim(c) => &mut c.metadata,
        }
    }

    pub fn key(&self) -> ObjectKey {
        let meta = self.metadata();
        ObjectKey::new(meta.namespace.clone(), meta.name.clone())
    }

    /// Attach the cascade-delete link to `owner`.
    pub fn set_owner(&mut self, owner: &OwnerReference) {
        self.metadata_mut().set_controller(owner);
    }

    pub fn into_service(self) -> Option<Service> {
        match self {
            Object::Service(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_claim(self) -> Option<PersistentVolumeClaim> {
        match self {
            Object::PersistentVolumeClaim(c) => Some(c),
            _ => None,
        }
    }
}

impl From<Deployment> for Object {
    fn from(value: Deployment) -> Self {
        Object::Deployment(value)
    }
}

impl From<Service> for Object {
    fn from(value: Service) -> Self {
        Object::Service(value)
    }
}

impl From<PersistentVolumeClaim> for Object {
    fn from(value: PersistentVolumeClaim) -> Self {
        Object::PersistentVolumeClaim(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(uid: &str) -> OwnerReference {
        OwnerReference {
            api_version: "unum.cloud/v1alpha1".to_string(),
            kind: "UStore".to_string(),
            name: "kv".to_string(),
            uid: uid.to_string(),
            controller: false,
            block_owner_deletion: false,
        }
    }

    fn service() -> Service {
        Service {
            metadata: ObjectMeta::new(&ObjectKey::new("default", "kv"), BTreeMap::new()),
            spec: ServiceSpec {
                ports: vec![ServicePort {
                    name: "db".to_string(),
                    protocol: "TCP".to_string(),
                    port: 9090,
                    target_port: 9090,
                }],
                selector: BTreeMap::new(),
                service_type: "ClusterIP".to_string(),
                cluster_ip: None,
            },
        }
    }

    #[test]
    fn set_owner_marks_controller() {
        let mut object = Object::from(service());
        object.set_owner(&owner("uid-1"));

        let meta = object.metadata();
        assert!(meta.is_controlled_by("uid-1"));
        assert!(!meta.is_controlled_by("uid-2"));
        assert!(meta.owner_references[0].block_owner_deletion);
    }

    #[test]
    fn set_owner_replaces_previous_controller() {
        let mut object = Object::from(service());
        object.set_owner(&owner("uid-1"));
        object.set_owner(&owner("uid-2"));

        assert_eq!(object.metadata().owner_references.len(), 1);
        assert!(object.metadata().is_controlled_by("uid-2"));
    }

    #[test]
    fn object_json_is_kind_tagged() {
        let value = serde_json::to_value(Object::from(service())).unwrap();
        assert_eq!(value["kind"], "Service");
        assert_eq!(value["spec"]["ports"][0]["targetPort"], 9090);
        assert_eq!(value["spec"]["type"], "ClusterIP");
        // Unset cluster-assigned fields are omitted entirely.
        assert!(value["spec"].get("clusterIP").is_none());
        assert!(value["metadata"].get("uid").is_none());

        let back: Object = serde_json::from_value(value).unwrap();
        assert_eq!(back.kind(), Kind::Service);
    }
}
