//! Workload records as persisted by the store.

use serde::{Deserialize, Serialize};
use ustore_core::{
    EngineType, WorkloadId, WorkloadSpec, WorkloadStatus, WORKLOAD_API_VERSION, WORKLOAD_KIND,
};

use crate::objects::OwnerReference;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadMeta {
    pub namespace: String,
    pub name: String,
    pub uid: String,
    /// Incremented on every accepted spec change.
    pub generation: u64,
}

/// One `UStore` resource: specification plus the status the reconciler writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workload {
    pub metadata: WorkloadMeta,
    pub spec: WorkloadSpec,
    /// Engine type pinned the first time the workload was admitted with one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admitted_engine: Option<EngineType>,
    #[serde(default)]
    pub status: WorkloadStatus,
}

impl Workload {
    pub fn id(&self) -> WorkloadId {
        WorkloadId::new(self.metadata.namespace.clone(), self.metadata.name.clone())
    }

    /// Owner reference dependents carry so they are deleted with this workload.
    pub fn owner_reference(&self) -> OwnerReference {
        OwnerReference {
            api_version: WORKLOAD_API_VERSION.to_string(),
            kind: WORKLOAD_KIND.to_string(),
            name: self.metadata.name.clone(),
            uid: self.metadata.uid.clone(),
            controller: true,
            block_owner_deletion: true,
        }
    }
}

/// Composite key `{namespace}/{name}` for the workloads table.
pub fn workload_key(id: &WorkloadId) -> String {
    format!("{}/{}", id.namespace, id.name)
}
