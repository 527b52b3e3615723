//! Interfaces the reconciler consumes from the cluster platform.

use serde_json::Value;
use ustore_core::{WorkloadId, WorkloadStatus};

use crate::error::StateResult;
use crate::objects::{Kind, Object, ObjectKey, OwnerReference};
use crate::types::Workload;

/// Read/write access to dependent objects and workload status.
///
/// Every call is independently atomic. Implementations may block and may fail
/// transiently; callers decide on retry.
pub trait ClusterStore: Send + Sync {
    /// Fetch one object, `None` if it does not exist.
    fn get(&self, kind: Kind, key: &ObjectKey) -> StateResult<Option<Object>>;

    /// Create `object` verbatim. Fails if an object with the same key exists.
    fn create(&self, object: &Object) -> StateResult<Object>;

    /// Apply a JSON merge patch to an existing object.
    fn patch(&self, kind: Kind, key: &ObjectKey, diff: &Value) -> StateResult<Object>;

    /// Overwrite the status of a workload.
    fn write_status(&self, id: &WorkloadId, status: &WorkloadStatus) -> StateResult<()>;

    /// Link `child` to its owner so the store deletes it with the owner.
    fn set_owner(&self, child: &mut Object, owner: &OwnerReference) {
        child.set_owner(owner);
    }
}

/// Source of workload specifications.
pub trait SpecSource: Send + Sync {
    /// Fetch the current workload record, `None` if it was deleted.
    fn get_spec(&self, id: &WorkloadId) -> StateResult<Option<Workload>>;
}
