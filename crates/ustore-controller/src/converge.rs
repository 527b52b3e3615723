//! Convergence engine: fetch-or-create, then diff-and-patch, per dependent.
//!
//! Each call converges exactly one object and issues at most one `get` and one
//! write against the [`ClusterStore`]. Objects this workload does not control
//! are never written.

use serde_json::json;
use tracing::{debug, info, warn};
use ustore_core::WorkloadId;
use ustore_state::{
    ClusterStore, Deployment, Kind, Object, ObjectKey, OwnerReference, PersistentVolumeClaim,
    Service,
};

use crate::cancel::CancelSignal;
use crate::error::{ReconcileError, ReconcileResult};
use crate::merge;

/// What converging one object did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Patched,
    Unchanged,
    Failed(String),
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    /// The object exists in the shape this pass asked for.
    pub fn is_bound(&self) -> bool {
        !self.is_failed()
    }
}

/// Converges the dependents of one workload.
pub struct Convergence<'a, S: ?Sized> {
    store: &'a S,
    owner: &'a OwnerReference,
    workload: &'a WorkloadId,
    cancel: &'a CancelSignal,
}

impl<'a, S: ClusterStore + ?Sized> Convergence<'a, S> {
    pub fn new(
        store: &'a S,
        owner: &'a OwnerReference,
        workload: &'a WorkloadId,
        cancel: &'a CancelSignal,
    ) -> Self {
        Self {
            store,
            owner,
            workload,
            cancel,
        }
    }

    /// Converge `desired` against whatever the store holds under its key.
    ///
    /// `Err` is reserved for conditions the pass cannot record as an outcome:
    /// a failed read, a foreign-owned object, or cancellation.
    pub fn converge(&self, mut desired: Object) -> ReconcileResult<Outcome> {
        self.store.set_owner(&mut desired, self.owner);
        let kind = desired.kind();
        let key = desired.key();

        self.checkpoint()?;
        let observed = self
            .store
            .get(kind, &key)
            .map_err(|source| ReconcileError::store(kind, &key, source))?;

        let Some(observed) = observed else {
            return self.create(&desired);
        };

        if !observed.metadata().is_controlled_by(&self.owner.uid) {
            let holder = observed
                .metadata()
                .controller()
                .map(|owner| format!("controlled by {} {}", owner.kind, owner.name))
                .unwrap_or_else(|| "no controller".to_string());
            warn!(
                kind = %kind,
                key = %key,
                workload = %self.workload,
                %holder,
                "refusing to adopt object"
            );
            return Err(ReconcileError::ConflictingState {
                kind: kind.to_string(),
                key: key.to_string(),
                reason: holder,
            });
        }

        match (observed, desired) {
            (Object::Deployment(observed), Object::Deployment(desired)) => {
                self.deployment(&key, &observed, &desired)
            }
            (Object::Service(observed), Object::Service(desired)) => {
                self.service(&key, &observed, &desired)
            }
            (Object::PersistentVolumeClaim(observed), Object::PersistentVolumeClaim(desired)) => {
                Ok(self.claim(&key, &observed, &desired))
            }
            (observed, _) => Ok(Outcome::Failed(format!(
                "store returned {} for {kind} {key}",
                observed.kind()
            ))),
        }
    }

    fn create(&self, desired: &Object) -> ReconcileResult<Outcome> {
        let kind = desired.kind();
        let key = desired.key();

        self.checkpoint()?;
        match self.store.create(desired) {
            Ok(_) => {
                info!(kind = %kind, key = %key, workload = %self.workload, "created");
                Ok(Outcome::Created)
            }
            Err(e) => {
                warn!(kind = %kind, key = %key, error = %e, "create failed");
                Ok(Outcome::Failed(format!("creation error: {e}")))
            }
        }
    }

    fn deployment(
        &self,
        key: &ObjectKey,
        observed: &Deployment,
        desired: &Deployment,
    ) -> ReconcileResult<Outcome> {
        let merged = match merge::merge_typed(observed, desired) {
            Ok(merged) => merged,
            Err(e) => return Ok(Outcome::Failed(format!("merge error: {e}"))),
        };
        match merged.patch {
            Some(patch) => self.patch(Kind::Deployment, key, &patch),
            None => {
                debug!(kind = %Kind::Deployment, key = %key, "unchanged");
                Ok(Outcome::Unchanged)
            }
        }
    }

    /// Only the first port is managed. The patch carries the whole port list so
    /// any extra ports survive, and never touches the cluster IP.
    fn service(
        &self,
        key: &ObjectKey,
        observed: &Service,
        desired: &Service,
    ) -> ReconcileResult<Outcome> {
        let Some(want) = desired.primary_port() else {
            return Ok(Outcome::Unchanged);
        };
        let current = observed.primary_port();
        if current.is_some_and(|p| p.port == want.port && p.target_port == want.target_port) {
            debug!(kind = %Kind::Service, key = %key, "unchanged");
            return Ok(Outcome::Unchanged);
        }

        let mut ports = observed.spec.ports.clone();
        match ports.first_mut() {
            Some(first) => {
                first.port = want.port;
                first.target_port = want.target_port;
            }
            None => ports.push(want.clone()),
        }
        let ports = match serde_json::to_value(&ports) {
            Ok(ports) => ports,
            Err(e) => return Ok(Outcome::Failed(format!("encode error: {e}"))),
        };
        self.patch(Kind::Service, key, &json!({ "spec": { "ports": ports } }))
    }

    /// Claims are create-only; storage resize is not managed.
    fn claim(
        &self,
        key: &ObjectKey,
        observed: &PersistentVolumeClaim,
        desired: &PersistentVolumeClaim,
    ) -> Outcome {
        let size_drift = observed.requested_storage() != desired.requested_storage();
        let mode_drift = observed.spec.access_modes != desired.spec.access_modes;
        if size_drift || mode_drift {
            warn!(
                kind = %Kind::PersistentVolumeClaim,
                key = %key,
                observed_size = ?observed.requested_storage(),
                desired_size = ?desired.requested_storage(),
                observed_modes = ?observed.spec.access_modes,
                desired_modes = ?desired.spec.access_modes,
                "existing claim differs from spec; leaving it alone"
            );
        } else {
            debug!(kind = %Kind::PersistentVolumeClaim, key = %key, "unchanged");
        }
        Outcome::Unchanged
    }

    fn patch(
        &self,
        kind: Kind,
        key: &ObjectKey,
        patch: &serde_json::Value,
    ) -> ReconcileResult<Outcome> {
        self.checkpoint()?;
        match self.store.patch(kind, key, patch) {
            Ok(_) => {
                info!(kind = %kind, key = %key, workload = %self.workload, "patched");
                Ok(Outcome::Patched)
            }
            Err(e) => {
                warn!(kind = %kind, key = %key, error = %e, "patch failed");
                Ok(Outcome::Failed(format!("patch error: {e}")))
            }
        }
    }

    fn checkpoint(&self) -> ReconcileResult<()> {
        if self.cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled {
                key: self.workload.to_string(),
            });
        }
        Ok(())
    }
}
