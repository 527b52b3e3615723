//! Reconciler: the single `reconcile(namespace/name)` entry point.
//!
//! One pass walks a fixed sequence of steps:
//!
//! ```text
//! Unreconciled → VolumesPlanned → DeploymentConverged → ServiceConverged → Reconciled
//! ```
//!
//! A failed step short-circuits the rest. Whatever was reached is still
//! projected into the workload status before the error is returned, so partial
//! progress stays visible. Nothing is rolled back and nothing is retried here.

use tracing::{debug, error, info, warn};
use ustore_core::{EngineType, WORKLOAD_KIND, WorkloadId, WorkloadStatus};
use ustore_state::admission::{check_engine_transition, check_unique_mount_paths};
use ustore_state::{ClusterStore, Kind, Object, ObjectKey, SpecSource, Workload};

use crate::cancel::CancelSignal;
use crate::converge::{Convergence, Outcome};
use crate::desired;
use crate::error::{ReconcileError, ReconcileResult};
use crate::status::{self, Progress};
use crate::volumes::{self, ClaimRegistry};

/// Result of a pass that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pass {
    /// The workload no longer exists. Its dependents are left to cascade
    /// deletion by owner reference.
    Deleted,
    /// Every dependent was converged and the status written.
    Converged {
        progress: Progress,
        status: WorkloadStatus,
    },
}

impl Pass {
    /// Successful passes are never requeued; the next change or tick triggers
    /// the next pass.
    pub fn requeue(&self) -> bool {
        false
    }
}

/// Drives reconcile passes against a cluster store and a spec source.
///
/// Holds no per-pass state. The only state shared between passes is the
/// [`ClaimRegistry`], which is keyed by workload, so passes for different
/// workloads may run concurrently.
pub struct Reconciler<S, P> {
    store: S,
    specs: P,
    registry: ClaimRegistry,
    cluster_domain: String,
}

impl<S: ClusterStore, P: SpecSource> Reconciler<S, P> {
    pub fn new(
        store: S,
        specs: P,
        registry: ClaimRegistry,
        cluster_domain: impl Into<String>,
    ) -> Self {
        Self {
            store,
            specs,
            registry,
            cluster_domain: cluster_domain.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn specs(&self) -> &P {
        &self.specs
    }

    pub fn registry(&self) -> &ClaimRegistry {
        &self.registry
    }

    pub fn cluster_domain(&self) -> &str {
        &self.cluster_domain
    }

    /// Run one pass for `id`.
    pub fn reconcile(&self, id: &WorkloadId, cancel: &CancelSignal) -> ReconcileResult<Pass> {
        checkpoint(id, cancel)?;
        let workload = self
            .specs
            .get_spec(id)
            .map_err(|source| ReconcileError::store(WORKLOAD_KIND, id, source))?;

        let Some(workload) = workload else {
            if self.registry.forget(id) {
                debug!(workload = %id, "dropped planned claims");
            }
            info!(workload = %id, "workload gone, nothing to reconcile");
            return Ok(Pass::Deleted);
        };

        let engine = admit(id, &workload)?;
        let owner = workload.owner_reference();
        let meta = &workload.metadata;
        let spec = &workload.spec;
        let converge = Convergence::new(&self.store, &owner, id, cancel);
        let mut progress = Progress::default();

        debug!(workload = %id, generation = meta.generation, engine = %engine, "reconciling");

        // Claims first so the deployment never mounts a claim that does not exist.
        let claims = volumes::plan_volumes(id, &spec.volumes, &self.registry);
        for claim in &claims {
            let object = Object::from(desired::build_claim(meta, claim));
            let key = object.key();
            let (outcome, failure) =
                settle(converge.converge(object), Kind::PersistentVolumeClaim, &key);
            progress.claims.push((claim.name.clone(), outcome));
            if let Some(err) = failure {
                return Err(self.abort(id, spec.service_port, &progress, cancel, err));
            }
        }

        let planned = self.registry.claims_for(id);
        let state = desired::build(meta, spec, engine, &planned);

        let object = Object::from(state.deployment);
        let key = object.key();
        let (outcome, failure) = settle(converge.converge(object), Kind::Deployment, &key);
        progress.deployment = Some(outcome);
        if let Some(err) = failure {
            return Err(self.abort(id, spec.service_port, &progress, cancel, err));
        }

        let object = Object::from(state.service);
        let key = object.key();
        let (outcome, failure) = settle(converge.converge(object), Kind::Service, &key);
        progress.service = Some(outcome);
        if let Some(err) = failure {
            return Err(self.abort(id, spec.service_port, &progress, cancel, err));
        }

        let status = status::project(id, &progress, &self.cluster_domain, spec.service_port);
        checkpoint(id, cancel)?;
        self.store
            .write_status(id, &status)
            .map_err(|source| ReconcileError::store(WORKLOAD_KIND, id, source))?;

        info!(
            workload = %id,
            claims = progress.claims.len(),
            deployment = ?progress.deployment,
            service = ?progress.service,
            "reconciled"
        );
        Ok(Pass::Converged { progress, status })
    }

    /// Record partial progress, then hand back `err`.
    ///
    /// A cancelled pass writes nothing.
    fn abort(
        &self,
        id: &WorkloadId,
        port: i32,
        progress: &Progress,
        cancel: &CancelSignal,
        err: ReconcileError,
    ) -> ReconcileError {
        if matches!(err, ReconcileError::Cancelled { .. }) || cancel.is_cancelled() {
            warn!(workload = %id, "reconcile cancelled");
            return err;
        }

        let status = status::project(id, progress, &self.cluster_domain, port);
        if let Err(write_err) = self.store.write_status(id, &status) {
            warn!(workload = %id, error = %write_err, "failed to record partial status");
        }
        error!(workload = %id, error = %err, requeue = err.requeue(), "reconcile failed");
        err
    }
}

/// Guards that must hold before any store call: engine set and unchanged since
/// admission, mount paths unique.
fn admit(id: &WorkloadId, workload: &Workload) -> ReconcileResult<EngineType> {
    let rejected = |reason: String| {
        warn!(workload = %id, %reason, "spec rejected");
        ReconcileError::ValidationRejected {
            key: id.to_string(),
            reason,
        }
    };

    check_engine_transition(workload.admitted_engine, workload.spec.engine)
        .map_err(|e| rejected(e.to_string()))?;
    check_unique_mount_paths(&workload.spec).map_err(|e| rejected(e.to_string()))?;
    workload
        .spec
        .engine
        .ok_or_else(|| rejected("engine type is required".to_string()))
}

/// Split a convergence result into the outcome to record and the error that
/// ends the pass, if any.
fn settle(
    result: ReconcileResult<Outcome>,
    kind: Kind,
    key: &ObjectKey,
) -> (Outcome, Option<ReconcileError>) {
    match result {
        Ok(Outcome::Failed(reason)) => {
            let err = ReconcileError::ConvergenceFailed {
                kind: kind.to_string(),
                key: key.to_string(),
                reason: reason.clone(),
            };
            (Outcome::Failed(reason), Some(err))
        }
        Ok(outcome) => (outcome, None),
        Err(err) => (Outcome::Failed(err.to_string()), Some(err)),
    }
}

fn checkpoint(id: &WorkloadId, cancel: &CancelSignal) -> ReconcileResult<()> {
    if cancel.is_cancelled() {
        return Err(ReconcileError::Cancelled { key: id.to_string() });
    }
    Ok(())
}
