//! Periodic reconcile loop.
//!
//! Every tick sweeps all admitted workloads. Passes run on the blocking pool,
//! at most `max_concurrent` at a time, and a sweep finishes before the next
//! one starts, so two passes for the same workload never overlap.
//!
//! Failures that will not go away by retrying (a rejected spec, a foreign
//! object in the way) park the workload until its generation changes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use ustore_controller::{CancelSignal, ClaimRegistry, Pass, ReconcileError, Reconciler};
use ustore_core::{OperatorConfig, WorkloadId};
use ustore_state::StateStore;

type StoreReconciler = Reconciler<StateStore, StateStore>;

/// Counts from one sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub converged: usize,
    pub deleted: usize,
    pub failed: usize,
    pub parked: usize,
    pub skipped: usize,
    pub cancelled: usize,
}

pub struct Sweeper {
    reconciler: Arc<StoreReconciler>,
    limit: Arc<Semaphore>,
    /// Workload → generation whose last pass failed without requeue.
    parked: HashMap<WorkloadId, u64>,
}

impl Sweeper {
    pub fn new(reconciler: StoreReconciler, max_concurrent: usize) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            limit: Arc::new(Semaphore::new(max_concurrent.max(1))),
            parked: HashMap::new(),
        }
    }

    /// Reconcile every admitted workload once.
    pub async fn sweep(&mut self, cancel: &CancelSignal) -> anyhow::Result<SweepReport> {
        let mut report = SweepReport::default();
        let workloads = self.reconciler.specs().list_workloads()?;

        let mut generations = HashMap::new();
        let mut tasks = JoinSet::new();
        for workload in workloads {
            let id = workload.id();
            let generation = workload.metadata.generation;
            generations.insert(id.clone(), generation);
            if self.parked.get(&id) == Some(&generation) {
                debug!(workload = %id, generation, "parked, skipping");
                report.skipped += 1;
                continue;
            }

            let permit = self.limit.clone().acquire_owned().await?;
            let reconciler = self.reconciler.clone();
            let cancel = cancel.clone();
            tasks.spawn_blocking(move || {
                let _permit = permit;
                let result = reconciler.reconcile(&id, &cancel);
                (id, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (id, result) = joined?;
            match result {
                Ok(Pass::Converged { .. }) => {
                    self.parked.remove(&id);
                    report.converged += 1;
                }
                Ok(Pass::Deleted) => {
                    self.parked.remove(&id);
                    report.deleted += 1;
                }
                Err(ReconcileError::Cancelled { .. }) => report.cancelled += 1,
                Err(e) if e.requeue() => {
                    self.parked.remove(&id);
                    report.failed += 1;
                }
                Err(e) => {
                    warn!(workload = %id, error = %e, "parking until the spec changes");
                    if let Some(generation) = generations.get(&id) {
                        self.parked.insert(id, *generation);
                    }
                    report.parked += 1;
                }
            }
        }

        // Forget parked entries of workloads that no longer exist.
        self.parked.retain(|id, _| generations.contains_key(id));
        Ok(report)
    }
}

/// Run the reconcile loop until `shutdown` flips to true.
///
/// The same signal cancels passes still in flight, so shutdown waits for at
/// most one store call per running pass.
pub async fn run_loop(
    mut sweeper: Sweeper,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(interval_secs = interval.as_secs(), "reconcile loop started");
    let cancel = CancelSignal::new(shutdown.clone());
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match sweeper.sweep(&cancel).await {
                    Ok(report) => info!(?report, "sweep finished"),
                    Err(e) => error!(error = %e, "sweep failed"),
                }
            }
            _ = shutdown.changed() => {
                info!("reconcile loop shutting down");
                break;
            }
        }
    }
}

/// Daemon entry point for `ustored run`.
pub async fn run(store: StateStore, config: OperatorConfig) -> anyhow::Result<()> {
    info!(
        cluster_domain = %config.cluster_domain,
        max_concurrent = config.reconcile.max_concurrent,
        "UStore operator starting"
    );
    let reconciler = Reconciler::new(
        store.clone(),
        store,
        ClaimRegistry::new(),
        config.cluster_domain.clone(),
    );
    let sweeper = Sweeper::new(reconciler, config.reconcile.max_concurrent);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let interval = Duration::from_secs(config.reconcile.interval_secs.max(1));
    let handle = tokio::spawn(run_loop(sweeper, interval, shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    handle.await?;

    info!("UStore operator stopped");
    Ok(())
}
