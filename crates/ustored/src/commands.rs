//! One-shot subcommands over the state store.

use std::path::Path;

use anyhow::{Context, bail};
use tracing::info;
use ustore_controller::{CancelSignal, ClaimRegistry, Pass, Reconciler};
use ustore_core::{OperatorConfig, WorkloadId, WorkloadSpec, WorkloadStatus};
use ustore_state::{StateStore, Workload};

/// Parse a workload spec from TOML, or JSON when the file ends in `.json`.
pub fn load_spec(path: &Path) -> anyhow::Result<WorkloadSpec> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading spec {}", path.display()))?;
    let spec = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("parsing JSON spec {}", path.display()))?,
        _ => toml::from_str(&content)
            .with_context(|| format!("parsing TOML spec {}", path.display()))?,
    };
    Ok(spec)
}

pub fn apply(store: &StateStore, id: &WorkloadId, file: &Path) -> anyhow::Result<Workload> {
    let spec = load_spec(file)?;
    let workload = store
        .apply_workload(id, spec)
        .with_context(|| format!("admitting {id}"))?;
    info!(workload = %id, generation = workload.metadata.generation, "workload applied");
    Ok(workload)
}

/// Run a single pass. Claim names are derived, so a fresh registry plans the
/// same claims a long-running daemon would.
pub fn reconcile(
    store: &StateStore,
    config: &OperatorConfig,
    id: &WorkloadId,
) -> anyhow::Result<Pass> {
    let reconciler = Reconciler::new(
        store.clone(),
        store.clone(),
        ClaimRegistry::new(),
        config.cluster_domain.clone(),
    );
    let pass = reconciler
        .reconcile(id, &CancelSignal::never())
        .with_context(|| format!("reconciling {id}"))?;
    Ok(pass)
}

pub fn status(store: &StateStore, id: &WorkloadId) -> anyhow::Result<WorkloadStatus> {
    match store.get_workload(id)? {
        Some(workload) => Ok(workload.status),
        None => bail!("workload {id} not found"),
    }
}

pub fn delete(store: &StateStore, id: &WorkloadId) -> anyhow::Result<u32> {
    match store.delete_workload(id)? {
        Some(removed) => Ok(removed),
        None => bail!("workload {id} not found"),
    }
}

/// One-line summary of a pass.
pub fn describe(id: &WorkloadId, pass: &Pass) -> String {
    match pass {
        Pass::Deleted => format!("{id}: workload not found, nothing to do"),
        Pass::Converged { progress, status } => {
            let claims = progress
                .claims
                .iter()
                .map(|(name, outcome)| format!("{name}={outcome:?}"))
                .collect::<Vec<_>>()
                .join(",");
            format!(
                "{id}: claims [{claims}] deployment {:?} service {:?} endpoint {}",
                status.deployment_state, status.service_state, status.service_endpoint
            )
        }
    }
}
