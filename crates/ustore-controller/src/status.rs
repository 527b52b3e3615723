//! Status projection: convergence outcomes → `WorkloadStatus`.

use ustore_core::{DeploymentState, ServiceState, WorkloadId, WorkloadStatus};

use crate::converge::Outcome;

/// Outcomes recorded so far in one pass. `None` means the step was not reached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progress {
    /// `(claim name, outcome)` in declaration order.
    pub claims: Vec<(String, Outcome)>,
    pub deployment: Option<Outcome>,
    pub service: Option<Outcome>,
}

impl Progress {
    pub fn claims_failed(&self) -> bool {
        self.claims.iter().any(|(_, outcome)| outcome.is_failed())
    }

    /// Every step ran and none failed.
    pub fn is_complete(&self) -> bool {
        !self.claims_failed()
            && self.deployment.as_ref().is_some_and(Outcome::is_bound)
            && self.service.as_ref().is_some_and(Outcome::is_bound)
    }
}

/// In-cluster DNS address of the workload's service.
pub fn endpoint(id: &WorkloadId, cluster_domain: &str, port: i32) -> String {
    format!("{}.{}.{}:{}", id.name, id.namespace, cluster_domain, port)
}

/// Project `progress` into the status record. Never fails.
///
/// The deployment and service share the workload's name.
pub fn project(
    id: &WorkloadId,
    progress: &Progress,
    cluster_domain: &str,
    port: i32,
) -> WorkloadStatus {
    let (deployment_name, deployment_state) = match &progress.deployment {
        Some(Outcome::Failed(_)) => (String::new(), DeploymentState::Failed),
        Some(_) => (id.name.clone(), DeploymentState::Created),
        None => (String::new(), DeploymentState::Pending),
    };

    let service_state = match &progress.service {
        Some(Outcome::Created | Outcome::Unchanged) => ServiceState::Created,
        Some(Outcome::Patched) => ServiceState::Updated,
        Some(Outcome::Failed(_)) => ServiceState::Failed,
        None => ServiceState::Pending,
    };
    let service_endpoint = match &progress.service {
        Some(outcome) if outcome.is_bound() => endpoint(id, cluster_domain, port),
        _ => String::new(),
    };

    WorkloadStatus {
        deployment_name,
        deployment_state,
        service_endpoint,
        service_state,
    }
}
