//! ustore-controller: the UStore reconciliation engine.
//!
//! Converges the dependents of one `UStore` workload (a deployment, a
//! cluster-internal service, and one persistent volume claim per declared
//! volume) toward its specification, then projects the result into the
//! workload's status.
//!
//! # Architecture
//!
//! ```text
//! Reconciler::reconcile(namespace/name)
//!   ├── SpecSource (load workload, engine immutability guard)
//!   ├── volumes   (plan claims, workload-scoped ClaimRegistry)
//!   ├── converge  (claims: create-if-absent)
//!   ├── desired   (spec + planned claims → deployment, service)
//!   ├── converge  (deployment: merge + diff patch, service: port patch)
//!   └── status    (outcomes → WorkloadStatus, written to the ClusterStore)
//! ```
//!
//! The engine holds no retry state; every failure is returned to the caller
//! with the kind, key, and reason needed to decide on requeue.

pub mod cancel;
pub mod converge;
pub mod desired;
pub mod error;
pub mod merge;
pub mod reconciler;
pub mod status;
pub mod volumes;

pub use cancel::CancelSignal;
pub use converge::Outcome;
pub use desired::DesiredState;
pub use error::{ReconcileError, ReconcileResult};
pub use reconciler::{Pass, Reconciler};
pub use status::Progress;
pub use volumes::{ClaimDesc, ClaimRegistry};
