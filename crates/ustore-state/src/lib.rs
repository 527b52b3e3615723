//! ustore-state: the cluster state store consumed by the UStore reconciler.
//!
//! Defines the dependent object model (deployments, services, persistent
//! volume claims), the [`ClusterStore`] and [`SpecSource`] traits the
//! reconciler is written against, and [`StateStore`], an embedded
//! implementation backed by [redb](https://docs.rs/redb).
//!
//! # Architecture
//!
//! All records are JSON-serialized into redb's `&[u8]` value columns.
//! Workloads are keyed `{namespace}/{name}`; dependent objects are keyed
//! `{kind}:{namespace}/{name}`. Writes go through one redb write transaction
//! each, so every store call is independently atomic.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across reconcile workers.

pub mod admission;
pub mod api;
pub mod error;
pub mod objects;
pub mod patch;
pub mod store;
pub mod tables;
pub mod types;

pub use admission::AdmissionError;
pub use api::{ClusterStore, SpecSource};
pub use error::{StateError, StateResult};
pub use objects::*;
pub use store::StateStore;
pub use types::*;
