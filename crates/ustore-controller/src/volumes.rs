//! Volume planning: one storage claim per declared volume.
//!
//! Claim names are a pure function of `(workload identity, mount path)`, so
//! planning the same spec twice, or after a restart, yields the same names
//! without reading any prior state. Planned claims are recorded in a
//! [`ClaimRegistry`] keyed by workload, where the desired-state builder picks
//! them up when it lays out the deployment's volume mounts.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use sha2::{Digest, Sha256};
use tracing::debug;
use ustore_core::{AccessMode, Quantity, VolumeRequest, WorkloadId};

/// Claim names double as pod volume names, which must be DNS labels.
pub const MAX_CLAIM_NAME_LEN: usize = 63;

/// Hex characters of the path digest appended to every claim name.
const HASH_LEN: usize = 8;

/// A planned persistent volume claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimDesc {
    pub name: String,
    pub size: Quantity,
    pub access_mode: AccessMode,
    pub mount_path: String,
}

/// Derive the stable claim name for one volume of one workload.
///
/// Format: `<workload>-<path slug>-<8 hex of sha256(namespace/name:path)>`.
/// The digest keeps names distinct when two paths slug identically
/// (`/data-1` and `/data/1`).
pub fn derive_claim_name(id: &WorkloadId, mount_path: &str) -> String {
    let digest = Sha256::digest(format!("{}/{}:{}", id.namespace, id.name, mount_path));
    let hash = &hex::encode(digest)[..HASH_LEN];

    let prefix: String = id
        .name
        .chars()
        .take(MAX_CLAIM_NAME_LEN - HASH_LEN - 1)
        .collect();
    let room = MAX_CLAIM_NAME_LEN.saturating_sub(prefix.len() + HASH_LEN + 2);
    let slug = slugify(mount_path, room);

    if slug.is_empty() {
        format!("{prefix}-{hash}")
    } else {
        format!("{prefix}-{slug}-{hash}")
    }
}

/// Lower-case `path`, collapse every run of non-alphanumerics into one dash,
/// and cut the result to at most `max` characters without edge dashes.
fn slugify(path: &str, max: usize) -> String {
    let mut slug = String::with_capacity(path.len());
    for ch in path.chars() {
        let ch = ch.to_ascii_lowercase();
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            slug.push(ch);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    // Only ASCII was pushed, so byte truncation is safe.
    slug.truncate(max);
    slug.trim_end_matches('-').to_string()
}

/// Plan one claim per volume and record the plan for `id` in `registry`.
pub fn plan_volumes(
    id: &WorkloadId,
    volumes: &[VolumeRequest],
    registry: &ClaimRegistry,
) -> Vec<ClaimDesc> {
    let claims: Vec<ClaimDesc> = volumes
        .iter()
        .map(|volume| ClaimDesc {
            name: derive_claim_name(id, &volume.mount_path),
            size: volume.size.clone(),
            access_mode: volume.access_mode,
            mount_path: volume.mount_path.clone(),
        })
        .collect();
    registry.register(id, claims.clone());
    debug!(workload = %id, claims = claims.len(), "volumes planned");
    claims
}

/// Process-wide record of planned claims, scoped per workload.
///
/// Each workload's entry is replaced wholesale on every planning pass, so a
/// volume dropped from the spec stops being mounted, and claims planned for
/// one workload are never visible through another workload's identity.
#[derive(Debug, Clone, Default)]
pub struct ClaimRegistry {
    inner: Arc<RwLock<HashMap<WorkloadId, Vec<ClaimDesc>>>>,
}

impl ClaimRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the planned claims of `id`.
    pub fn register(&self, id: &WorkloadId, claims: Vec<ClaimDesc>) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.insert(id.clone(), claims);
    }

    /// Planned claims of `id`, in declaration order.
    pub fn claims_for(&self, id: &WorkloadId) -> Vec<ClaimDesc> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.get(id).cloned().unwrap_or_default()
    }

    /// Claim name planned for `mount_path` of `id`.
    pub fn claim_name(&self, id: &WorkloadId, mount_path: &str) -> Option<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .get(id)?
            .iter()
            .find(|claim| claim.mount_path == mount_path)
            .map(|claim| claim.name.clone())
    }

    /// Drop everything planned for `id`. Returns true if an entry existed.
    pub fn forget(&self, id: &WorkloadId) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.remove(id).is_some()
    }

    /// Number of workloads with a planned entry.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
