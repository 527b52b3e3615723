//! StateStore: redb-backed reference implementation of the cluster platform.
//!
//! Holds workload records and their dependent objects, runs admission on
//! workload updates, assigns cluster-managed fields (uid, resource version,
//! service cluster IP) on creation, applies merge patches, and cascade-deletes
//! dependents when their owning workload is removed. The store supports both
//! on-disk and in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, WriteTransaction};
use serde_json::Value;
use tracing::{debug, info};
use ustore_core::{WorkloadId, WorkloadSpec, WorkloadStatus};

use crate::admission::{check_engine_transition, validate_spec};
use crate::api::{ClusterStore, SpecSource};
use crate::error::{StateError, StateResult};
use crate::objects::{Kind, Object, ObjectKey};
use crate::patch::apply_merge_patch;
use crate::tables::*;
use crate::types::{workload_key, Workload, WorkloadMeta};

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

/// Composite key `{kind}:{namespace}/{name}` for the objects table.
fn object_key(kind: Kind, key: &ObjectKey) -> String {
    format!("{}:{}/{}", kind.as_str(), key.namespace, key.name)
}

/// Deterministic service address derived from the uid sequence.
fn cluster_ip(seq: u64) -> String {
    format!("10.96.{}.{}", (seq >> 8) & 0xff, seq & 0xff)
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(WORKLOADS).map_err(map_err!(Table))?;
        txn.open_table(OBJECTS).map_err(map_err!(Table))?;
        txn.open_table(META).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Issue the next uid sequence number inside `txn`.
    fn next_sequence(txn: &WriteTransaction) -> StateResult<u64> {
        let mut table = txn.open_table(META).map_err(map_err!(Table))?;
        let current = table
            .get(UID_SEQUENCE)
            .map_err(map_err!(Read))?
            .map(|guard| guard.value())
            .unwrap_or(0);
        let next = current + 1;
        table.insert(UID_SEQUENCE, next).map_err(map_err!(Write))?;
        Ok(next)
    }

    // ── Workloads ──────────────────────────────────────────────────

    /// Admit a new or updated workload spec.
    ///
    /// Runs field validation and the set-once engine rule before anything is
    /// written. An unchanged spec is a no-op; a changed one bumps the
    /// generation. Status is preserved across updates.
    pub fn apply_workload(&self, id: &WorkloadId, spec: WorkloadSpec) -> StateResult<Workload> {
        validate_spec(&spec)?;
        let key = workload_key(id);
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let workload = {
            let existing = {
                let table = txn.open_table(WORKLOADS).map_err(map_err!(Table))?;
                let bytes = table
                    .get(key.as_str())
                    .map_err(map_err!(Read))?
                    .map(|guard| guard.value().to_vec());
                match bytes {
                    Some(bytes) => Some(
                        serde_json::from_slice::<Workload>(&bytes)
                            .map_err(map_err!(Deserialize))?,
                    ),
                    None => None,
                }
            };

            let workload = match existing {
                Some(existing) => {
                    check_engine_transition(existing.admitted_engine, spec.engine)?;
                    if existing.spec == spec {
                        return Ok(existing);
                    }
                    Workload {
                        metadata: WorkloadMeta {
                            generation: existing.metadata.generation + 1,
                            ..existing.metadata
                        },
                        admitted_engine: existing.admitted_engine.or(spec.engine),
                        spec,
                        status: existing.status,
                    }
                }
                None => {
                    let seq = Self::next_sequence(&txn)?;
                    Workload {
                        metadata: WorkloadMeta {
                            namespace: id.namespace.clone(),
                            name: id.name.clone(),
                            uid: format!("uid-{seq:012}"),
                            generation: 1,
                        },
                        admitted_engine: spec.engine,
                        spec,
                        status: WorkloadStatus::default(),
                    }
                }
            };

            let value = serde_json::to_vec(&workload).map_err(map_err!(Serialize))?;
            let mut table = txn.open_table(WORKLOADS).map_err(map_err!(Table))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
            workload
        };
        txn.commit().map_err(map_err!(Transaction))?;
        info!(%key, generation = workload.metadata.generation, "workload admitted");
        Ok(workload)
    }

    /// Get a workload by identity.
    pub fn get_workload(&self, id: &WorkloadId) -> StateResult<Option<Workload>> {
        let key = workload_key(id);
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(WORKLOADS).map_err(map_err!(Table))?;
        match table.get(key.as_str()).map_err(map_err!(Read))? {
            Some(guard) => {
                let workload: Workload =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(workload))
            }
            None => Ok(None),
        }
    }

    /// List all workloads.
    pub fn list_workloads(&self) -> StateResult<Vec<Workload>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(WORKLOADS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let workload: Workload =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(workload);
        }
        Ok(results)
    }

    /// Delete a workload and, in the same transaction, every object it
    /// controls. Returns the number of dependents removed, or `None` if the
    /// workload did not exist.
    pub fn delete_workload(&self, id: &WorkloadId) -> StateResult<Option<u32>> {
        let key = workload_key(id);
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let removed = {
            let mut workloads = txn.open_table(WORKLOADS).map_err(map_err!(Table))?;
            let bytes = workloads
                .remove(key.as_str())
                .map_err(map_err!(Write))?
                .map(|guard| guard.value().to_vec());
            let Some(bytes) = bytes else {
                return Ok(None);
            };
            let workload: Workload =
                serde_json::from_slice(&bytes).map_err(map_err!(Deserialize))?;

            let mut objects = txn.open_table(OBJECTS).map_err(map_err!(Table))?;
            let mut owned = Vec::new();
            for entry in objects.iter().map_err(map_err!(Read))? {
                let (object_key, value) = entry.map_err(map_err!(Read))?;
                let object: Object =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                if object.metadata().is_controlled_by(&workload.metadata.uid) {
                    owned.push(object_key.value().to_string());
                }
            }
            for object_key in &owned {
                objects
                    .remove(object_key.as_str())
                    .map_err(map_err!(Write))?;
            }
            owned.len() as u32
        };
        txn.commit().map_err(map_err!(Transaction))?;
        info!(%key, dependents = removed, "workload deleted");
        Ok(Some(removed))
    }

    /// Overwrite the status of an existing workload.
    pub fn put_status(&self, id: &WorkloadId, status: &WorkloadStatus) -> StateResult<()> {
        let key = workload_key(id);
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(WORKLOADS).map_err(map_err!(Table))?;
            let bytes = table
                .get(key.as_str())
                .map_err(map_err!(Read))?
                .map(|guard| guard.value().to_vec())
                .ok_or_else(|| StateError::NotFound(key.clone()))?;
            let mut workload: Workload =
                serde_json::from_slice(&bytes).map_err(map_err!(Deserialize))?;
            workload.status = status.clone();
            let value = serde_json::to_vec(&workload).map_err(map_err!(Serialize))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, "workload status written");
        Ok(())
    }

    // ── Dependent objects ──────────────────────────────────────────

    /// Get an object by kind and namespaced name.
    pub fn get_object(&self, kind: Kind, key: &ObjectKey) -> StateResult<Option<Object>> {
        let table_key = object_key(kind, key);
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(OBJECTS).map_err(map_err!(Table))?;
        match table.get(table_key.as_str()).map_err(map_err!(Read))? {
            Some(guard) => {
                let object: Object =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(object))
            }
            None => Ok(None),
        }
    }

    /// Create an object, assigning uid, resource version, and (for services)
    /// a cluster IP. Returns the stored object.
    pub fn create_object(&self, object: &Object) -> StateResult<Object> {
        let table_key = object_key(object.kind(), &object.key());
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let stored = {
            let exists = {
                let table = txn.open_table(OBJECTS).map_err(map_err!(Table))?;
                table
                    .get(table_key.as_str())
                    .map_err(map_err!(Read))?
                    .is_some()
            };
            if exists {
                return Err(StateError::AlreadyExists(table_key));
            }

            let seq = Self::next_sequence(&txn)?;
            let mut stored = object.clone();
            let meta = stored.metadata_mut();
            meta.uid = Some(format!("uid-{seq:012}"));
            meta.resource_version = Some(1);
            if let Object::Service(service) = &mut stored {
                service.spec.cluster_ip.get_or_insert_with(|| cluster_ip(seq));
            }

            let value = serde_json::to_vec(&stored).map_err(map_err!(Serialize))?;
            let mut table = txn.open_table(OBJECTS).map_err(map_err!(Table))?;
            table
                .insert(table_key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
            stored
        };
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(key = %table_key, "object created");
        Ok(stored)
    }

    /// Apply a JSON merge patch to an existing object.
    ///
    /// Identity fields (kind, name, namespace, uid) cannot be patched and the
    /// result must still deserialize as an object of the same kind.
    pub fn patch_object(&self, kind: Kind, key: &ObjectKey, diff: &Value) -> StateResult<Object> {
        let table_key = object_key(kind, key);
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let patched = {
            let mut table = txn.open_table(OBJECTS).map_err(map_err!(Table))?;
            let bytes = table
                .get(table_key.as_str())
                .map_err(map_err!(Read))?
                .map(|guard| guard.value().to_vec())
                .ok_or_else(|| StateError::NotFound(table_key.clone()))?;
            let before: Object = serde_json::from_slice(&bytes).map_err(map_err!(Deserialize))?;

            let mut value = serde_json::to_value(&before).map_err(map_err!(Serialize))?;
            apply_merge_patch(&mut value, diff);
            let mut patched: Object = serde_json::from_value(value)
                .map_err(|e| StateError::InvalidPatch(table_key.clone(), e.to_string()))?;

            let (old, new) = (before.metadata(), patched.metadata());
            if patched.kind() != kind
                || new.name != old.name
                || new.namespace != old.namespace
                || new.uid != old.uid
            {
                return Err(StateError::InvalidPatch(
                    table_key,
                    "identity fields are immutable".to_string(),
                ));
            }
            let version = old.resource_version.unwrap_or(0) + 1;
            patched.metadata_mut().resource_version = Some(version);

            let value = serde_json::to_vec(&patched).map_err(map_err!(Serialize))?;
            table
                .insert(table_key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
            patched
        };
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(key = %table_key, "object patched");
        Ok(patched)
    }

    /// List objects, optionally restricted to one kind.
    pub fn list_objects(&self, kind: Option<Kind>) -> StateResult<Vec<Object>> {
        let prefix = kind.map(|kind| format!("{}:", kind.as_str()));
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(OBJECTS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if prefix
                .as_deref()
                .is_some_and(|prefix| !key.value().starts_with(prefix))
            {
                continue;
            }
            let object: Object =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(object);
        }
        Ok(results)
    }

    /// Delete one object. Returns true if it existed.
    pub fn delete_object(&self, kind: Kind, key: &ObjectKey) -> StateResult<bool> {
        let table_key = object_key(kind, key);
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(OBJECTS).map_err(map_err!(Table))?;
            existed = table
                .remove(table_key.as_str())
                .map_err(map_err!(Write))?
                .is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(key = %table_key, existed, "object deleted");
        Ok(existed)
    }
}

impl ClusterStore for StateStore {
    fn get(&self, kind: Kind, key: &ObjectKey) -> StateResult<Option<Object>> {
        self.get_object(kind, key)
    }

    fn create(&self, object: &Object) -> StateResult<Object> {
        self.create_object(object)
    }

    fn patch(&self, kind: Kind, key: &ObjectKey, diff: &Value) -> StateResult<Object> {
        self.patch_object(kind, key, diff)
    }

    fn write_status(&self, id: &WorkloadId, status: &WorkloadStatus) -> StateResult<()> {
        self.put_status(id, status)
    }
}

impl SpecSource for StateStore {
    fn get_spec(&self, id: &WorkloadId) -> StateResult<Option<Workload>> {
        self.get_workload(id)
    }
}
