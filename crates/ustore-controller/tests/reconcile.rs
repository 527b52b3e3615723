//! End-to-end reconcile passes against the embedded state store.

use std::sync::Mutex;

use serde_json::Value;
use ustore_controller::volumes::derive_claim_name;
use ustore_controller::{CancelSignal, ClaimRegistry, Outcome, Pass, ReconcileError, Reconciler};
use ustore_core::{
    AccessMode, DeploymentState, EngineType, Quantity, ServiceState, VolumeRequest, WorkloadId,
    WorkloadSpec, WorkloadStatus,
};
use ustore_state::{
    ClusterStore, Deployment, Kind, Object, ObjectKey, OwnerReference, Service, SpecSource,
    StateError, StateResult, StateStore, Workload,
};

const DOMAIN: &str = "svc.cluster.local";

/// Cluster store that records every call and can fail reads, creates or
/// patches of one kind.
struct RecordingStore {
    inner: StateStore,
    calls: Mutex<Vec<String>>,
    fail_get: Option<(Kind, fn(String) -> StateError)>,
    fail_create: Option<Kind>,
    fail_patch: Option<Kind>,
}

impl RecordingStore {
    fn new(inner: StateStore) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            fail_get: None,
            fail_create: None,
            fail_patch: None,
        }
    }

    fn failing_get(inner: StateStore, kind: Kind, error: fn(String) -> StateError) -> Self {
        Self {
            fail_get: Some((kind, error)),
            ..Self::new(inner)
        }
    }

    fn failing_create(inner: StateStore, kind: Kind) -> Self {
        Self {
            fail_create: Some(kind),
            ..Self::new(inner)
        }
    }

    fn failing_patch(inner: StateStore, kind: Kind) -> Self {
        Self {
            fail_patch: Some(kind),
            ..Self::new(inner)
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn writes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with("create") || call.starts_with("patch"))
            .collect()
    }

    fn reset(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl ClusterStore for RecordingStore {
    fn get(&self, kind: Kind, key: &ObjectKey) -> StateResult<Option<Object>> {
        self.record(format!("get {kind} {key}"));
        if let Some((_, error)) = self.fail_get.filter(|(failing, _)| *failing == kind) {
            return Err(error(format!("{kind} {key}: corrupt record")));
        }
        self.inner.get(kind, key)
    }

    fn create(&self, object: &Object) -> StateResult<Object> {
        self.record(format!("create {} {}", object.kind(), object.key()));
        if self.fail_create == Some(object.kind()) {
            return Err(StateError::Write("quota exceeded".to_string()));
        }
        self.inner.create(object)
    }

    fn patch(&self, kind: Kind, key: &ObjectKey, diff: &Value) -> StateResult<Object> {
        self.record(format!("patch {kind} {key}"));
        if self.fail_patch == Some(kind) {
            return Err(StateError::InvalidPatch(key.to_string(), "conflict".to_string()));
        }
        self.inner.patch(kind, key, diff)
    }

    fn write_status(&self, id: &WorkloadId, status: &WorkloadStatus) -> StateResult<()> {
        self.record(format!("status {id}"));
        self.inner.write_status(id, status)
    }
}

/// Spec source that serves the stored workload with its engine swapped, as a
/// platform without admission checks would.
struct EngineSwap {
    inner: StateStore,
    engine: Option<EngineType>,
}

impl SpecSource for EngineSwap {
    fn get_spec(&self, id: &WorkloadId) -> StateResult<Option<Workload>> {
        Ok(self.inner.get_spec(id)?.map(|mut workload| {
            workload.spec.engine = self.engine;
            workload
        }))
    }
}

fn spec(engine: EngineType, port: i32) -> WorkloadSpec {
    WorkloadSpec {
        engine: Some(engine),
        config_source: "kv-config".to_string(),
        service_port: port,
        volumes: Vec::new(),
        replica_count: Some(1),
        memory_limit: None,
        concurrency_limit: None,
        affinity: Vec::new(),
    }
}

fn volume(path: &str, size: &str) -> VolumeRequest {
    VolumeRequest {
        size: Quantity::new(size),
        mount_path: path.to_string(),
        access_mode: AccessMode::ReadWriteOnce,
    }
}

fn setup() -> (StateStore, Reconciler<RecordingStore, StateStore>) {
    let store = StateStore::open_in_memory().unwrap();
    let reconciler = Reconciler::new(
        RecordingStore::new(store.clone()),
        store.clone(),
        ClaimRegistry::new(),
        DOMAIN,
    );
    (store, reconciler)
}

fn converged(pass: Pass) -> (ustore_controller::Progress, WorkloadStatus) {
    match pass {
        Pass::Converged { progress, status } => (progress, status),
        Pass::Deleted => panic!("expected a converged pass"),
    }
}

fn deployment(store: &StateStore, id: &WorkloadId) -> Deployment {
    let key = ObjectKey::new(&id.namespace, &id.name);
    match store.get_object(Kind::Deployment, &key).unwrap() {
        Some(Object::Deployment(deployment)) => deployment,
        other => panic!("expected a deployment, got {other:?}"),
    }
}

fn service(store: &StateStore, id: &WorkloadId) -> Service {
    store
        .get_object(Kind::Service, &ObjectKey::new(&id.namespace, &id.name))
        .unwrap()
        .and_then(Object::into_service)
        .unwrap()
}

#[test]
fn fresh_workload_creates_deployment_and_service() {
    let (store, reconciler) = setup();
    let id = WorkloadId::new("default", "kv");
    store.apply_workload(&id, spec(EngineType::Umem, 9090)).unwrap();

    let (progress, status) =
        converged(reconciler.reconcile(&id, &CancelSignal::never()).unwrap());

    assert!(progress.claims.is_empty());
    assert_eq!(progress.deployment, Some(Outcome::Created));
    assert_eq!(progress.service, Some(Outcome::Created));
    assert_eq!(status.deployment_state, DeploymentState::Created);
    assert_eq!(status.service_state, ServiceState::Created);
    assert_eq!(status.deployment_name, "kv");
    assert_eq!(status.service_endpoint, "kv.default.svc.cluster.local:9090");

    let deployment = deployment(&store, &id);
    let container = &deployment.spec.template.spec.containers[0];
    let dbport = container.env.iter().find(|env| env.name == "DBPORT").unwrap();
    assert_eq!(dbport.value, "9090");
    assert_eq!(deployment.spec.replicas, 1);

    let service = service(&store, &id);
    let port = service.primary_port().unwrap();
    assert_eq!((port.port, port.target_port), (9090, 9090));

    let uid = store.get_workload(&id).unwrap().unwrap().metadata.uid;
    assert!(deployment.metadata.is_controlled_by(&uid));
    assert!(service.metadata.is_controlled_by(&uid));
}

#[test]
fn second_pass_is_unchanged_and_writes_nothing() {
    let (store, reconciler) = setup();
    let id = WorkloadId::new("default", "kv");
    let mut first = spec(EngineType::Rocksdb, 9090);
    first.volumes = vec![volume("/data", "10Gi")];
    first.memory_limit = Some(Quantity::new("1Gi"));
    store.apply_workload(&id, first).unwrap();

    let (_, first_status) =
        converged(reconciler.reconcile(&id, &CancelSignal::never()).unwrap());
    let before = store.list_objects(None).unwrap();
    reconciler.store().reset();

    let (progress, status) =
        converged(reconciler.reconcile(&id, &CancelSignal::never()).unwrap());

    assert_eq!(progress.claims[0].1, Outcome::Unchanged);
    assert_eq!(progress.deployment, Some(Outcome::Unchanged));
    assert_eq!(progress.service, Some(Outcome::Unchanged));
    assert_eq!(status, first_status);
    assert!(reconciler.store().writes().is_empty(), "{:?}", reconciler.store().calls());
    assert_eq!(store.list_objects(None).unwrap(), before);
}

#[test]
fn port_change_patches_only_the_service_port() {
    let (store, reconciler) = setup();
    let id = WorkloadId::new("default", "kv");
    store.apply_workload(&id, spec(EngineType::Umem, 9090)).unwrap();
    reconciler.reconcile(&id, &CancelSignal::never()).unwrap();
    let bound = service(&store, &id);

    store.apply_workload(&id, spec(EngineType::Umem, 9091)).unwrap();
    let (progress, status) =
        converged(reconciler.reconcile(&id, &CancelSignal::never()).unwrap());

    assert_eq!(progress.service, Some(Outcome::Patched));
    assert_eq!(status.service_state, ServiceState::Updated);
    assert_eq!(status.service_endpoint, "kv.default.svc.cluster.local:9091");

    let patched = service(&store, &id);
    let port = patched.primary_port().unwrap();
    assert_eq!((port.port, port.target_port), (9091, 9091));
    assert_eq!(patched.spec.cluster_ip, bound.spec.cluster_ip);
    assert_eq!(patched.spec.selector, bound.spec.selector);
    assert_eq!(patched.metadata.uid, bound.metadata.uid);

    // DBPORT moves with the port, so the deployment is patched too.
    assert_eq!(progress.deployment, Some(Outcome::Patched));
    let deployment = deployment(&store, &id);
    let container = &deployment.spec.template.spec.containers[0];
    assert!(container.env.iter().any(|env| env.name == "DBPORT" && env.value == "9091"));
}

#[test]
fn declared_volume_becomes_claim_and_mount() {
    let (store, reconciler) = setup();
    let id = WorkloadId::new("default", "kv");
    let mut with_volume = spec(EngineType::Leveldb, 9090);
    with_volume.volumes = vec![volume("/data", "10Gi")];
    store.apply_workload(&id, with_volume).unwrap();

    let (progress, _) = converged(reconciler.reconcile(&id, &CancelSignal::never()).unwrap());

    let claim_name = derive_claim_name(&id, "/data");
    assert_eq!(progress.claims, vec![(claim_name.clone(), Outcome::Created)]);

    let claim = store
        .get_object(
            Kind::PersistentVolumeClaim,
            &ObjectKey::new("default", claim_name.as_str()),
        )
        .unwrap()
        .and_then(Object::into_claim)
        .unwrap();
    assert_eq!(claim.requested_storage(), Some(&Quantity::new("10Gi")));
    assert_eq!(claim.spec.access_modes, vec![AccessMode::ReadWriteOnce]);

    let deployment = deployment(&store, &id);
    let pod = &deployment.spec.template.spec;
    let mount = pod.containers[0]
        .volume_mounts
        .iter()
        .find(|mount| mount.mount_path == "/data")
        .unwrap();
    assert_eq!(mount.name, claim_name);
    let backing = pod.volumes.iter().find(|v| v.name == claim_name).unwrap();
    assert_eq!(
        backing
            .persistent_volume_claim
            .as_ref()
            .map(|source| source.claim_name.as_str()),
        Some(claim_name.as_str())
    );
}

#[test]
fn engine_change_is_rejected_before_any_store_call() {
    let store = StateStore::open_in_memory().unwrap();
    let id = WorkloadId::new("default", "kv");
    store.apply_workload(&id, spec(EngineType::Rocksdb, 9090)).unwrap();

    // Admission refuses the change outright.
    let err = store
        .apply_workload(&id, spec(EngineType::Udisk, 9090))
        .unwrap_err();
    assert!(matches!(err, StateError::Rejected(_)));

    // A spec source that skips admission still cannot get past the reconciler.
    let reconciler = Reconciler::new(
        RecordingStore::new(store.clone()),
        EngineSwap {
            inner: store.clone(),
            engine: Some(EngineType::Udisk),
        },
        ClaimRegistry::new(),
        DOMAIN,
    );
    let err = reconciler.reconcile(&id, &CancelSignal::never()).unwrap_err();
    assert!(matches!(err, ReconcileError::ValidationRejected { .. }));
    assert!(!err.requeue());
    assert!(reconciler.store().calls().is_empty());
    assert!(store.list_objects(None).unwrap().is_empty());
    assert_eq!(
        store.get_workload(&id).unwrap().unwrap().status,
        WorkloadStatus::default()
    );
}

#[test]
fn cleared_engine_is_rejected() {
    let store = StateStore::open_in_memory().unwrap();
    let id = WorkloadId::new("default", "kv");
    store.apply_workload(&id, spec(EngineType::Umem, 9090)).unwrap();

    let reconciler = Reconciler::new(
        RecordingStore::new(store.clone()),
        EngineSwap {
            inner: store.clone(),
            engine: None,
        },
        ClaimRegistry::new(),
        DOMAIN,
    );
    let err = reconciler.reconcile(&id, &CancelSignal::never()).unwrap_err();
    assert!(matches!(err, ReconcileError::ValidationRejected { .. }));
    assert!(reconciler.store().calls().is_empty());
}

#[test]
fn claims_are_scoped_to_their_workload() {
    let (store, reconciler) = setup();
    let a = WorkloadId::new("default", "a");
    let b = WorkloadId::new("default", "b");
    let mut with_volume = spec(EngineType::Umem, 9090);
    with_volume.volumes = vec![volume("/data", "10Gi")];
    store.apply_workload(&a, with_volume).unwrap();
    store.apply_workload(&b, spec(EngineType::Umem, 9191)).unwrap();

    reconciler.reconcile(&a, &CancelSignal::never()).unwrap();
    reconciler.reconcile(&b, &CancelSignal::never()).unwrap();

    let pod = deployment(&store, &b).spec.template.spec;
    assert_eq!(pod.volumes.len(), 1, "only the config volume: {:?}", pod.volumes);
    assert!(pod.volumes.iter().all(|v| v.persistent_volume_claim.is_none()));

    let pod = deployment(&store, &a).spec.template.spec;
    assert_eq!(pod.volumes.len(), 2);
}

#[test]
fn removed_volume_is_unmounted() {
    let (store, reconciler) = setup();
    let id = WorkloadId::new("default", "kv");
    let mut two = spec(EngineType::Umem, 9090);
    two.volumes = vec![volume("/data", "10Gi"), volume("/wal", "1Gi")];
    store.apply_workload(&id, two).unwrap();
    reconciler.reconcile(&id, &CancelSignal::never()).unwrap();

    let mut one = spec(EngineType::Umem, 9090);
    one.volumes = vec![volume("/data", "10Gi")];
    store.apply_workload(&id, one).unwrap();
    let (progress, _) = converged(reconciler.reconcile(&id, &CancelSignal::never()).unwrap());

    assert_eq!(progress.deployment, Some(Outcome::Patched));
    let mounts: Vec<String> = deployment(&store, &id).spec.template.spec.containers[0]
        .volume_mounts
        .iter()
        .map(|mount| mount.mount_path.clone())
        .collect();
    assert_eq!(mounts, vec!["/var/lib/ustore/umem/", "/data"]);
}

#[test]
fn claim_names_survive_restart() {
    let (store, reconciler) = setup();
    let id = WorkloadId::new("default", "kv");
    let mut with_volume = spec(EngineType::Umem, 9090);
    with_volume.volumes = vec![volume("/data", "10Gi")];
    store.apply_workload(&id, with_volume).unwrap();
    reconciler.reconcile(&id, &CancelSignal::never()).unwrap();

    // A fresh registry stands in for a restarted process.
    let restarted = Reconciler::new(
        RecordingStore::new(store.clone()),
        store.clone(),
        ClaimRegistry::new(),
        DOMAIN,
    );
    let (progress, _) = converged(restarted.reconcile(&id, &CancelSignal::never()).unwrap());
    assert_eq!(progress.claims[0].1, Outcome::Unchanged);
    assert_eq!(progress.deployment, Some(Outcome::Unchanged));
    assert!(restarted.store().writes().is_empty());
}

#[test]
fn cancelled_pass_issues_no_store_calls() {
    let (store, reconciler) = setup();
    let id = WorkloadId::new("default", "kv");
    store.apply_workload(&id, spec(EngineType::Umem, 9090)).unwrap();

    let (tx, cancel) = CancelSignal::pair();
    tx.send(true).unwrap();
    let err = reconciler.reconcile(&id, &cancel).unwrap_err();

    assert!(matches!(err, ReconcileError::Cancelled { .. }));
    assert!(err.requeue());
    assert!(reconciler.store().calls().is_empty());
}

#[test]
fn foreign_deployment_is_never_overwritten() {
    let (store, reconciler) = setup();
    let id = WorkloadId::new("default", "kv");
    store.apply_workload(&id, spec(EngineType::Umem, 9090)).unwrap();

    let mut squatter = Object::from(ustore_controller::desired::build_deployment(
        &store.get_workload(&id).unwrap().unwrap().metadata,
        &spec(EngineType::Umem, 1234),
        EngineType::Umem,
        &[],
    ));
    squatter.set_owner(&OwnerReference {
        api_version: "apps/v1".to_string(),
        kind: "ReplicaSet".to_string(),
        name: "other".to_string(),
        uid: "uid-foreign".to_string(),
        controller: true,
        block_owner_deletion: true,
    });
    store.create_object(&squatter).unwrap();
    let before = deployment(&store, &id);

    let err = reconciler.reconcile(&id, &CancelSignal::never()).unwrap_err();
    assert!(matches!(err, ReconcileError::ConflictingState { .. }));
    assert!(!reconciler.store().calls().iter().any(|c| c.starts_with("patch Deployment")));
    assert_eq!(deployment(&store, &id), before);

    let status = store.get_workload(&id).unwrap().unwrap().status;
    assert_eq!(status.deployment_state, DeploymentState::Failed);
    assert_eq!(status.service_state, ServiceState::Pending);
}

#[test]
fn claim_failure_leaves_dependents_pending() {
    let store = StateStore::open_in_memory().unwrap();
    let id = WorkloadId::new("default", "kv");
    let mut with_volume = spec(EngineType::Umem, 9090);
    with_volume.volumes = vec![volume("/data", "10Gi")];
    store.apply_workload(&id, with_volume).unwrap();

    let reconciler = Reconciler::new(
        RecordingStore::failing_create(store.clone(), Kind::PersistentVolumeClaim),
        store.clone(),
        ClaimRegistry::new(),
        DOMAIN,
    );
    let err = reconciler.reconcile(&id, &CancelSignal::never()).unwrap_err();

    match &err {
        ReconcileError::ConvergenceFailed { kind, reason, .. } => {
            assert_eq!(kind, "PersistentVolumeClaim");
            assert!(reason.starts_with("creation error:"), "{reason}");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.requeue());
    let key = ObjectKey::new("default", "kv");
    assert!(store.get_object(Kind::Deployment, &key).unwrap().is_none());

    let status = store.get_workload(&id).unwrap().unwrap().status;
    assert_eq!(status.deployment_state, DeploymentState::Pending);
    assert_eq!(status.service_state, ServiceState::Pending);
}

#[test]
fn service_failure_keeps_deployment_progress() {
    let store = StateStore::open_in_memory().unwrap();
    let id = WorkloadId::new("default", "kv");
    store.apply_workload(&id, spec(EngineType::Umem, 9090)).unwrap();

    let reconciler = Reconciler::new(
        RecordingStore::failing_create(store.clone(), Kind::Service),
        store.clone(),
        ClaimRegistry::new(),
        DOMAIN,
    );
    let err = reconciler.reconcile(&id, &CancelSignal::never()).unwrap_err();
    assert!(matches!(err, ReconcileError::ConvergenceFailed { .. }));

    let status = store.get_workload(&id).unwrap().unwrap().status;
    assert_eq!(status.deployment_state, DeploymentState::Created);
    assert_eq!(status.deployment_name, "kv");
    assert_eq!(status.service_state, ServiceState::Failed);
    assert!(status.service_endpoint.is_empty());
}

#[test]
fn failed_service_patch_reports_failed_service() {
    let (store, reconciler) = setup();
    let id = WorkloadId::new("default", "kv");
    store.apply_workload(&id, spec(EngineType::Umem, 9090)).unwrap();
    reconciler.reconcile(&id, &CancelSignal::never()).unwrap();

    store.apply_workload(&id, spec(EngineType::Umem, 7070)).unwrap();
    let failing = Reconciler::new(
        RecordingStore::failing_patch(store.clone(), Kind::Service),
        store.clone(),
        ClaimRegistry::new(),
        DOMAIN,
    );
    let err = failing.reconcile(&id, &CancelSignal::never()).unwrap_err();
    match &err {
        ReconcileError::ConvergenceFailed { kind, reason, .. } => {
            assert_eq!(kind, "Service");
            assert!(reason.starts_with("patch error:"), "{reason}");
        }
        other => panic!("expected ConvergenceFailed, got {other:?}"),
    }
    assert!(err.requeue());

    let status = store.get_workload(&id).unwrap().unwrap().status;
    assert_eq!(status.deployment_state, DeploymentState::Created);
    assert_eq!(status.service_state, ServiceState::Failed);
    assert!(status.service_endpoint.is_empty());
    assert_eq!(service(&store, &id).primary_port().unwrap().port, 9090);
}

#[test]
fn failed_deployment_patch_stops_before_service() {
    let (store, reconciler) = setup();
    let id = WorkloadId::new("default", "kv");
    store.apply_workload(&id, spec(EngineType::Umem, 9090)).unwrap();
    reconciler.reconcile(&id, &CancelSignal::never()).unwrap();

    let mut bigger = spec(EngineType::Umem, 9090);
    bigger.replica_count = Some(3);
    store.apply_workload(&id, bigger).unwrap();
    let failing = Reconciler::new(
        RecordingStore::failing_patch(store.clone(), Kind::Deployment),
        store.clone(),
        ClaimRegistry::new(),
        DOMAIN,
    );
    let err = failing.reconcile(&id, &CancelSignal::never()).unwrap_err();
    assert!(matches!(err, ReconcileError::ConvergenceFailed { .. }));
    assert_eq!(err.kind(), Some("Deployment"));

    let calls = failing.store().calls();
    assert!(calls.iter().any(|call| call.starts_with("patch Deployment")));
    assert!(!calls.iter().any(|call| call.contains("Service")), "{calls:?}");

    let status = store.get_workload(&id).unwrap().unwrap().status;
    assert_eq!(status.deployment_state, DeploymentState::Failed);
    assert_eq!(status.service_state, ServiceState::Pending);
    assert_eq!(deployment(&store, &id).spec.replicas, 1);
}

#[test]
fn unreadable_deployment_is_store_unavailable() {
    let store = StateStore::open_in_memory().unwrap();
    let id = WorkloadId::new("default", "kv");
    store.apply_workload(&id, spec(EngineType::Umem, 9090)).unwrap();

    let corrupt = Reconciler::new(
        RecordingStore::failing_get(store.clone(), Kind::Deployment, StateError::Deserialize),
        store.clone(),
        ClaimRegistry::new(),
        DOMAIN,
    );
    let err = corrupt.reconcile(&id, &CancelSignal::never()).unwrap_err();
    assert!(matches!(err, ReconcileError::StoreUnavailable { .. }));
    assert!(!err.requeue());
    assert!(corrupt.store().writes().is_empty());

    let status = store.get_workload(&id).unwrap().unwrap().status;
    assert_eq!(status.deployment_state, DeploymentState::Failed);
    assert_eq!(status.service_state, ServiceState::Pending);

    let flaky = Reconciler::new(
        RecordingStore::failing_get(store.clone(), Kind::Deployment, StateError::Read),
        store.clone(),
        ClaimRegistry::new(),
        DOMAIN,
    );
    let err = flaky.reconcile(&id, &CancelSignal::never()).unwrap_err();
    assert!(matches!(err, ReconcileError::StoreUnavailable { .. }));
    assert!(err.requeue());
}

#[test]
fn deleted_workload_cascades_and_forgets_claims() {
    let (store, reconciler) = setup();
    let id = WorkloadId::new("default", "kv");
    let mut with_volume = spec(EngineType::Umem, 9090);
    with_volume.volumes = vec![volume("/data", "10Gi")];
    store.apply_workload(&id, with_volume).unwrap();
    reconciler.reconcile(&id, &CancelSignal::never()).unwrap();
    assert_eq!(store.list_objects(None).unwrap().len(), 3);

    assert_eq!(store.delete_workload(&id).unwrap(), Some(3));
    assert!(store.list_objects(None).unwrap().is_empty());

    let pass = reconciler.reconcile(&id, &CancelSignal::never()).unwrap();
    assert_eq!(pass, Pass::Deleted);
    assert!(reconciler.registry().claims_for(&id).is_empty());
}

#[test]
fn enterprise_engine_gets_pull_secret() {
    let (store, reconciler) = setup();
    let id = WorkloadId::new("default", "kv");
    store.apply_workload(&id, spec(EngineType::Udisk, 9090)).unwrap();
    reconciler.reconcile(&id, &CancelSignal::never()).unwrap();

    let pod = deployment(&store, &id).spec.template.spec;
    assert_eq!(pod.image_pull_secrets.len(), 1);
    assert_eq!(pod.image_pull_secrets[0].name, "ghcrio");
    assert_eq!(pod.containers[0].command, vec!["./udisk_server"]);
}
