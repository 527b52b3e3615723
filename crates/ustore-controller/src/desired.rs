//! Desired-state builder: workload spec → deployment, service, and claims.
//!
//! Everything here is pure: no store access, no registry access. The caller
//! passes the planned claims for the workload being built, which is what
//! keeps one workload's volumes out of another's deployment.

use std::collections::BTreeMap;

use ustore_core::{AffinityPreference, EngineType, Quantity, WorkloadSpec};
use ustore_state::{
    Affinity, ClaimSpec, ClaimVolumeSource, Container, Deployment, DeploymentSpec, EnvVar,
    LabelSelector, LocalObjectReference, NodeAffinity, NodeSelectorRequirement, NodeSelectorTerm,
    ObjectKey, ObjectMeta, PersistentVolumeClaim, PodMeta, PodSpec, PodTemplateSpec,
    PreferredSchedulingTerm, ResourceRequirements, Service, ServicePort, ServiceSpec, Volume,
    VolumeMount, WorkloadMeta,
};

use crate::volumes::ClaimDesc;

pub const CONTAINER_NAME: &str = "ustore";
pub const CONFIG_VOLUME_NAME: &str = "config";
pub const SERVICE_PORT_NAME: &str = "db";
pub const WORKDIR: &str = "/var/lib/ustore";

/// Baseline requests every database container gets regardless of limits.
pub const REQUEST_CPU: &str = "200m";
pub const REQUEST_MEMORY: &str = "100Mi";

const APP_LABEL: &str = "ustore";
const CLUSTER_IP: &str = "ClusterIP";
const VOLUME_MODE: &str = "Filesystem";

/// Target shapes of the deployment and service of one workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredState {
    pub deployment: Deployment,
    pub service: Service,
}

/// Labels selecting the pods and objects of workload `name`.
pub fn labels_for(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), APP_LABEL.to_string()),
        ("ownerInstance".to_string(), name.to_string()),
    ])
}

/// Directory the config volume is mounted at.
pub fn config_dir(engine: EngineType) -> String {
    format!("{WORKDIR}/{engine}/")
}

/// Path of the engine config file inside the container.
pub fn config_path(engine: EngineType) -> String {
    format!("{WORKDIR}/{engine}/config.json")
}

/// Build the deployment and service for a workload.
pub fn build(
    meta: &WorkloadMeta,
    spec: &WorkloadSpec,
    engine: EngineType,
    claims: &[ClaimDesc],
) -> DesiredState {
    DesiredState {
        deployment: build_deployment(meta, spec, engine, claims),
        service: build_service(meta, spec),
    }
}

pub fn build_deployment(
    meta: &WorkloadMeta,
    spec: &WorkloadSpec,
    engine: EngineType,
    claims: &[ClaimDesc],
) -> Deployment {
    let labels = labels_for(&meta.name);
    let profile = engine.profile();

    let mut volumes = vec![Volume {
        name: CONFIG_VOLUME_NAME.to_string(),
        config_map: Some(LocalObjectReference {
            name: spec.config_source.clone(),
        }),
        persistent_volume_claim: None,
    }];
    let mut volume_mounts = vec![VolumeMount {
        name: CONFIG_VOLUME_NAME.to_string(),
        mount_path: config_dir(engine),
    }];
    for claim in claims {
        volumes.push(Volume {
            name: claim.name.clone(),
            config_map: None,
            persistent_volume_claim: Some(ClaimVolumeSource {
                claim_name: claim.name.clone(),
            }),
        });
        volume_mounts.push(VolumeMount {
            name: claim.name.clone(),
            mount_path: claim.mount_path.clone(),
        });
    }

    let container = Container {
        name: CONTAINER_NAME.to_string(),
        image: profile.image.to_string(),
        command: vec![engine.server_binary()],
        args: ["--config", "$(DBCONFIG)", "--port", "$(DBPORT)"]
            .map(String::from)
            .to_vec(),
        env: vec![
            EnvVar {
                name: "DBCONFIG".to_string(),
                value: config_path(engine),
            },
            EnvVar {
                name: "DBPORT".to_string(),
                value: spec.service_port.to_string(),
            },
        ],
        volume_mounts,
        resources: resources_for(spec),
    };

    let image_pull_secrets = profile
        .pull_secret
        .map(|name| {
            vec![LocalObjectReference {
                name: name.to_string(),
            }]
        })
        .unwrap_or_default();

    Deployment {
        metadata: ObjectMeta::new(
            &ObjectKey::new(meta.namespace.clone(), meta.name.clone()),
            BTreeMap::new(),
        ),
        spec: DeploymentSpec {
            replicas: spec.replicas(),
            selector: LabelSelector {
                match_labels: labels.clone(),
            },
            template: PodTemplateSpec {
                metadata: PodMeta { labels },
                spec: PodSpec {
                    containers: vec![container],
                    volumes,
                    affinity: affinity_for(&spec.affinity),
                    image_pull_secrets,
                },
            },
        },
    }
}

pub fn build_service(meta: &WorkloadMeta, spec: &WorkloadSpec) -> Service {
    let labels = labels_for(&meta.name);
    Service {
        metadata: ObjectMeta::new(
            &ObjectKey::new(meta.namespace.clone(), meta.name.clone()),
            labels.clone(),
        ),
        spec: ServiceSpec {
            ports: vec![ServicePort {
                name: SERVICE_PORT_NAME.to_string(),
                protocol: "TCP".to_string(),
                port: spec.service_port,
                target_port: spec.service_port,
            }],
            selector: labels,
            service_type: CLUSTER_IP.to_string(),
            cluster_ip: None,
        },
    }
}

pub fn build_claim(meta: &WorkloadMeta, claim: &ClaimDesc) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: ObjectMeta::new(
            &ObjectKey::new(meta.namespace.clone(), claim.name.clone()),
            BTreeMap::new(),
        ),
        spec: ClaimSpec {
            access_modes: vec![claim.access_mode],
            volume_mode: VOLUME_MODE.to_string(),
            resources: ResourceRequirements {
                limits: BTreeMap::new(),
                requests: BTreeMap::from([("storage".to_string(), claim.size.clone())]),
            },
        },
    }
}

fn resources_for(spec: &WorkloadSpec) -> ResourceRequirements {
    let requests = BTreeMap::from([
        ("cpu".to_string(), Quantity::new(REQUEST_CPU)),
        ("memory".to_string(), Quantity::new(REQUEST_MEMORY)),
    ]);
    let mut limits = BTreeMap::new();
    if let Some(cpu) = &spec.concurrency_limit {
        limits.insert("cpu".to_string(), cpu.clone());
    }
    if let Some(memory) = &spec.memory_limit {
        limits.insert("memory".to_string(), memory.clone());
    }
    ResourceRequirements { limits, requests }
}

/// Soft node affinity with one weighted term per preference.
fn affinity_for(preferences: &[AffinityPreference]) -> Option<Affinity> {
    if preferences.is_empty() {
        return None;
    }
    let terms = preferences
        .iter()
        .map(|preference| PreferredSchedulingTerm {
            weight: preference.weight,
            preference: NodeSelectorTerm {
                match_expressions: vec![NodeSelectorRequirement {
                    key: preference.label_key.clone(),
                    operator: "In".to_string(),
                    values: vec![preference.label_value.clone()],
                }],
            },
        })
        .collect();
    Some(Affinity {
        node_affinity: Some(NodeAffinity {
            preferred_during_scheduling_ignored_during_execution: terms,
        }),
    })
}
