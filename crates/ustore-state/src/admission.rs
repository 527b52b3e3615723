//! Admission checks applied before a workload spec is persisted.
//!
//! These mirror the schema rules of the `UStore` resource: enum and pattern
//! constraints on individual fields, and the set-once rule on the engine
//! type. [`check_engine_transition`] is also used by the reconciler as its
//! own guard, so a record written around admission is still refused.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use ustore_core::{EngineType, WorkloadSpec};

static MEMORY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9][0-9]{0,3}[KMG]i$").expect("valid memory pattern"));

static SIZE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9][0-9]{0,3}[KMGTPE]i$").expect("valid size pattern"));

static CPU_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+(\.[0-9]+)?|[1-9][0-9]*m)$").expect("valid cpu pattern")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("engine type is immutable: {from} cannot change to {to}")]
    EngineChanged { from: EngineType, to: EngineType },

    #[error("engine type {0} is required once set")]
    EngineCleared(EngineType),

    #[error("engine type is required")]
    EngineMissing,

    #[error("dbConfigMapName is required")]
    ConfigSourceMissing,

    #[error("service port {0} out of range 1..=65535")]
    PortOutOfRange(i32),

    #[error("numOfInstances must not be negative, got {0}")]
    NegativeReplicas(i32),

    #[error("invalid {field} quantity {value:?}")]
    Quantity { field: &'static str, value: String },

    #[error("mount path {0:?} must be absolute")]
    RelativeMountPath(String),

    #[error("mount path {0:?} declared more than once")]
    DuplicateMountPath(String),

    #[error("affinity label key must not be empty")]
    EmptyAffinityLabel,

    #[error("affinity weight {weight} for label {label:?} out of range 1..=100")]
    AffinityWeight { label: String, weight: i32 },
}

/// Validate the set-once rule on the engine type.
///
/// `admitted` is the engine the workload was first accepted with, `requested`
/// the engine in the spec under consideration.
pub fn check_engine_transition(
    admitted: Option<EngineType>,
    requested: Option<EngineType>,
) -> Result<(), AdmissionError> {
    match (admitted, requested) {
        (Some(from), Some(to)) if from != to => Err(AdmissionError::EngineChanged { from, to }),
        (Some(from), None) => Err(AdmissionError::EngineCleared(from)),
        _ => Ok(()),
    }
}

/// Mount paths must be unique; planned claim names are derived from them.
pub fn check_unique_mount_paths(spec: &WorkloadSpec) -> Result<(), AdmissionError> {
    let mut seen = HashSet::new();
    for volume in &spec.volumes {
        if !seen.insert(volume.mount_path.as_str()) {
            return Err(AdmissionError::DuplicateMountPath(volume.mount_path.clone()));
        }
    }
    Ok(())
}

/// Field-level checks on a spec, independent of any previous version.
pub fn validate_spec(spec: &WorkloadSpec) -> Result<(), AdmissionError> {
    if spec.config_source.is_empty() {
        return Err(AdmissionError::ConfigSourceMissing);
    }
    if !(1..=65535).contains(&spec.service_port) {
        return Err(AdmissionError::PortOutOfRange(spec.service_port));
    }
    if let Some(replicas) = spec.replica_count {
        if replicas < 0 {
            return Err(AdmissionError::NegativeReplicas(replicas));
        }
    }
    if let Some(memory) = &spec.memory_limit {
        check_pattern(&MEMORY_PATTERN, "memoryLimit", memory.as_str())?;
    }
    if let Some(cpu) = &spec.concurrency_limit {
        check_pattern(&CPU_PATTERN, "concurrencyLimit", cpu.as_str())?;
    }
    for volume in &spec.volumes {
        check_pattern(&SIZE_PATTERN, "size", volume.size.as_str())?;
        if !volume.mount_path.starts_with('/') {
            return Err(AdmissionError::RelativeMountPath(volume.mount_path.clone()));
        }
    }
    check_unique_mount_paths(spec)?;
    for preference in &spec.affinity {
        if preference.label_key.is_empty() {
            return Err(AdmissionError::EmptyAffinityLabel);
        }
        if !(1..=100).contains(&preference.weight) {
            return Err(AdmissionError::AffinityWeight {
                label: preference.label_key.clone(),
                weight: preference.weight,
            });
        }
    }
    Ok(())
}

fn check_pattern(pattern: &Regex, field: &'static str, value: &str) -> Result<(), AdmissionError> {
    if pattern.is_match(value) {
        Ok(())
    } else {
        Err(AdmissionError::Quantity {
            field,
            value: value.to_string(),
        })
    }
}
