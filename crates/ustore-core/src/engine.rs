//! Database engine types and the static image table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Image used by every community engine.
pub const COMMUNITY_IMAGE: &str = "quay.io/gurgen_yegoryan/ustore:0.12.1";

/// Image used by the enterprise disk engine.
pub const ENTERPRISE_IMAGE: &str = "ghcr.io/gurgenyegoryan/udisk:0.1.0";

/// Pull secret required to fetch [`ENTERPRISE_IMAGE`].
pub const ENTERPRISE_PULL_SECRET: &str = "ghcrio";

/// Supported database engines. Immutable for the lifetime of a workload once set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineType {
    Leveldb,
    Rocksdb,
    Udisk,
    Umem,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("unsupported engine type: {0}")]
    Unsupported(String),
}

/// Container image selection for one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineProfile {
    pub engine: EngineType,
    pub image: &'static str,
    /// Image pull secret the pod must reference, if any.
    pub pull_secret: Option<&'static str>,
}

impl EngineProfile {
    pub fn requires_pull_secret(&self) -> bool {
        self.pull_secret.is_some()
    }
}

/// One entry per engine, indexed in declaration order of [`EngineType`].
static ENGINE_TABLE: [EngineProfile; 4] = [
    EngineProfile {
        engine: EngineType::Leveldb,
        image: COMMUNITY_IMAGE,
        pull_secret: None,
    },
    EngineProfile {
        engine: EngineType::Rocksdb,
        image: COMMUNITY_IMAGE,
        pull_secret: None,
    },
    EngineProfile {
        engine: EngineType::Udisk,
        image: ENTERPRISE_IMAGE,
        pull_secret: Some(ENTERPRISE_PULL_SECRET),
    },
    EngineProfile {
        engine: EngineType::Umem,
        image: COMMUNITY_IMAGE,
        pull_secret: None,
    },
];

impl EngineType {
    pub const ALL: [EngineType; 4] = [
        EngineType::Leveldb,
        EngineType::Rocksdb,
        EngineType::Udisk,
        EngineType::Umem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineType::Leveldb => "leveldb",
            EngineType::Rocksdb => "rocksdb",
            EngineType::Udisk => "udisk",
            EngineType::Umem => "umem",
        }
    }

    /// Image and pull-secret requirements for this engine.
    pub fn profile(&self) -> &'static EngineProfile {
        &ENGINE_TABLE[*self as usize]
    }

    /// Relative path of the server binary inside the image, e.g. `./umem_server`.
    pub fn server_binary(&self) -> String {
        format!("./{}_server", self.as_str())
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EngineType::ALL
            .into_iter()
            .find(|engine| engine.as_str() == s)
            .ok_or_else(|| EngineError::Unsupported(s.to_string()))
    }
}
