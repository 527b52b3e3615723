//! redb table definitions for the UStore state store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized records),
//! except [`META`] which holds plain counters.

use redb::TableDefinition;

/// Workload records keyed by `{namespace}/{name}`.
pub const WORKLOADS: TableDefinition<&str, &[u8]> = TableDefinition::new("workloads");

/// Dependent objects keyed by `{kind}:{namespace}/{name}`.
pub const OBJECTS: TableDefinition<&str, &[u8]> = TableDefinition::new("objects");

/// Store counters (uid sequence).
pub const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

/// Key in [`META`] holding the last issued uid sequence number.
pub const UID_SEQUENCE: &str = "uid_sequence";
