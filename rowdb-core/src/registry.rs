//! Schema registry: maps a schema version
//! number to the `RowInfo` that was current when a value was encoded with
//! it, so a later decode with a newer `RowInfo` can apply the defaulting
//! rules in [`crate::encode::decode_value`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Error;
use crate::schema::RowInfo;

pub trait SchemaRegistry: Send + Sync {
    /// The version new writes should be encoded with.
    fn current_version(&self) -> u32;
    /// The `RowInfo` a value tagged with `version` was encoded against.
    fn row_info_for_version(&self, version: u32) -> Result<Arc<RowInfo>, Error>;
}

/// An in-process registry backed by a map from version to `RowInfo`,
/// guarded the way `rowdb_core::schema`'s own cache is: a `parking_lot`
/// lock rather than an unsynchronized global, so tests can register
/// several versions of the same logical type without process-wide state
/// bleeding between them.
#[derive(Default)]
pub struct VersionedRegistry {
    versions: RwLock<HashMap<u32, Arc<RowInfo>>>,
    current: RwLock<u32>,
}

impl VersionedRegistry {
    pub fn new(initial_version: u32, initial_info: Arc<RowInfo>) -> Self {
        let mut versions = HashMap::new();
        versions.insert(initial_version, initial_info);
        Self {
            versions: RwLock::new(versions),
            current: RwLock::new(initial_version),
        }
    }

    /// Register `info` as the schema in effect for `version`, and make it
    /// the version new writes use.
    pub fn evolve(&self, version: u32, info: Arc<RowInfo>) {
        self.versions.write().insert(version, info);
        *self.current.write() = version;
    }
}

impl SchemaRegistry for VersionedRegistry {
    fn current_version(&self) -> u32 {
        *self.current.read()
    }

    fn row_info_for_version(&self, version: u32) -> Result<Arc<RowInfo>, Error> {
        self.versions
            .read()
            .get(&version)
            .cloned()
            .ok_or_else(|| Error::ConcurrentSchemaChange(format!("unknown schema version {version}")))
    }
}
