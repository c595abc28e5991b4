//! Snapshot catalogs.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use crate::artifact::DeploymentSnapshot;
use crate::error::{DeployError, DeployResult};

/// Supplies the deployment snapshots known for each target.
///
/// Listing versions is lenient (an unknown target simply has none, the
/// way a fresh device has no history yet); fetching a concrete snapshot
/// is strict, since building a package against a guessed baseline would
/// silently produce the wrong delta.
pub trait SnapshotProvider: Send + Sync {
    /// Snapshot versions held for `target`, in ascending lexical order.
    /// Empty for an unknown target.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    fn versions(&self, target: &str) -> DeployResult<Vec<String>>;

    /// The snapshot of `target` at exactly `version`.
    ///
    /// # Errors
    ///
    /// [`DeployError::UnknownVersion`] when the target has no snapshot at
    /// that version.
    fn snapshot(&self, target: &str, version: &str) -> DeployResult<DeploymentSnapshot>;
}

/// In-memory snapshot catalog, keyed by target name and version.
#[derive(Debug, Default)]
pub struct MemorySnapshotProvider {
    targets: RwLock<HashMap<String, BTreeMap<String, DeploymentSnapshot>>>,
}

impl MemorySnapshotProvider {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a snapshot under its own version, replacing any earlier
    /// snapshot of that target at the same version.
    pub fn insert(&self, target: impl Into<String>, snapshot: DeploymentSnapshot) {
        self.targets
            .write()
            .entry(target.into())
            .or_default()
            .insert(snapshot.version.clone(), snapshot);
    }
}

impl SnapshotProvider for MemorySnapshotProvider {
    fn versions(&self, target: &str) -> DeployResult<Vec<String>> {
        Ok(self
            .targets
            .read()
            .get(target)
            .map(|by_version| by_version.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn snapshot(&self, target: &str, version: &str) -> DeployResult<DeploymentSnapshot> {
        self.targets
            .read()
            .get(target)
            .and_then(|by_version| by_version.get(version))
            .cloned()
            .ok_or_else(|| DeployError::UnknownVersion {
                target: target.to_string(),
                version: version.to_string(),
            })
    }
}
