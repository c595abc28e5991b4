//! Package assembly and streaming.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::vec;

use tracing::debug;

use crate::artifact::{ArtifactData, DeploymentSnapshot};
use crate::diff::{diff, ArtifactDelta, DeltaKind};
use crate::error::{DeployError, DeployResult};
use crate::source::ArtifactSource;

/// Diff engine tuning. Swapped as a whole when settings change.
#[derive(Debug, Clone)]
pub struct DiffConfig {
    /// Maximum number of package streams open at once.
    pub max_concurrent: usize,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self { max_concurrent: 8 }
    }
}

impl DiffConfig {
    /// Sets the concurrent stream limit.
    #[must_use]
    pub fn with_max_concurrent(mut self, limit: usize) -> Self {
        self.max_concurrent = limit;
        self
    }
}

/// Builds deployment packages by comparing snapshots.
///
/// The engine bounds how many [`PackageStream`]s may be open at once;
/// past the limit [`DeployError::Overloaded`] is returned and the caller
/// is expected to retry later. A stream releases its slot when dropped.
///
/// # Thread Safety
///
/// The engine is `Send + Sync`; clones share the same stream budget.
#[derive(Debug, Clone)]
pub struct DiffEngine {
    config: DiffConfig,
    active: Arc<AtomicUsize>,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new(DiffConfig::default())
    }
}

impl DiffEngine {
    /// Creates an engine with the given configuration.
    #[must_use]
    pub fn new(config: DiffConfig) -> Self {
        Self {
            config,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of streams currently open.
    #[must_use]
    pub fn active_streams(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Builds a full package installing `to` from scratch.
    ///
    /// Every artifact in the snapshot is included with its content.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Overloaded`] when the stream limit is
    /// reached. The error is retryable.
    pub fn full_package(
        &self,
        to: &DeploymentSnapshot,
        source: Arc<dyn ArtifactSource>,
    ) -> DeployResult<PackageStream> {
        let permit = self.acquire()?;
        let entries = diff(None, to);
        debug!(version = %to.version, artifacts = entries.len(), "built full package");
        Ok(PackageStream::new(to.version.clone(), false, entries, source, permit))
    }

    /// Builds a fix package upgrading `from` to `to`.
    ///
    /// Unchanged artifacts are omitted. Removed artifacts appear as
    /// descriptor-only entries carrying no content, which the device uses
    /// to uninstall.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Overloaded`] when the stream limit is
    /// reached. The error is retryable.
    pub fn fix_package(
        &self,
        from: &DeploymentSnapshot,
        to: &DeploymentSnapshot,
        source: Arc<dyn ArtifactSource>,
    ) -> DeployResult<PackageStream> {
        let permit = self.acquire()?;
        let entries: Vec<ArtifactDelta> = diff(Some(from), to)
            .into_iter()
            .filter(|delta| delta.kind != DeltaKind::Unchanged)
            .collect();
        debug!(
            from = %from.version,
            to = %to.version,
            entries = entries.len(),
            "built fix package"
        );
        Ok(PackageStream::new(to.version.clone(), true, entries, source, permit))
    }

    fn acquire(&self) -> DeployResult<StreamPermit> {
        let limit = self.config.max_concurrent;
        let mut current = self.active.load(Ordering::Acquire);
        loop {
            if current >= limit {
                return Err(DeployError::Overloaded {
                    active: current,
                    limit,
                });
            }
            match self.active.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Ok(StreamPermit {
                        active: Arc::clone(&self.active),
                    })
                }
                Err(observed) => current = observed,
            }
        }
    }
}

/// Holds one slot of the engine's stream budget until dropped.
#[derive(Debug)]
struct StreamPermit {
    active: Arc<AtomicUsize>,
}

impl Drop for StreamPermit {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}

/// One artifact of a package, with content when the device needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    /// The artifact descriptor.
    pub artifact: ArtifactData,
    /// The change classification that put the artifact in the package.
    pub kind: DeltaKind,
    /// Artifact content. `None` for removal entries.
    pub bytes: Option<Vec<u8>>,
}

/// Lazily yields the entries of one deployment package.
///
/// Content is fetched from the [`ArtifactSource`] as entries are pulled,
/// so a consumer that aborts early never pays for the rest. A fetch
/// failure surfaces as an `Err` item; the stream stays usable and later
/// entries can still be consumed.
pub struct PackageStream {
    version: String,
    is_fix: bool,
    entries: vec::IntoIter<ArtifactDelta>,
    source: Arc<dyn ArtifactSource>,
    _permit: StreamPermit,
}

impl fmt::Debug for PackageStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `source` is a trait object without a `Debug` bound.
        f.debug_struct("PackageStream")
            .field("version", &self.version)
            .field("is_fix", &self.is_fix)
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl PackageStream {
    fn new(
        version: String,
        is_fix: bool,
        entries: Vec<ArtifactDelta>,
        source: Arc<dyn ArtifactSource>,
        permit: StreamPermit,
    ) -> Self {
        Self {
            version,
            is_fix,
            entries: entries.into_iter(),
            source,
            _permit: permit,
        }
    }

    /// Target snapshot version this package installs.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Whether this is a fix package rather than a full one.
    #[must_use]
    pub fn is_fix(&self) -> bool {
        self.is_fix
    }

    /// Entries not yet yielded.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.entries.len()
    }
}

impl Iterator for PackageStream {
    type Item = DeployResult<PackageEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let delta = self.entries.next()?;
        let bytes = match delta.kind {
            DeltaKind::Removed => None,
            _ => match self.source.fetch(&delta.artifact) {
                Ok(bytes) => Some(bytes),
                Err(err) => return Some(Err(err)),
            },
        };
        Some(Ok(PackageEntry {
            artifact: delta.artifact,
            kind: delta.kind,
            bytes,
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}
