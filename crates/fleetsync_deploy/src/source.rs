//! Artifact content retrieval.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::artifact::{ArtifactData, ArtifactKey};
use crate::error::{DeployError, DeployResult};

/// Supplies artifact bytes to package streams.
///
/// Implementations are looked up lazily, one artifact at a time, as a
/// [`PackageStream`](crate::PackageStream) is consumed. Fetching must be
/// safe from multiple streams at once.
pub trait ArtifactSource: Send + Sync {
    /// Returns the content of `artifact`.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::MissingArtifact`] when the source holds no
    /// content for the artifact, or an I/O error from the backing store.
    fn fetch(&self, artifact: &ArtifactData) -> DeployResult<Vec<u8>>;
}

/// In-memory artifact source, keyed by artifact identity.
#[derive(Debug, Default)]
pub struct MemoryArtifactSource {
    blobs: RwLock<HashMap<ArtifactKey, Vec<u8>>>,
}

impl MemoryArtifactSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores content for `artifact`, replacing any previous content.
    pub fn insert(&self, artifact: &ArtifactData, bytes: impl Into<Vec<u8>>) {
        self.blobs.write().insert(artifact.key(), bytes.into());
    }
}

impl ArtifactSource for MemoryArtifactSource {
    fn fetch(&self, artifact: &ArtifactData) -> DeployResult<Vec<u8>> {
        self.blobs
            .read()
            .get(&artifact.key())
            .cloned()
            .ok_or_else(|| DeployError::MissingArtifact {
                filename: artifact.filename.clone(),
            })
    }
}
