//! Artifact descriptors and deployment snapshots.

use std::cmp::Ordering;

/// Describes one artifact belonging to a deployment snapshot.
///
/// Bundles carry a `symbolic_name`/`version` pair; plain resource
/// artifacts (configuration files and the like) are identified by filename
/// and handled on the device by the resource processor named in
/// `processor_pid`. `digest` is an optional content fingerprint, consulted
/// by the diff when versions are absent.
///
/// `has_changed` is not an intrinsic property: the diff engine sets it
/// relative to the baseline snapshot a comparison was made against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactData {
    /// Filename within the package.
    pub filename: String,
    /// Bundle symbolic name, if the artifact is a bundle.
    pub symbolic_name: Option<String>,
    /// Artifact version, if versioned.
    pub version: Option<String>,
    /// Whether this artifact is an executable bundle.
    pub is_bundle: bool,
    /// Resource processor responsible for installing a non-bundle artifact.
    pub processor_pid: Option<String>,
    /// Optional content fingerprint.
    pub digest: Option<String>,
    /// Set by the diff engine: changed relative to the comparison baseline.
    pub has_changed: bool,
}

impl ArtifactData {
    /// Creates a plain (non-bundle) artifact descriptor.
    #[must_use]
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            symbolic_name: None,
            version: None,
            is_bundle: false,
            processor_pid: None,
            digest: None,
            has_changed: false,
        }
    }

    /// Creates a bundle descriptor with symbolic name and version.
    #[must_use]
    pub fn bundle(
        filename: impl Into<String>,
        symbolic_name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            symbolic_name: Some(symbolic_name.into()),
            version: Some(version.into()),
            is_bundle: true,
            processor_pid: None,
            digest: None,
            has_changed: false,
        }
    }

    /// Sets the version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets the resource processor PID.
    #[must_use]
    pub fn with_processor_pid(mut self, pid: impl Into<String>) -> Self {
        self.processor_pid = Some(pid.into());
        self
    }

    /// Sets the content digest.
    #[must_use]
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }

    /// The identity under which snapshots are compared.
    #[must_use]
    pub fn key(&self) -> ArtifactKey {
        ArtifactKey {
            symbolic_name: self.symbolic_name.clone(),
            filename: self.filename.clone(),
        }
    }
}

/// Identity of an artifact across snapshots: `(symbolic_name, filename)`.
///
/// Ordering is the deterministic emission order of packages: by symbolic
/// name first (artifacts without one sort after those with one), ties
/// broken by filename. Resource processors apply artifacts in sequence and
/// rely on this being stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    /// Bundle symbolic name, when present.
    pub symbolic_name: Option<String>,
    /// Filename within the package.
    pub filename: String,
}

impl Ord for ArtifactKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.symbolic_name, &other.symbolic_name) {
            (Some(a), Some(b)) => a.cmp(b).then_with(|| self.filename.cmp(&other.filename)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.filename.cmp(&other.filename),
        }
    }
}

impl PartialOrd for ArtifactKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One target's intended software set at one version.
///
/// Snapshots for a target are totally ordered by lexical comparison of
/// `version`; providers sort with plain string ordering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeploymentSnapshot {
    /// Snapshot version identifier.
    pub version: String,
    /// Artifacts making up the snapshot.
    pub artifacts: Vec<ArtifactData>,
}

impl DeploymentSnapshot {
    /// Creates an empty snapshot at `version`.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            artifacts: Vec::new(),
        }
    }

    /// Builder-style artifact append.
    #[must_use]
    pub fn with_artifact(mut self, artifact: ArtifactData) -> Self {
        self.artifacts.push(artifact);
        self
    }

    /// Number of artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Whether the snapshot has no artifacts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}
