//! Deployment package diffing for Fleetsync.
//!
//! A device runs the software described by a [`DeploymentSnapshot`]: an
//! ordered set of [`ArtifactData`] descriptors plus a version string.
//! Shipping a whole snapshot to every device on every change would drown
//! slow links, so the [`DiffEngine`] compares the snapshot a device *has*
//! with the one it *should* have and emits either a **full package** (every
//! artifact) or a **fix package** (only what changed, plus explicit removal
//! markers for artifacts that disappeared).
//!
//! Package content is produced lazily by a single-pass [`PackageStream`].
//! The engine bounds how many streams may be in flight at once and reports
//! [`DeployError::Overloaded`] when the limit is reached, a transient
//! condition the caller retries rather than a real failure.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod artifact;
mod diff;
mod engine;
mod error;
mod provider;
mod source;

pub use artifact::{ArtifactData, ArtifactKey, DeploymentSnapshot};
pub use diff::{diff, ArtifactDelta, DeltaKind};
pub use engine::{DiffConfig, DiffEngine, PackageEntry, PackageStream};
pub use error::{DeployError, DeployResult};
pub use provider::{MemorySnapshotProvider, SnapshotProvider};
pub use source::{ArtifactSource, MemoryArtifactSource};
