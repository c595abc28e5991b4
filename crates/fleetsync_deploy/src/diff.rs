//! Snapshot comparison.

use std::collections::BTreeMap;

use crate::artifact::{ArtifactData, DeploymentSnapshot};

/// How an artifact moved between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaKind {
    /// Present in the target snapshot only.
    Added,
    /// Present in both, with different content.
    Updated,
    /// Present in both, with provably identical content.
    Unchanged,
    /// Present in the baseline snapshot only.
    Removed,
}

impl std::fmt::Display for DeltaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DeltaKind::Added => "added",
            DeltaKind::Updated => "updated",
            DeltaKind::Unchanged => "unchanged",
            DeltaKind::Removed => "removed",
        };
        f.write_str(label)
    }
}

/// One artifact's classification relative to a baseline.
///
/// For `Removed` the embedded descriptor is the baseline's copy; for every
/// other kind it is the target snapshot's copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDelta {
    /// The artifact descriptor, `has_changed` already set from `kind`.
    pub artifact: ArtifactData,
    /// The change classification.
    pub kind: DeltaKind,
}

impl ArtifactDelta {
    /// Whether the device must act on this entry.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        !matches!(self.kind, DeltaKind::Unchanged)
    }
}

/// Compares a target snapshot against an optional baseline.
///
/// With no baseline every artifact is `Added`. Output order is
/// deterministic: sorted by artifact key (symbolic name, then filename,
/// unnamed artifacts last), independent of insertion order in either
/// snapshot.
///
/// Two artifacts under the same key count as unchanged only when that is
/// provable: equal versions when both carry one, otherwise equal digests
/// when both carry one. When neither is comparable the artifact is
/// classified `Updated`, which errs toward re-transferring content.
#[must_use]
pub fn diff(from: Option<&DeploymentSnapshot>, to: &DeploymentSnapshot) -> Vec<ArtifactDelta> {
    let mut deltas = BTreeMap::new();

    for artifact in &to.artifacts {
        let key = artifact.key();
        let kind = match from.and_then(|snapshot| {
            snapshot.artifacts.iter().find(|candidate| candidate.key() == key)
        }) {
            None => DeltaKind::Added,
            Some(baseline) if same_content(baseline, artifact) => DeltaKind::Unchanged,
            Some(_) => DeltaKind::Updated,
        };
        let mut artifact = artifact.clone();
        artifact.has_changed = !matches!(kind, DeltaKind::Unchanged);
        deltas.insert(key, ArtifactDelta { artifact, kind });
    }

    if let Some(snapshot) = from {
        for artifact in &snapshot.artifacts {
            let key = artifact.key();
            if deltas.contains_key(&key) {
                continue;
            }
            let mut artifact = artifact.clone();
            artifact.has_changed = true;
            deltas.insert(
                key,
                ArtifactDelta {
                    artifact,
                    kind: DeltaKind::Removed,
                },
            );
        }
    }

    deltas.into_values().collect()
}

fn same_content(a: &ArtifactData, b: &ArtifactData) -> bool {
    match (&a.version, &b.version) {
        (Some(va), Some(vb)) => va == vb,
        _ => match (&a.digest, &b.digest) {
            (Some(da), Some(db)) => da == db,
            _ => false,
        },
    }
}
