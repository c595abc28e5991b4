//! Diff command implementation.

use fleetsync_deploy::{diff, ArtifactData, DeploymentSnapshot};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A deployment snapshot file: a version string plus artifact entries.
#[derive(Debug, Deserialize)]
struct SnapshotFile {
    version: String,
    #[serde(default)]
    artifacts: Vec<ArtifactEntry>,
}

#[derive(Debug, Deserialize)]
struct ArtifactEntry {
    filename: String,
    #[serde(default)]
    symbolic_name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    is_bundle: bool,
    #[serde(default)]
    processor_pid: Option<String>,
    #[serde(default)]
    digest: Option<String>,
}

/// Snapshot comparison result.
#[derive(Debug, Serialize)]
pub struct DiffResult {
    /// Baseline snapshot version (absent for a full-install view).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Target snapshot version.
    pub to: String,
    /// Number of artifacts a device must act on.
    pub changed: usize,
    /// Per-artifact classification.
    pub deltas: Vec<DeltaInfo>,
}

/// One artifact's change classification.
#[derive(Debug, Serialize)]
pub struct DeltaInfo {
    /// Change kind (added, updated, unchanged, removed).
    pub kind: String,
    /// Artifact filename.
    pub filename: String,
    /// Bundle symbolic name (if any).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbolic_name: Option<String>,
    /// Artifact version (if any).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Resource processor PID (if any).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor_pid: Option<String>,
}

/// Runs the diff command.
pub fn run(
    from: Option<&Path>,
    to: &Path,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let from_snapshot = from.map(load_snapshot).transpose()?;
    let to_snapshot = load_snapshot(to)?;

    let deltas = diff(from_snapshot.as_ref(), &to_snapshot);
    let result = DiffResult {
        from: from_snapshot.map(|s| s.version),
        to: to_snapshot.version.clone(),
        changed: deltas.iter().filter(|d| d.has_changed()).count(),
        deltas: deltas
            .into_iter()
            .map(|delta| DeltaInfo {
                kind: delta.kind.to_string(),
                filename: delta.artifact.filename,
                symbolic_name: delta.artifact.symbolic_name,
                version: delta.artifact.version,
                processor_pid: delta.artifact.processor_pid,
            })
            .collect(),
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn load_snapshot(path: &Path) -> Result<DeploymentSnapshot, Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Cannot read snapshot file {:?}: {}", path, e))?;
    let file: SnapshotFile = serde_json::from_str(&contents)
        .map_err(|e| format!("Malformed snapshot file {:?}: {}", path, e))?;

    let mut snapshot = DeploymentSnapshot::new(file.version);
    for entry in file.artifacts {
        snapshot = snapshot.with_artifact(ArtifactData {
            filename: entry.filename,
            symbolic_name: entry.symbolic_name,
            version: entry.version,
            is_bundle: entry.is_bundle,
            processor_pid: entry.processor_pid,
            digest: entry.digest,
            has_changed: true,
        });
    }
    Ok(snapshot)
}

fn print_text_output(result: &DiffResult) {
    match &result.from {
        Some(from) => println!("Deployment Diff ({} -> {})", from, result.to),
        None => println!("Deployment Diff (install {})", result.to),
    }
    println!("===============");
    println!();

    for delta in &result.deltas {
        print!("  {:10} {}", delta.kind, delta.filename);
        if let Some(name) = &delta.symbolic_name {
            print!("  {}", name);
        }
        if let Some(version) = &delta.version {
            print!("  {}", version);
        }
        if let Some(pid) = &delta.processor_pid {
            print!("  (processor {})", pid);
        }
        println!();
    }

    println!();
    println!(
        "{} of {} artifacts changed",
        result.changed,
        result.deltas.len()
    );
}
