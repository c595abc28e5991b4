//! Ranges command implementation.

use fleetsync_log::decode_event;
use fleetsync_protocol::{delta, LogDescriptor};
use fleetsync_rangeset::RangeSet;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Range listing result.
#[derive(Debug, Serialize)]
pub struct RangesResult {
    /// Store path.
    pub path: String,
    /// Peer store path (when comparing).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer: Option<String>,
    /// Repository versions held, canonical range form (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_versions: Option<String>,
    /// Per-log held ranges.
    pub logs: Vec<LogRanges>,
}

/// One log's held range, with the transfer plan against a peer.
#[derive(Debug, Serialize)]
pub struct LogRanges {
    /// Log id.
    pub log_id: u64,
    /// Event ids this store holds, canonical range form.
    pub held: String,
    /// Event ids the peer holds that this store is missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<String>,
    /// Event ids this store holds that the peer is missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_missing: Option<String>,
}

/// Runs the ranges command.
pub fn run(
    path: &Path,
    peer: Option<&Path>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let held = scan_store(path)?;
    let peer_held = peer.map(scan_store).transpose()?;

    let mut result = RangesResult {
        path: path.display().to_string(),
        peer: peer.map(|p| p.display().to_string()),
        repository_versions: scan_repository(path)?,
        logs: Vec::new(),
    };

    match &peer_held {
        Some(peer_held) => {
            // The transfer plans, computed by the same diff a sync runs.
            let missing = by_log_id(delta(&held, peer_held));
            let peer_missing = by_log_id(delta(peer_held, &held));
            let mine = by_log_id(held);

            // Walk the union of log ids so logs only the peer holds still
            // show up.
            let mut log_ids: Vec<u64> = mine.keys().copied().collect();
            log_ids.extend(peer_held.iter().map(|d| d.log_id));
            log_ids.sort_unstable();
            log_ids.dedup();

            for log_id in log_ids {
                result.logs.push(LogRanges {
                    log_id,
                    held: render(mine.get(&log_id)),
                    missing: Some(render(missing.get(&log_id))),
                    peer_missing: Some(render(peer_missing.get(&log_id))),
                });
            }
        }
        None => {
            for descriptor in held {
                result.logs.push(LogRanges {
                    log_id: descriptor.log_id,
                    held: descriptor.ranges.to_string(),
                    missing: None,
                    peer_missing: None,
                });
            }
        }
    }

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

/// Collects each log's descriptor by decoding its file, stopping at the
/// first line that does not decode. Ascending by log id.
fn scan_store(path: &Path) -> Result<Vec<LogDescriptor>, Box<dyn std::error::Error>> {
    let logs_dir = path.join("logs");
    let mut descriptors = Vec::new();
    if !logs_dir.is_dir() {
        return Ok(descriptors);
    }

    for entry in fs::read_dir(&logs_dir)? {
        let file_path = entry?.path();
        if file_path.extension().and_then(|e| e.to_str()) != Some("log") {
            continue;
        }
        let Some(stem) = file_path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Ok(log_id) = u64::from_str_radix(stem, 16) else {
            continue;
        };

        let mut ids = RangeSet::new();
        for line in fs::read_to_string(&file_path)?.lines() {
            let Ok(event) = decode_event(line) else {
                break;
            };
            ids.add(event.event_id);
        }
        descriptors.push(LogDescriptor::new(log_id, ids));
    }

    descriptors.sort_by_key(|descriptor| descriptor.log_id);
    debug!(path = %path.display(), logs = descriptors.len(), "scanned store");
    Ok(descriptors)
}

/// The versions a repository directory holds, if one is present.
fn scan_repository(path: &Path) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let versions_dir = path.join("versions");
    if !versions_dir.is_dir() {
        return Ok(None);
    }

    let mut versions = RangeSet::new();
    for entry in fs::read_dir(&versions_dir)? {
        let blob_path = entry?.path();
        if blob_path.extension().and_then(|e| e.to_str()) != Some("dat") {
            continue;
        }
        if let Some(version) = blob_path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<u64>().ok())
        {
            versions.add(version);
        }
    }
    Ok(Some(versions.to_string()))
}

fn by_log_id(descriptors: Vec<LogDescriptor>) -> BTreeMap<u64, RangeSet> {
    descriptors
        .into_iter()
        .map(|descriptor| (descriptor.log_id, descriptor.ranges))
        .collect()
}

fn render(ranges: Option<&RangeSet>) -> String {
    ranges.map(RangeSet::to_string).unwrap_or_default()
}

fn print_text_output(result: &RangesResult) {
    println!("Event Id Ranges");
    println!("===============");
    println!();
    println!("Path: {}", result.path);
    if let Some(peer) = &result.peer {
        println!("Peer: {}", peer);
    }
    if let Some(versions) = &result.repository_versions {
        println!();
        println!(
            "Repository versions: {}",
            if versions.is_empty() {
                "(none)"
            } else {
                versions.as_str()
            }
        );
    }
    println!();

    for log in &result.logs {
        println!(
            "[{}] held {}",
            log.log_id,
            if log.held.is_empty() {
                "(none)"
            } else {
                log.held.as_str()
            }
        );
        if let Some(missing) = &log.missing {
            if !missing.is_empty() {
                println!("      missing {}", missing);
            }
        }
        if let Some(peer_missing) = &log.peer_missing {
            if !peer_missing.is_empty() {
                println!("      peer missing {}", peer_missing);
            }
        }
    }

    if result.logs.is_empty() {
        println!("(no logs)");
    }
}
