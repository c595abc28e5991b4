//! Inspect command implementation.

use fleetsync_log::decode_event;
use fleetsync_rangeset::RangeSet;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store path.
    pub path: String,
    /// Versioned repository statistics (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<RepositoryStats>,
    /// Event log store statistics (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<LogStoreStats>,
}

/// Statistics for a versioned repository directory.
#[derive(Debug, Serialize)]
pub struct RepositoryStats {
    /// Head version from the HEAD file.
    pub head: u64,
    /// Versions held, canonical range form.
    pub versions: String,
    /// Number of version blobs.
    pub version_count: u64,
    /// Total blob size in bytes.
    pub data_size: u64,
}

/// Statistics for an event log store directory.
#[derive(Debug, Serialize)]
pub struct LogStoreStats {
    /// Number of logs.
    pub log_count: usize,
    /// Total number of events across all logs.
    pub event_count: u64,
    /// Total log file size in bytes.
    pub data_size: u64,
    /// Per-log statistics (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Vec<LogStats>>,
}

/// Statistics for a single event log.
#[derive(Debug, Serialize)]
pub struct LogStats {
    /// Log id.
    pub log_id: u64,
    /// Number of events.
    pub event_count: u64,
    /// Event ids held, canonical range form.
    pub ids: String,
    /// Log file size in bytes.
    pub size: u64,
}

/// Runs the inspect command.
pub fn run(path: &Path, show_logs: bool, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let head_path = path.join("HEAD");
    let versions_dir = path.join("versions");
    let logs_dir = path.join("logs");

    // Check if a store layout exists
    if !head_path.exists() && !versions_dir.is_dir() && !logs_dir.is_dir() {
        return Err(format!("No store found at {:?}", path).into());
    }

    let mut result = InspectResult {
        path: path.display().to_string(),
        repository: None,
        logs: None,
    };

    // Get repository stats
    if head_path.exists() || versions_dir.is_dir() {
        let head = read_head(&head_path)?;
        let mut versions = RangeSet::new();
        let mut data_size = 0u64;
        if versions_dir.is_dir() {
            for entry in fs::read_dir(&versions_dir)? {
                let entry = entry?;
                if let Some(version) = blob_version(&entry.path()) {
                    versions.add(version);
                    data_size += entry.metadata()?.len();
                }
            }
        }
        result.repository = Some(RepositoryStats {
            head,
            version_count: versions.count(),
            versions: versions.to_string(),
            data_size,
        });
    }

    // Get event log stats
    if logs_dir.is_dir() {
        let mut stats = LogStoreStats {
            log_count: 0,
            event_count: 0,
            data_size: 0,
            detail: None,
        };
        let mut detail = Vec::new();

        for (log_id, file_path) in list_log_files(&logs_dir)? {
            let size = fs::metadata(&file_path)?.len();
            let ids = scan_log_ids(&file_path);
            stats.log_count += 1;
            stats.event_count += ids.count();
            stats.data_size += size;
            if show_logs {
                detail.push(LogStats {
                    log_id,
                    event_count: ids.count(),
                    ids: ids.to_string(),
                    size,
                });
            }
        }
        if show_logs {
            stats.detail = Some(detail);
        }
        result.logs = Some(stats);
    }

    // Output
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

/// Reads the HEAD file; absent means an empty repository.
fn read_head(path: &Path) -> Result<u64, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Ok(0);
    }
    let text = fs::read_to_string(path)?;
    let text = text.trim();
    text.parse::<u64>()
        .map_err(|_| format!("HEAD is not a version number: {:?}", text).into())
}

/// Parses `0000000000000001.dat` into `Some(1)`.
fn blob_version(path: &Path) -> Option<u64> {
    if path.extension().and_then(|e| e.to_str()) != Some("dat") {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

/// Lists `{log_id:016x}.log` files, ascending by id.
fn list_log_files(logs_dir: &Path) -> Result<Vec<(u64, std::path::PathBuf)>, std::io::Error> {
    let mut files = Vec::new();
    for entry in fs::read_dir(logs_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("log") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if let Ok(log_id) = u64::from_str_radix(stem, 16) {
            files.push((log_id, path));
        }
    }
    files.sort_by_key(|(log_id, _)| *log_id);
    Ok(files)
}

/// Collects the event ids of one log file, stopping at the first line that
/// does not decode (a torn tail or corruption; `verify` reports those).
fn scan_log_ids(path: &Path) -> RangeSet {
    let mut ids = RangeSet::new();
    let Ok(contents) = fs::read_to_string(path) else {
        return ids;
    };
    for line in contents.lines() {
        match decode_event(line) {
            Ok(event) => ids.add(event.event_id),
            Err(_) => break,
        }
    }
    ids
}

fn print_text_output(result: &InspectResult) {
    println!("Fleetsync Store Inspection");
    println!("==========================");
    println!();
    println!("Path: {}", result.path);

    if let Some(repository) = &result.repository {
        println!();
        println!("Repository:");
        println!("  Head version:  {}", repository.head);
        println!(
            "  Versions held: {}",
            if repository.versions.is_empty() {
                "(none)"
            } else {
                repository.versions.as_str()
            }
        );
        println!("  Version count: {}", repository.version_count);
        println!("  Data size:     {}", format_size(repository.data_size));
    }

    if let Some(logs) = &result.logs {
        println!();
        println!("Event logs:");
        println!("  Logs:      {}", logs.log_count);
        println!("  Events:    {}", logs.event_count);
        println!("  Data size: {}", format_size(logs.data_size));

        if let Some(detail) = &logs.detail {
            println!();
            for log in detail {
                println!(
                    "  [{}] {} events, ids {}, {}",
                    log.log_id,
                    log.event_count,
                    if log.ids.is_empty() {
                        "(none)"
                    } else {
                        log.ids.as_str()
                    },
                    format_size(log.size)
                );
            }
        }
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} bytes", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
