//! Dump log command implementation.

use fleetsync_log::decode_event;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Event record representation for output.
#[derive(Debug, Serialize)]
pub struct EventInfo {
    /// Log id the event belongs to.
    pub log_id: u64,
    /// Event id within the log.
    pub event_id: u64,
    /// Numeric event type code.
    pub code: u32,
    /// Well-known type name (if any).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'static str>,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// Properties as ordered key/value pairs.
    pub properties: Vec<(String, String)>,
}

/// Runs the dump-log command.
pub fn run(
    path: &Path,
    log: Option<u64>,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let logs_dir = path.join("logs");
    if !logs_dir.is_dir() {
        return Err("Logs directory not found".into());
    }

    let mut files = list_log_files(&logs_dir)?;
    if let Some(log_id) = log {
        files.retain(|(id, _)| *id == log_id);
        if files.is_empty() {
            return Err(format!("Log {} not found", log_id).into());
        }
    }

    let events = read_events(&files, limit)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
        _ => {
            print_text_output(&events);
        }
    }

    Ok(())
}

/// Lists `{log_id:016x}.log` files, ascending by id.
fn list_log_files(logs_dir: &Path) -> Result<Vec<(u64, PathBuf)>, std::io::Error> {
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

fn read_events(
    files: &[(u64, PathBuf)],
    limit: Option<usize>,
) -> Result<Vec<EventInfo>, Box<dyn std::error::Error>> {
    let max_events = limit.unwrap_or(usize::MAX);
    let mut events = Vec::new();

    'files: for (_, path) in files {
        let contents = fs::read_to_string(path)?;
        for line in contents.lines() {
            if events.len() >= max_events {
                break 'files;
            }
            // A line that does not decode is a torn tail or corruption;
            // stop at it and move on (`verify` reports the detail).
            let Ok(event) = decode_event(line) else {
                break;
            };
            events.push(EventInfo {
                log_id: event.log_id,
                event_id: event.event_id,
                code: event.event_type.code(),
                name: event.event_type.name(),
                timestamp_ms: event.timestamp_ms,
                properties: event
                    .properties
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            });
        }
    }

    Ok(events)
}

fn print_text_output(events: &[EventInfo]) {
    println!("Event Records ({} total)", events.len());
    println!("=============");
    println!();

    for event in events {
        print!(
            "[{}:{}] {:4}",
            event.log_id, event.event_id, event.code
        );
        if let Some(name) = event.name {
            print!(" {}", name);
        }
        print!(" t={}", event.timestamp_ms);
        for (key, value) in &event.properties {
            print!(" {}={}", key, value);
        }
        println!();
    }
}
