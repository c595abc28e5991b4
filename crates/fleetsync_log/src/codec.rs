//! Single-line event encoding with `$` escaping.
//!
//! An event travels (and is stored) as one line: the comma-join of its
//! escaped fields, header first, then the property map positionally:
//!
//! ```text
//! log_id,event_id,type,timestamp,key1,value1,key2,value2,...
//! ```
//!
//! The escaping keeps every field free of the separator characters:
//! `$` → `$$`, `,` → `$k`, LF → `$n`, CR → `$r`. Decoding is strict — any
//! other character after `$`, or a trailing `$`, is a format error, as is a
//! header that is not numeric or a property tail with an odd field count.

use crate::error::{LogError, LogResult};
use crate::event::{EventProperties, EventType, LogEvent};

/// Escapes one field for embedding in a comma-separated line.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '$' => out.push_str("$$"),
            ',' => out.push_str("$k"),
            '\n' => out.push_str("$n"),
            '\r' => out.push_str("$r"),
            _ => out.push(ch),
        }
    }
    out
}

/// Reverses [`escape`].
///
/// # Errors
///
/// [`LogError::Format`] on an unknown escape sequence or a trailing `$`.
pub fn unescape(text: &str) -> LogResult<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '$' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('$') => out.push('$'),
            Some('k') => out.push(','),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => {
                return Err(LogError::format(format!(
                    "invalid escape sequence `${other}`"
                )))
            }
            None => return Err(LogError::format("trailing unescaped `$`")),
        }
    }
    Ok(out)
}

/// Encodes an event as its single-line form (no trailing newline).
#[must_use]
pub fn encode_event(event: &LogEvent) -> String {
    let mut fields = vec![
        event.log_id.to_string(),
        event.event_id.to_string(),
        event.event_type.code().to_string(),
        event.timestamp_ms.to_string(),
    ];
    for (key, value) in event.properties.iter() {
        fields.push(escape(key));
        fields.push(escape(value));
    }
    fields.join(",")
}

/// Decodes one event line.
///
/// # Errors
///
/// [`LogError::Format`] on bad escapes, a short or non-numeric header, or
/// an odd number of property fields.
pub fn decode_event(line: &str) -> LogResult<LogEvent> {
    let fields = line
        .split(',')
        .map(unescape)
        .collect::<LogResult<Vec<String>>>()?;
    if fields.len() < 4 {
        return Err(LogError::format(format!(
            "event line has {} fields, expected at least 4",
            fields.len()
        )));
    }
    if (fields.len() - 4) % 2 != 0 {
        return Err(LogError::format(
            "event line has an odd number of property fields",
        ));
    }

    let log_id = numeric_field(&fields[0], "log id")?;
    let event_id = numeric_field(&fields[1], "event id")?;
    let type_code = numeric_field(&fields[2], "event type")?;
    let type_code = u32::try_from(type_code)
        .map_err(|_| LogError::format(format!("event type {type_code} out of range")))?;
    let timestamp_ms = numeric_field(&fields[3], "timestamp")?;

    let mut properties = EventProperties::new();
    for pair in fields[4..].chunks(2) {
        properties.insert(pair[0].clone(), pair[1].clone());
    }

    Ok(LogEvent::new(
        log_id,
        event_id,
        EventType::new(type_code),
        timestamp_ms,
        properties,
    ))
}

fn numeric_field(value: &str, name: &str) -> LogResult<u64> {
    value
        .parse()
        .map_err(|_| LogError::format(format!("invalid {name} in event line: {value:?}")))
}
