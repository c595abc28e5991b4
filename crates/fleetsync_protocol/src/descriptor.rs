//! Log descriptors: one log's identity plus the ids it holds.

use std::fmt;
use std::str::FromStr;

use crate::error::{ProtocolError, ProtocolResult};
use fleetsync_rangeset::RangeSet;

/// What one side knows about one log: its id and the event ids held.
///
/// The wire form is a single line, `<log_id>,<canonical ranges>` — the
/// ranges are the whole tail after the first comma (the canonical range
/// text itself contains commas). An empty log renders with a trailing
/// comma: `"4711,"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDescriptor {
    /// The log being described.
    pub log_id: u64,
    /// Event ids held for that log.
    pub ranges: RangeSet,
}

impl LogDescriptor {
    /// Pairs a log id with its held ranges.
    #[must_use]
    pub fn new(log_id: u64, ranges: RangeSet) -> Self {
        Self { log_id, ranges }
    }

    /// Descriptor of a log with no events.
    #[must_use]
    pub fn empty(log_id: u64) -> Self {
        Self::new(log_id, RangeSet::new())
    }

    /// Parses one descriptor line.
    ///
    /// # Errors
    ///
    /// [`ProtocolError`] when the line has no separator, a non-numeric log
    /// id, or a malformed range set.
    pub fn parse_line(line: &str) -> ProtocolResult<Self> {
        let (id, ranges) = line
            .split_once(',')
            .ok_or_else(|| ProtocolError::format("descriptor line has no separator"))?;
        let log_id = id.parse().map_err(|_| {
            ProtocolError::format(format!("invalid log id in descriptor: {id:?}"))
        })?;
        Ok(Self::new(log_id, RangeSet::parse(ranges)?))
    }

    /// Parses a newline-separated descriptor document; blank lines are
    /// skipped.
    ///
    /// # Errors
    ///
    /// [`ProtocolError`] on the first malformed line.
    pub fn parse_document(text: &str) -> ProtocolResult<Vec<Self>> {
        text.lines()
            .filter(|line| !line.is_empty())
            .map(Self::parse_line)
            .collect()
    }

    /// Renders descriptors as a document, one line each.
    #[must_use]
    pub fn render_document(descriptors: &[Self]) -> String {
        let mut out = String::new();
        for descriptor in descriptors {
            out.push_str(&descriptor.to_string());
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for LogDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.log_id, self.ranges)
    }
}

impl FromStr for LogDescriptor {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_line(s)
    }
}
