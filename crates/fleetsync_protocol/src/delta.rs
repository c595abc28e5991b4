//! The diff plan at the heart of the protocol.

use std::collections::HashMap;

use crate::descriptor::LogDescriptor;
use fleetsync_rangeset::RangeSet;

/// Computes what to fetch: per log, the event ids `remote` holds that
/// `local` lacks.
///
/// Logs the remote doesn't mention produce nothing (there is nothing to
/// fetch from it), and logs where nothing is missing are omitted entirely,
/// so an empty result *is* the fixed-point test. The result is ascending
/// by log id.
///
/// Cost is linear in the total number of ranges — the whole point of
/// describing logs as range sets instead of id lists.
#[must_use]
pub fn delta(local: &[LogDescriptor], remote: &[LogDescriptor]) -> Vec<LogDescriptor> {
    let local_by_id: HashMap<u64, &RangeSet> = local
        .iter()
        .map(|descriptor| (descriptor.log_id, &descriptor.ranges))
        .collect();

    let mut missing: Vec<LogDescriptor> = remote
        .iter()
        .filter_map(|peer| {
            let wanted = match local_by_id.get(&peer.log_id) {
                Some(mine) => peer.ranges.difference(mine),
                None => peer.ranges.clone(),
            };
            (!wanted.is_empty()).then(|| LogDescriptor::new(peer.log_id, wanted))
        })
        .collect();
    missing.sort_by_key(|descriptor| descriptor.log_id);
    missing
}
