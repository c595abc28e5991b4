//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data
//! that maintains required invariants.

use fleetsync_deploy::{ArtifactData, DeploymentSnapshot};
use fleetsync_log::{EventProperties, EventType, LogEvent};
use fleetsync_rangeset::RangeSet;
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Strategy for generating range sets.
///
/// Built from a set of distinct ids, so every generated value is already
/// in canonical form (sorted, merged, non-adjacent ranges).
pub fn range_set_strategy() -> impl Strategy<Value = RangeSet> {
    prop::collection::btree_set(1..10_000u64, 0..48)
        .prop_map(|ids| ids.into_iter().collect::<RangeSet>())
}

/// Strategy for generating canonical range-set text like `"1-5,7,9-12"`.
pub fn range_set_text_strategy() -> impl Strategy<Value = String> {
    range_set_strategy().prop_map(|set| set.to_string())
}

/// Strategy for generating event types: the well-known codes, weighted
/// toward them, plus arbitrary custom codes.
pub fn event_type_strategy() -> impl Strategy<Value = EventType> {
    prop_oneof![
        4 => prop::sample::select(vec![
            EventType::FRAMEWORK_STARTED,
            EventType::FRAMEWORK_STOPPED,
            EventType::BUNDLE_INSTALLED,
            EventType::BUNDLE_STARTED,
            EventType::BUNDLE_STOPPED,
            EventType::BUNDLE_UPDATED,
            EventType::BUNDLE_UNINSTALLED,
            EventType::DEPLOYMENT_INSTALL,
            EventType::DEPLOYMENT_UNINSTALL,
            EventType::DEPLOYMENT_COMPLETE,
        ]),
        1 => (1u32..100_000).prop_map(EventType::new),
    ]
}

/// Strategy for generating property keys.
pub fn property_key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9.]{0,15}").expect("Invalid regex")
}

/// Strategy for generating property values.
///
/// Deliberately includes `$`, `,` and line breaks so the event line
/// escaping gets exercised.
pub fn property_value_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[ -~\\n\\r]{0,32}").expect("Invalid regex")
}

/// Strategy for generating event property maps.
pub fn event_properties_strategy() -> impl Strategy<Value = EventProperties> {
    prop::collection::vec((property_key_strategy(), property_value_strategy()), 0..4).prop_map(
        |pairs| {
            let mut properties = EventProperties::new();
            for (key, value) in pairs {
                properties.insert(key, value);
            }
            properties
        },
    )
}

/// Strategy for generating log events with assigned ids.
pub fn log_event_strategy() -> impl Strategy<Value = LogEvent> {
    (
        1..16u64,
        1..50_000u64,
        event_type_strategy(),
        0..4_000_000_000_000u64,
        event_properties_strategy(),
    )
        .prop_map(|(log_id, event_id, event_type, timestamp_ms, properties)| {
            LogEvent::new(log_id, event_id, event_type, timestamp_ms, properties)
        })
}

/// Strategy for generating artifact filenames.
pub fn filename_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9]{0,8}\\.(jar|cfg|xml)").expect("Invalid regex")
}

/// Strategy for generating artifact descriptors: bundles with symbolic
/// name and version, or plain resources with an optional digest.
pub fn artifact_strategy() -> impl Strategy<Value = ArtifactData> {
    let symbolic = prop::string::string_regex("com\\.[a-z]{2,8}\\.[a-z]{2,8}")
        .expect("Invalid regex");
    let version = prop::string::string_regex("[0-9]\\.[0-9](\\.[0-9])?").expect("Invalid regex");
    let digest = prop::string::string_regex("[0-9a-f]{8}").expect("Invalid regex");

    prop_oneof![
        2 => (filename_strategy(), symbolic, version)
            .prop_map(|(filename, name, version)| ArtifactData::bundle(filename, name, version)),
        1 => (filename_strategy(), prop::option::of(digest)).prop_map(|(filename, digest)| {
            match digest {
                Some(digest) => ArtifactData::new(filename).with_digest(digest),
                None => ArtifactData::new(filename),
            }
        }),
    ]
}

/// Strategy for generating deployment snapshots with unique artifact keys.
pub fn snapshot_strategy() -> impl Strategy<Value = DeploymentSnapshot> {
    let version = prop::string::string_regex("[0-9]\\.[0-9]\\.[0-9]").expect("Invalid regex");
    (version, prop::collection::vec(artifact_strategy(), 0..6)).prop_map(
        |(version, artifacts)| {
            let mut snapshot = DeploymentSnapshot::new(version);
            let mut seen = BTreeSet::new();
            for artifact in artifacts {
                if seen.insert(artifact.key()) {
                    snapshot = snapshot.with_artifact(artifact);
                }
            }
            snapshot
        },
    )
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
