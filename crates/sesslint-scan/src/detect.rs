//! Ruleset version detection from record fingerprints.
//!
//! The log format carries no self-describing version field, so the
//! generation is inferred from structural signals: discriminator values and
//! top-level fields that first appear in a given generation. Rules are
//! evaluated newest to oldest and the first match wins. Newer generations
//! are supersets of structural capability, so matching newest-first keeps a
//! new-format file from being classified as an old one it also happens to
//! satisfy.
//!
//! This is a heuristic. A file whose leading sample coincidentally carries
//! a newer generation's signal is classified as that generation; the format
//! offers no stronger signal than field presence.

use thiserror::Error;

use sesslint_core::{version, Record, DISCRIMINATOR};

/// Decoded records inspected per file before giving up on detection.
pub const SAMPLE_LINES: usize = 50;

/// No fingerprint rule matched the sampled records. Callers fall back to
/// the configured default ruleset and report a warning, not a failure.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("no ruleset fingerprint matched the sampled records")]
pub struct UndetectableVersion;

/// Structural signals introduced by one generation.
struct FingerprintRule {
    version: &'static str,
    /// Discriminator values that first appear in this generation.
    types: &'static [&'static str],
    /// Top-level fields that first appear in this generation.
    fields: &'static [&'static str],
}

impl FingerprintRule {
    fn matches(&self, record: &Record) -> bool {
        if let Some(tag) = record.get(DISCRIMINATOR).and_then(|v| v.as_str()) {
            if self.types.contains(&tag) {
                return true;
            }
        }
        self.fields.iter().any(|f| record.get(f).is_some())
    }
}

/// Newest first. Adding a generation means one new entry here plus one new
/// schema document on disk.
const RULES: &[FingerprintRule] = &[
    FingerprintRule {
        version: version::V2_1_59,
        types: &["progress"],
        fields: &["progress_type"],
    },
    FingerprintRule {
        version: version::V2_1_1,
        types: &["queue-operation", "pr-link"],
        fields: &[],
    },
    FingerprintRule {
        version: version::V2_0_76,
        types: &[
            "user",
            "assistant",
            "system",
            "summary",
            "file-history-snapshot",
        ],
        fields: &[],
    },
];

/// Pick the ruleset generation for a sample of decoded records.
///
/// A rule only fires on a record actually carrying one of its signals; an
/// empty or all-ambiguous sample is `UndetectableVersion`, never a guess.
pub fn detect<'a>(
    sample: impl IntoIterator<Item = &'a Record>,
) -> Result<&'static str, UndetectableVersion> {
    let records: Vec<&Record> = sample.into_iter().collect();
    for rule in RULES {
        if records.iter().any(|r| rule.matches(r)) {
            return Ok(rule.version);
        }
    }
    Err(UndetectableVersion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serde_json::Value;

    #[test]
    fn oldest_generation_from_base_types() {
        let sample = [
            json!({ "type": "summary", "summary": "hello" }),
            json!({ "type": "user", "message": { "role": "user", "content": "hi" } }),
        ];
        assert_eq!(detect(&sample), Ok(version::V2_0_76));
    }

    #[test]
    fn progress_record_selects_newest() {
        let sample = [
            json!({ "type": "user", "message": { "role": "user", "content": "hi" } }),
            json!({ "type": "progress", "progress_type": "bash_progress" }),
        ];
        assert_eq!(detect(&sample), Ok(version::V2_1_59));
    }

    #[test]
    fn newest_signal_wins_over_older_match() {
        // The sample satisfies the oldest rule too; newest-first ordering
        // must not let that shadow the progress signal.
        let sample = [
            json!({ "type": "assistant", "message": { "role": "assistant", "content": [] } }),
            json!({ "type": "queue-operation", "operation": "enqueue" }),
            json!({ "type": "progress", "progress_type": "agent_progress" }),
        ];
        assert_eq!(detect(&sample), Ok(version::V2_1_59));
    }

    #[test]
    fn queue_operation_selects_middle_generation() {
        let sample = [
            json!({ "type": "user", "message": { "role": "user", "content": "hi" } }),
            json!({ "type": "queue-operation", "operation": "enqueue" }),
        ];
        assert_eq!(detect(&sample), Ok(version::V2_1_1));
    }

    #[test]
    fn field_signal_without_type_signal() {
        // progress_type on an otherwise unremarkable record still marks the
        // newest generation.
        let sample = [json!({ "type": "system", "progress_type": "hook_progress" })];
        assert_eq!(detect(&sample), Ok(version::V2_1_59));
    }

    #[test]
    fn empty_sample_is_undetectable() {
        let sample: Vec<Value> = Vec::new();
        assert_eq!(detect(&sample), Err(UndetectableVersion));
    }

    #[test]
    fn unrecognized_records_are_undetectable() {
        let sample = [json!({ "foo": 1 }), json!({ "type": "mystery" })];
        assert_eq!(detect(&sample), Err(UndetectableVersion));
    }

    #[test]
    fn detection_is_deterministic() {
        let sample = [
            json!({ "type": "pr-link", "url": "https://example.com/pr/1" }),
            json!({ "type": "user", "message": { "role": "user", "content": "x" } }),
        ];
        let first = detect(&sample);
        for _ in 0..10 {
            assert_eq!(detect(&sample), first);
        }
        assert_eq!(first, Ok(version::V2_1_1));
    }
}
