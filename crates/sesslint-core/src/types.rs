use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One decoded line of a session log. Immutable once read.
pub type Record = serde_json::Value;

/// Discriminator field on every session record.
pub const DISCRIMINATOR: &str = "type";

/// Version labels for the supported CLI generations.
pub mod version {
    pub const V2_0_76: &str = "2.0.76";
    pub const V2_1_1: &str = "2.1.1";
    pub const V2_1_59: &str = "2.1.59";

    /// Label for the command-history ruleset (`history.jsonl`).
    pub const HISTORY: &str = "history";

    /// Session generations, oldest to newest.
    pub const CANDIDATES: &[&str] = &[V2_0_76, V2_1_1, V2_1_59];

    /// Most current session generation, used when no fingerprint matches.
    pub const GOLDEN: &str = V2_1_59;
}

/// One structural violation on a record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Violation {
    /// JSON Pointer to the violating field in the record ("" = root).
    pub path: String,
    pub message: String,
    /// JSON Pointer within the schema that triggered the violation.
    #[serde(default)]
    pub schema_path: String,
}

/// Validation outcome for one decoded record.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Valid,
    /// Discriminator missing or not recognized by the ruleset.
    UnknownType(Violation),
    /// Structural violations, in schema evaluation order.
    Invalid(Vec<Violation>),
}

impl Outcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Outcome::Valid)
    }
}

/// Remediation class of a line-level finding. Malformed JSON, an
/// unrecognized message type, and a schema violation on a known type
/// each need a different fix, so the report keeps them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueKind {
    Malformed,
    UnknownType,
    SchemaViolation,
}

/// A finding attached to one physical line of a session file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineIssue {
    /// 1-indexed physical line number, blank lines included.
    pub line: usize,
    pub kind: IssueKind,
    /// All reasons found on the line, not just the first.
    pub reasons: Vec<Violation>,
    /// Truncated rendering of the offending line.
    pub snippet: String,
}

/// How a file's ruleset version was resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Detection {
    /// A fingerprint rule matched the leading sample.
    Matched { version: String },
    /// No fingerprint matched; the configured default was used.
    Fallback { version: String, note: String },
    /// Fixed ruleset implied by the file name (history files).
    Pinned { version: String },
    /// Zero-byte file, nothing to detect or validate.
    Empty,
}

impl Detection {
    pub fn version(&self) -> Option<&str> {
        match self {
            Detection::Matched { version }
            | Detection::Fallback { version, .. }
            | Detection::Pinned { version } => Some(version),
            Detection::Empty => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Detection::Fallback { .. })
    }
}

/// Per-file validation results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileReport {
    pub path: PathBuf,
    pub detection: Detection,
    /// Non-blank physical lines.
    pub total_lines: usize,
    pub valid_lines: usize,
    pub issues: Vec<LineIssue>,
}

impl FileReport {
    pub fn malformed_lines(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.kind == IssueKind::Malformed)
            .count()
    }

    /// Decoded lines that failed validation (unknown type or schema violation).
    pub fn invalid_lines(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.kind != IssueKind::Malformed)
            .count()
    }
}

/// A file that could not be read after the run started.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Aggregated results for one whole run. Never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunResult {
    pub files: Vec<FileReport>,
    pub unreadable: Vec<FileFailure>,
}

impl RunResult {
    pub fn files_scanned(&self) -> usize {
        self.files.len()
    }

    pub fn total_lines(&self) -> usize {
        self.files.iter().map(|f| f.total_lines).sum()
    }

    pub fn valid_lines(&self) -> usize {
        self.files.iter().map(|f| f.valid_lines).sum()
    }

    pub fn invalid_lines(&self) -> usize {
        self.files.iter().map(|f| f.invalid_lines()).sum()
    }

    pub fn malformed_lines(&self) -> usize {
        self.files.iter().map(|f| f.malformed_lines()).sum()
    }

    /// Percentage of lines that validated. 100% by convention when the run
    /// saw no lines at all.
    pub fn pass_rate(&self) -> f64 {
        let total = self.total_lines();
        if total == 0 {
            return 100.0;
        }
        self.valid_lines() as f64 / total as f64 * 100.0
    }

    /// True when every line validated and every file was readable.
    pub fn is_clean(&self) -> bool {
        self.unreadable.is_empty() && self.files.iter().all(|f| f.issues.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(total: usize, valid: usize, issues: Vec<LineIssue>) -> FileReport {
        FileReport {
            path: PathBuf::from("a.jsonl"),
            detection: Detection::Matched {
                version: version::V2_1_59.to_string(),
            },
            total_lines: total,
            valid_lines: valid,
            issues,
        }
    }

    fn issue(line: usize, kind: IssueKind) -> LineIssue {
        LineIssue {
            line,
            kind,
            reasons: vec![Violation {
                path: String::new(),
                message: "boom".to_string(),
                schema_path: String::new(),
            }],
            snippet: String::new(),
        }
    }

    #[test]
    fn pass_rate_empty_run_is_100() {
        let run = RunResult::default();
        assert_eq!(run.pass_rate(), 100.0);
        assert!(run.is_clean());
    }

    #[test]
    fn counts_split_by_issue_kind() {
        let run = RunResult {
            files: vec![report(
                3,
                1,
                vec![
                    issue(2, IssueKind::Malformed),
                    issue(3, IssueKind::SchemaViolation),
                ],
            )],
            unreadable: vec![],
        };
        assert_eq!(run.total_lines(), 3);
        assert_eq!(run.valid_lines(), 1);
        assert_eq!(run.malformed_lines(), 1);
        assert_eq!(run.invalid_lines(), 1);
        assert!(!run.is_clean());
    }

    #[test]
    fn unreadable_file_marks_run_dirty() {
        let run = RunResult {
            files: vec![],
            unreadable: vec![FileFailure {
                path: PathBuf::from("locked.jsonl"),
                error: "permission denied".to_string(),
            }],
        };
        assert!(!run.is_clean());
    }

    #[test]
    fn detection_version_and_fallback_flag() {
        let d = Detection::Fallback {
            version: version::GOLDEN.to_string(),
            note: "no fingerprint matched".to_string(),
        };
        assert_eq!(d.version(), Some(version::V2_1_59));
        assert!(d.is_fallback());
        assert_eq!(Detection::Empty.version(), None);
    }
}
