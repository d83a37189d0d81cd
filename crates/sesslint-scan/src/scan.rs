//! Session file enumeration and per-file validation drive.
//!
//! Scans a single file or a project directory laid out as top-level
//! `*.jsonl` session files (plus `history.jsonl`) with nested
//! `<session-id>/subagents/*.jsonl` files. Each file gets its own
//! detection pass on a bounded leading sample and is then validated
//! line by line against the one resolved ruleset. One bad line never
//! aborts a file; one unreadable file never aborts the run.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};

use sesslint_core::{
    version, Detection, FileFailure, FileReport, IssueKind, LineIssue, Outcome, Record, RunResult,
    Violation,
};
use sesslint_schema::Registry;

use crate::detect::{detect, SAMPLE_LINES};

/// Stored snippet budget per offending line.
const SNIPPET_MAX: usize = 200;

/// Per-run scan settings. The default ("golden") version is explicit
/// configuration so the fallback is testable and overridable per run.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Ruleset used when no fingerprint matches.
    pub default_version: String,
    /// Decoded records sampled per file for detection.
    pub sample_lines: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            default_version: version::GOLDEN.to_string(),
            sample_lines: SAMPLE_LINES,
        }
    }
}

/// Scan a session file or project directory.
///
/// Fatal errors (nonexistent path, unreadable single-file input, an
/// unregistered default version) abort before any per-file work; every
/// recoverable condition lands in the returned [`RunResult`].
pub fn scan(path: &Path, registry: &Registry, config: &ScanConfig) -> anyhow::Result<RunResult> {
    // A typo'd default would otherwise surface as a failure on every file.
    registry
        .get(&config.default_version)
        .context("default version is not a loaded ruleset")?;

    if !path.exists() {
        bail!("input path does not exist: {}", path.display());
    }

    if path.is_file() {
        let report = scan_file(path, registry, config, pinned_label(path))
            .with_context(|| format!("cannot read {}", path.display()))?;
        return Ok(RunResult {
            files: vec![report],
            unreadable: Vec::new(),
        });
    }

    let mut run = RunResult::default();
    for file in collect_session_files(path)? {
        tracing::debug!(file = %file.display(), "scanning");
        match scan_file(&file, registry, config, pinned_label(&file)) {
            Ok(report) => run.files.push(report),
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "skipping unreadable file");
                run.unreadable.push(FileFailure {
                    path: file,
                    error: format!("{e:#}"),
                });
            }
        }
    }
    Ok(run)
}

/// History files carry a fixed ruleset; everything else is detected.
fn pinned_label(path: &Path) -> Option<&'static str> {
    (path.file_name().and_then(|n| n.to_str()) == Some("history.jsonl"))
        .then_some(version::HISTORY)
}

/// Top-level `*.jsonl` plus `<session-id>/subagents/*.jsonl`, sorted for a
/// deterministic scan order.
fn collect_session_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    let entries = fs::read_dir(dir)
        .with_context(|| format!("cannot read directory {}", dir.display()))?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() {
            if is_jsonl(&path) {
                files.push(path);
            }
        } else if path.is_dir() {
            let subagents = path.join("subagents");
            if !subagents.is_dir() {
                continue;
            }
            let nested = match fs::read_dir(&subagents) {
                Ok(e) => e,
                Err(_) => continue,
            };
            for sub in nested.flatten() {
                let sub_path = sub.path();
                if sub_path.is_file() && is_jsonl(&sub_path) {
                    files.push(sub_path);
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

fn is_jsonl(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("jsonl")
}

fn scan_file(
    path: &Path,
    registry: &Registry,
    config: &ScanConfig,
    pinned: Option<&'static str>,
) -> anyhow::Result<FileReport> {
    let content = fs::read_to_string(path)?;
    if content.is_empty() {
        return Ok(FileReport {
            path: path.to_path_buf(),
            detection: Detection::Empty,
            total_lines: 0,
            valid_lines: 0,
            issues: Vec::new(),
        });
    }

    let mut total_lines = 0;
    let mut issues: Vec<LineIssue> = Vec::new();
    let mut decoded: Vec<(usize, Record)> = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = idx + 1;
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        total_lines += 1;
        match serde_json::from_str::<Record>(raw) {
            Ok(record) => decoded.push((line, record)),
            Err(e) => issues.push(LineIssue {
                line,
                kind: IssueKind::Malformed,
                reasons: vec![Violation {
                    path: String::new(),
                    message: format!("JSON parse error: {e}"),
                    schema_path: String::new(),
                }],
                snippet: truncate_snippet(raw, SNIPPET_MAX),
            }),
        }
    }

    let detection = match pinned {
        Some(label) => Detection::Pinned {
            version: label.to_string(),
        },
        None => {
            let sample = decoded.iter().take(config.sample_lines).map(|(_, v)| v);
            match detect(sample) {
                Ok(label) => Detection::Matched {
                    version: label.to_string(),
                },
                Err(_) => {
                    tracing::warn!(
                        file = %path.display(),
                        default = %config.default_version,
                        "no ruleset fingerprint matched; using default"
                    );
                    Detection::Fallback {
                        version: config.default_version.clone(),
                        note: "no fingerprint matched".to_string(),
                    }
                }
            }
        }
    };

    let label = detection.version().unwrap_or(&config.default_version);
    let ruleset = registry.get(label)?;

    let mut valid_lines = 0;
    for (line, record) in &decoded {
        match ruleset.validate(record) {
            Outcome::Valid => valid_lines += 1,
            Outcome::UnknownType(reason) => issues.push(LineIssue {
                line: *line,
                kind: IssueKind::UnknownType,
                reasons: vec![reason],
                snippet: truncate_snippet(&record.to_string(), SNIPPET_MAX),
            }),
            Outcome::Invalid(reasons) => issues.push(LineIssue {
                line: *line,
                kind: IssueKind::SchemaViolation,
                reasons,
                snippet: truncate_snippet(&record.to_string(), SNIPPET_MAX),
            }),
        }
    }

    // Malformed lines were collected first; restore physical line order.
    issues.sort_by_key(|i| i.line);

    Ok(FileReport {
        path: path.to_path_buf(),
        detection,
        total_lines,
        valid_lines,
        issues,
    })
}

/// Return the largest byte index `<= i` that is a valid char boundary.
fn floor_char_boundary(s: &str, i: usize) -> usize {
    if i >= s.len() {
        return s.len();
    }
    let mut pos = i;
    while pos > 0 && !s.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

fn truncate_snippet(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let end = floor_char_boundary(s, max);
    format!("{}...", &s[..end])
}
