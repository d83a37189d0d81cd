//! Text rendering of a run's aggregated results.

use std::collections::HashMap;

use sesslint_core::{Detection, IssueKind, RunResult};

/// Failure entries shown in the detail section.
const DETAIL_CAP: usize = 50;

/// Render the human-readable report for one run.
///
/// Non-verbose shows the first failing reason per line; verbose adds every
/// reason and a truncated snippet of the offending record.
pub fn summarize(run: &RunResult, verbose: bool) -> String {
    let bar = "=".repeat(60);
    let mut out = String::new();

    out.push_str(&format!("{bar}\nVALIDATION RESULTS\n{bar}\n\n"));
    out.push_str(&format!("Files scanned:   {}\n", run.files_scanned()));
    if !run.unreadable.is_empty() {
        out.push_str(&format!("Files unreadable: {}\n", run.unreadable.len()));
    }
    out.push_str(&format!("Total lines:     {}\n", run.total_lines()));
    out.push_str(&format!("Valid lines:     {}\n", run.valid_lines()));
    out.push_str(&format!("Invalid lines:   {}\n", run.invalid_lines()));
    out.push_str(&format!("Malformed lines: {}\n", run.malformed_lines()));

    if !run.files.is_empty() {
        out.push_str("\nRulesets:\n");
        for file in &run.files {
            let resolved = match &file.detection {
                Detection::Matched { version } => format!("v{version}"),
                Detection::Fallback { version, note } => {
                    format!("v{version} (fallback: {note})")
                }
                Detection::Pinned { version } => version.clone(),
                Detection::Empty => "(empty file)".to_string(),
            };
            out.push_str(&format!("  {}: {}\n", file.path.display(), resolved));
        }
    }

    if !run.unreadable.is_empty() {
        out.push_str("\nUnreadable files:\n");
        for failure in &run.unreadable {
            out.push_str(&format!("  {}: {}\n", failure.path.display(), failure.error));
        }
    }

    let tally = error_tally(run);
    if !tally.is_empty() {
        out.push_str("\nError types:\n");
        let mut rows: Vec<(&str, usize)> = tally.into_iter().collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        for (label, count) in rows {
            out.push_str(&format!("  {label}: {count}\n"));
        }
    }

    let failures: Vec<(&std::path::Path, &sesslint_core::LineIssue)> = run
        .files
        .iter()
        .flat_map(|f| f.issues.iter().map(move |i| (f.path.as_path(), i)))
        .collect();

    if !failures.is_empty() {
        let shown = failures.len().min(DETAIL_CAP);
        out.push_str(&format!("\n{bar}\n"));
        if failures.len() > DETAIL_CAP {
            out.push_str(&format!(
                "FAILURES (showing first {shown} of {})\n",
                failures.len()
            ));
        } else {
            out.push_str("FAILURES\n");
        }
        out.push_str(&format!("{bar}\n"));

        for (n, (path, issue)) in failures.iter().copied().take(DETAIL_CAP).enumerate() {
            out.push_str(&format!("\n[{}] {}:{}\n", n + 1, path.display(), issue.line));
            if verbose {
                for reason in &issue.reasons {
                    out.push_str(&render_reason(reason));
                }
                out.push_str(&format!("    Data: {}\n", issue.snippet));
            } else if let Some(reason) = issue.reasons.first() {
                out.push_str(&render_reason(reason));
            }
        }
    }

    out.push_str(&format!("\n{bar}\n"));
    out.push_str(&format!("PASS RATE: {:.2}%\n", run.pass_rate()));
    out.push_str(&format!("{bar}\n"));
    if run.is_clean() {
        out.push_str("\nAll lines validated successfully.\n");
    } else {
        out.push_str(&format!(
            "\n{} lines failed validation.\n",
            run.invalid_lines() + run.malformed_lines()
        ));
    }

    out
}

fn render_reason(reason: &sesslint_core::Violation) -> String {
    if reason.path.is_empty() {
        format!("    {}\n", reason.message)
    } else {
        format!("    {}: {}\n", reason.path, reason.message)
    }
}

/// Group failing lines by remediation class, using the first reason to
/// split schema violations the way the upstream messages phrase them.
fn error_tally(run: &RunResult) -> HashMap<&'static str, usize> {
    let mut tally: HashMap<&'static str, usize> = HashMap::new();
    for file in &run.files {
        for issue in &file.issues {
            let label = match issue.kind {
                IssueKind::Malformed => "Malformed JSON",
                IssueKind::UnknownType => "Unknown message types",
                IssueKind::SchemaViolation => {
                    let message = issue
                        .reasons
                        .first()
                        .map(|r| r.message.as_str())
                        .unwrap_or("");
                    if message.contains("required") {
                        "Missing required fields"
                    } else if message.contains("not of type") || message.contains("not one of") {
                        "Invalid values"
                    } else {
                        "Other schema violations"
                    }
                }
            };
            *tally.entry(label).or_insert(0) += 1;
        }
    }
    for _ in &run.unreadable {
        *tally.entry("Unreadable files").or_insert(0) += 1;
    }
    tally
}

#[cfg(test)]
mod tests {
    use super::*;
    use sesslint_core::{version, FileFailure, FileReport, LineIssue, Violation};
    use std::path::PathBuf;

    fn violation(message: &str) -> Violation {
        Violation {
            path: "/message".to_string(),
            message: message.to_string(),
            schema_path: String::new(),
        }
    }

    fn issue(line: usize, kind: IssueKind, messages: &[&str]) -> LineIssue {
        LineIssue {
            line,
            kind,
            reasons: messages.iter().map(|m| violation(m)).collect(),
            snippet: r#"{"type":"user"}"#.to_string(),
        }
    }

    fn one_file_run(issues: Vec<LineIssue>, total: usize, valid: usize) -> RunResult {
        RunResult {
            files: vec![FileReport {
                path: PathBuf::from("a.jsonl"),
                detection: Detection::Matched {
                    version: version::V2_1_59.to_string(),
                },
                total_lines: total,
                valid_lines: valid,
                issues,
            }],
            unreadable: vec![],
        }
    }

    #[test]
    fn clean_run_reports_full_pass_rate() {
        let text = summarize(&one_file_run(vec![], 4, 4), false);
        assert!(text.contains("Files scanned:   1"));
        assert!(text.contains("Valid lines:     4"));
        assert!(text.contains("PASS RATE: 100.00%"));
        assert!(text.contains("All lines validated successfully."));
    }

    #[test]
    fn empty_run_pass_rate_is_100_by_convention() {
        let text = summarize(&RunResult::default(), false);
        assert!(text.contains("Files scanned:   0"));
        assert!(text.contains("PASS RATE: 100.00%"));
    }

    #[test]
    fn non_verbose_prints_first_reason_only() {
        let run = one_file_run(
            vec![issue(
                3,
                IssueKind::SchemaViolation,
                &[
                    "\"message\" is a required property",
                    "\"uuid\" is not of type \"string\"",
                ],
            )],
            3,
            2,
        );
        let text = summarize(&run, false);
        assert!(text.contains("a.jsonl:3"));
        assert!(text.contains("required property"));
        assert!(!text.contains("not of type"));
        assert!(!text.contains("Data:"));
    }

    #[test]
    fn verbose_prints_every_reason_and_snippet() {
        let run = one_file_run(
            vec![issue(
                3,
                IssueKind::SchemaViolation,
                &[
                    "\"message\" is a required property",
                    "\"uuid\" is not of type \"string\"",
                ],
            )],
            3,
            2,
        );
        let text = summarize(&run, true);
        assert!(text.contains("required property"));
        assert!(text.contains("not of type"));
        assert!(text.contains("Data: {\"type\":\"user\"}"));
    }

    #[test]
    fn detail_section_is_capped() {
        let issues: Vec<LineIssue> = (1..=60)
            .map(|n| issue(n, IssueKind::Malformed, &["JSON parse error: eof"]))
            .collect();
        let text = summarize(&one_file_run(issues, 60, 0), false);
        assert!(text.contains("showing first 50 of 60"));
        assert!(text.contains("[50] "));
        assert!(!text.contains("[51] "));
    }

    #[test]
    fn error_types_are_tallied_by_remediation_class() {
        let run = one_file_run(
            vec![
                issue(1, IssueKind::Malformed, &["JSON parse error: eof"]),
                issue(2, IssueKind::UnknownType, &["unknown message type 'x'"]),
                issue(
                    3,
                    IssueKind::SchemaViolation,
                    &["\"summary\" is a required property"],
                ),
                issue(
                    4,
                    IssueKind::SchemaViolation,
                    &["\"fast\" is not one of [\"low\",\"high\"]"],
                ),
            ],
            4,
            0,
        );
        let text = summarize(&run, false);
        assert!(text.contains("Malformed JSON: 1"));
        assert!(text.contains("Unknown message types: 1"));
        assert!(text.contains("Missing required fields: 1"));
        assert!(text.contains("Invalid values: 1"));
    }

    #[test]
    fn fallback_note_appears_in_ruleset_section() {
        let run = RunResult {
            files: vec![FileReport {
                path: PathBuf::from("odd.jsonl"),
                detection: Detection::Fallback {
                    version: version::GOLDEN.to_string(),
                    note: "no fingerprint matched".to_string(),
                },
                total_lines: 1,
                valid_lines: 1,
                issues: vec![],
            }],
            unreadable: vec![],
        };
        let text = summarize(&run, false);
        assert!(text.contains("odd.jsonl: v2.1.59 (fallback: no fingerprint matched)"));
    }

    #[test]
    fn unreadable_files_are_listed_and_counted() {
        let run = RunResult {
            files: vec![],
            unreadable: vec![FileFailure {
                path: PathBuf::from("locked.jsonl"),
                error: "permission denied".to_string(),
            }],
        };
        let text = summarize(&run, false);
        assert!(text.contains("Files unreadable: 1"));
        assert!(text.contains("locked.jsonl: permission denied"));
        assert!(text.contains("Unreadable files: 1"));
    }
}
