use crate::log::LogLine;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

static FAILED_RE: OnceLock<Regex> = OnceLock::new();
static SECTION_END_RE: OnceLock<Regex> = OnceLock::new();

fn failed_re() -> &'static Regex {
    FAILED_RE.get_or_init(|| Regex::new(r"(?i)\b\d+\s+failed\b").unwrap())
}

fn section_end_re() -> &'static Regex {
    SECTION_END_RE.get_or_init(|| Regex::new(r"(?i)\b\d+\s+(flaky|skipped|passed)\b").unwrap())
}

pub fn is_failed_summary(text: &str) -> bool {
    failed_re().is_match(text)
}

// ---------------------------------------------------------------------------
// FailedTests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestEntry {
    pub name: String,
    pub row: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedTests {
    pub failed_line: Option<String>,
    pub failed_line_row: Option<usize>,
    pub tests: Vec<String>,
    pub test_entries: Vec<TestEntry>,
}

/// Row of the last "N failed" line. Earlier matches (retry banners, echoed
/// commands) are ignored because only the final report is authoritative.
pub fn find_summary_row(lines: &[LogLine]) -> Option<usize> {
    lines
        .iter()
        .rev()
        .find(|line| is_failed_summary(&line.text))
        .map(|line| line.row)
}

/// Collect the failed-test list that follows the summary line, up to the
/// next "N flaky|skipped|passed" section. Expects scan-normalized lines.
pub fn extract_failed_tests(lines: &[LogLine]) -> FailedTests {
    let Some(summary_row) = find_summary_row(lines) else {
        return FailedTests::default();
    };

    let mut result = FailedTests {
        failed_line: lines
            .iter()
            .find(|l| l.row == summary_row)
            .map(|l| l.text.clone()),
        failed_line_row: Some(summary_row),
        ..FailedTests::default()
    };

    for line in lines.iter().filter(|l| l.row > summary_row) {
        if section_end_re().is_match(&line.text) {
            break;
        }
        if line.text.is_empty() {
            continue;
        }
        result.tests.push(line.text.clone());
        result.test_entries.push(TestEntry {
            name: line.text.clone(),
            row: line.row,
        });
    }

    result
}
