//! Locate the error detail printed for one failing test.
//!
//! Works on indent-preserving lines. Boundary patterns are matched against
//! the left-trimmed text because reporters indent headers and retry banners.

use crate::log::LogLine;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

static TEST_HEADER_RE: OnceLock<Regex> = OnceLock::new();
static SECTION_RE: OnceLock<Regex> = OnceLock::new();
static RETRY_RE: OnceLock<Regex> = OnceLock::new();

fn test_header_re() -> &'static Regex {
    TEST_HEADER_RE.get_or_init(|| Regex::new(r"^\[[^\]]+\]\s+›").unwrap())
}

fn section_re() -> &'static Regex {
    SECTION_RE.get_or_init(|| Regex::new(r"(?i)\d+\s+(failed|flaky|skipped|passed)").unwrap())
}

fn retry_re() -> &'static Regex {
    RETRY_RE.get_or_init(|| Regex::new(r"(?i)^Retry\s+#\d+").unwrap())
}

fn is_block_boundary(text: &str) -> bool {
    let text = text.trim_start();
    test_header_re().is_match(text) || section_re().is_match(text) || retry_re().is_match(text)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBlock {
    pub start_row: Option<usize>,
    pub end_row: Option<usize>,
    pub lines: Vec<String>,
}

impl ErrorBlock {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Row of the last line containing `needle` strictly before `before_row`
/// (or anywhere when `before_row` is `None`). With retries, the last
/// occurrence is the final attempt.
pub fn find_last_match_before(
    lines: &[LogLine],
    needle: &str,
    before_row: Option<usize>,
) -> Option<usize> {
    lines
        .iter()
        .filter(|l| before_row.map_or(true, |limit| l.row < limit))
        .filter(|l| l.text.contains(needle))
        .map(|l| l.row)
        .max()
}

/// Collect the block starting at `match_row` up to the next test header,
/// summary section or retry banner. An out-of-range `match_row` falls back
/// to the first line containing `needle`.
pub fn extract_block(lines: &[LogLine], match_row: usize, needle: &str) -> ErrorBlock {
    let start_idx = if match_row >= 1 && match_row <= lines.len() {
        Some(match_row - 1)
    } else {
        lines.iter().position(|l| l.text.contains(needle))
    };
    let Some(start_idx) = start_idx else {
        return ErrorBlock::default();
    };

    let mut collected: Vec<&LogLine> = vec![&lines[start_idx]];
    for line in &lines[start_idx + 1..] {
        if is_block_boundary(&line.text) {
            break;
        }
        collected.push(line);
    }

    while collected.last().is_some_and(|l| l.text.trim().is_empty()) {
        collected.pop();
    }

    ErrorBlock {
        start_row: collected.first().map(|l| l.row),
        end_row: collected.last().map(|l| l.row),
        lines: collected.into_iter().map(|l| l.text.clone()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{normalize, Normalization};

    fn preserve(raw: &str) -> Vec<LogLine> {
        normalize(raw, Normalization::Preserve)
    }

    const LOG: &str = "  1) [chromium] › login.spec.ts:5:3 › logs in
    Error: expect(received).toBe(expected)

    Expected: 1
    Received: 2


    Retry #1 ───────
  1) [chromium] › login.spec.ts:5:3 › logs in
    Error: final attempt
      at login.spec.ts:9:1


  [chromium] › other.spec.ts:1:1 › other
  1 failed
    [chromium] › login.spec.ts:5:3 › logs in";

    #[test]
    fn last_match_before_summary() {
        let lines = preserve(LOG);
        let needle = "login.spec.ts:5:3 › logs in";
        assert_eq!(find_last_match_before(&lines, needle, Some(15)), Some(9));
        assert_eq!(find_last_match_before(&lines, needle, None), Some(16));
        assert_eq!(find_last_match_before(&lines, needle, Some(1)), None);
        assert_eq!(find_last_match_before(&lines, "nope", None), None);
    }

    #[test]
    fn needle_is_literal_not_regex() {
        let lines = preserve("a (b) [c]\nabc");
        assert_eq!(find_last_match_before(&lines, "(b) [c]", None), Some(1));
        assert_eq!(find_last_match_before(&lines, "a.c", None), None);
    }

    #[test]
    fn block_stops_at_header_and_trims_trailing_blanks() {
        let lines = preserve(LOG);
        let block = extract_block(&lines, 9, "logs in");
        assert_eq!(block.start_row, Some(9));
        assert_eq!(block.end_row, Some(11));
        assert_eq!(
            block.lines,
            vec![
                "  1) [chromium] › login.spec.ts:5:3 › logs in",
                "    Error: final attempt",
                "      at login.spec.ts:9:1",
            ]
        );
    }

    #[test]
    fn block_stops_at_retry_and_keeps_inner_blanks() {
        let lines = preserve(LOG);
        let block = extract_block(&lines, 1, "logs in");
        assert_eq!(block.start_row, Some(1));
        assert_eq!(block.end_row, Some(5));
        assert_eq!(block.lines[2], "");
        assert!(block.lines.iter().all(|l| !l.contains("Retry")));
    }

    #[test]
    fn out_of_range_row_falls_back_to_first_occurrence() {
        let lines = preserve(LOG);
        let block = extract_block(&lines, 999, "login.spec.ts:5:3");
        assert_eq!(block.start_row, Some(1));
        let block = extract_block(&lines, 0, "login.spec.ts:5:3");
        assert_eq!(block.start_row, Some(1));
    }

    #[test]
    fn missing_needle_yields_empty_block() {
        let block = extract_block(&preserve("a\nb"), 0, "zzz");
        assert!(block.is_empty());
        assert_eq!(block.start_row, None);
        assert_eq!(block.end_row, None);
    }

    #[test]
    fn entirely_blank_block_is_empty() {
        let lines = preserve("x\n   \n[webkit] › next");
        let block = extract_block(&lines, 2, "x");
        assert!(block.is_empty());
        assert_eq!(block.start_row, None);
    }
}
