//! Row-addressable view over raw CI log text.
//!
//! Two cleaning policies exist. [`Normalization::Scan`] collapses a line to
//! its trimmed text and is what every pattern match runs against.
//! [`Normalization::Preserve`] keeps leading whitespace so error blocks can be
//! handed back to the user exactly as the test runner printed them.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub text: String,
    /// 1-based line number in the original log.
    pub row: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    Scan,
    Preserve,
}

static ANSI_RE: OnceLock<Regex> = OnceLock::new();

/// CSI sequences (colour, erase-line, cursor moves) plus OSC/APC strings
/// terminated by BEL or ST, which CI agents use for inline timestamps.
fn ansi_re() -> &'static Regex {
    ANSI_RE.get_or_init(|| {
        Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]|\x1b[\]_][^\x07\x1b]*(?:\x07|\x1b\\)").unwrap()
    })
}

pub fn strip_ansi(text: &str) -> String {
    ansi_re().replace_all(text, "").into_owned()
}

pub fn clean_scan(text: &str) -> String {
    strip_ansi(text).trim().to_string()
}

pub fn clean_preserve(text: &str) -> String {
    let stripped = strip_ansi(text);
    let without_cr = stripped.strip_suffix('\r').unwrap_or(&stripped);
    without_cr.trim_end().to_string()
}

/// Split `raw` into numbered lines using the given cleaning policy.
/// Empty input yields no lines.
pub fn normalize(raw: &str, mode: Normalization) -> Vec<LogLine> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split('\n')
        .enumerate()
        .map(|(i, line)| LogLine {
            text: match mode {
                Normalization::Scan => clean_scan(line),
                Normalization::Preserve => clean_preserve(line),
            },
            row: i + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_no_lines() {
        assert!(normalize("", Normalization::Scan).is_empty());
        assert!(normalize("", Normalization::Preserve).is_empty());
    }

    #[test]
    fn rows_are_one_based() {
        let lines = normalize("a\nb\nc", Normalization::Scan);
        let rows: Vec<usize> = lines.iter().map(|l| l.row).collect();
        assert_eq!(rows, vec![1, 2, 3]);
    }

    #[test]
    fn scan_strips_color_and_trims() {
        let lines = normalize("  \x1b[31m2 failed\x1b[39m  \r", Normalization::Scan);
        assert_eq!(lines[0].text, "2 failed");
    }

    #[test]
    fn preserve_keeps_indentation() {
        let lines = normalize(
            "    at foo (a.spec.ts:3:5)\x1b[0m  \r\n\t\x1b[2mExpected: 1\x1b[22m",
            Normalization::Preserve,
        );
        assert_eq!(lines[0].text, "    at foo (a.spec.ts:3:5)");
        assert_eq!(lines[1].text, "\tExpected: 1");
    }

    #[test]
    fn strips_erase_line_and_timestamp_escapes() {
        let lines = normalize(
            "\x1b_bk;t=1700000000000\x07\x1b[2K  [chromium] › a.spec.ts › works\n\x1b[1G\x1b[?25l2 failed\x1b]0;title\x1b\\",
            Normalization::Scan,
        );
        assert_eq!(lines[0].text, "[chromium] › a.spec.ts › works");
        assert_eq!(lines[1].text, "2 failed");
    }

    #[test]
    fn scan_cleaning_is_idempotent() {
        for raw in [
            "\x1b[1m  [chromium] › a.spec.ts › works \x1b[22m",
            "plain",
            "   ",
            "\x1b[31m\x1b[1m3 failed\x1b[0m\r",
            "\x1b_bk;t=1\x07\x1b[2K[webkit] › b.spec.ts › x",
        ] {
            let once = clean_scan(raw);
            assert_eq!(clean_scan(&once), once, "not idempotent for {raw:?}");
        }
    }
}
