//! Environment labels derived from CI job names.
//!
//! A label is one of `chromium`, `firefox`, `webkit`, `mobile`, optionally
//! suffixed with ` (iframe)`, or the raw job name when no browser matches.

use std::cmp::Ordering;

pub const IFRAME_SUFFIX: &str = " (iframe)";

/// Display order for known browser buckets. Unknown bases sort after these.
const BASE_ORDER: [&str; 4] = ["chromium", "mobile", "firefox", "webkit"];

fn base_bucket(lower: &str) -> Option<&'static str> {
    if lower.contains("chromium") {
        Some("chromium")
    } else if lower.contains("firefox") {
        Some("firefox")
    } else if lower.contains("safari") || lower.contains("webkit") {
        Some("webkit")
    } else if lower.contains("mobile") || lower.contains("iphone") {
        Some("mobile")
    } else {
        None
    }
}

fn is_iframe_context(lower: &str) -> bool {
    lower.contains("frame_with_picture") || lower.contains("iframe")
}

/// Map a job name to its environment label. The iframe qualifier is only
/// applied on top of a recognised browser; unrecognised names pass through.
pub fn classify(job_name: &str) -> String {
    let lower = job_name.to_lowercase();
    match base_bucket(&lower) {
        Some(base) if is_iframe_context(&lower) => format!("{base}{IFRAME_SUFFIX}"),
        Some(base) => base.to_string(),
        None => job_name.to_string(),
    }
}

fn sort_key(label: &str) -> (usize, bool) {
    let (base, context) = match label.split_once(" (") {
        Some((base, rest)) => (base, rest),
        None => (label, "standalone"),
    };
    let rank = BASE_ORDER
        .iter()
        .position(|b| *b == base)
        .unwrap_or(BASE_ORDER.len());
    (rank, context.contains("iframe"))
}

pub fn compare_labels(a: &str, b: &str) -> Ordering {
    sort_key(a).cmp(&sort_key(b)).then_with(|| a.cmp(b))
}

pub fn sort_labels<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut sorted: Vec<String> = labels.into_iter().map(Into::into).collect();
    sorted.sort_by(|a, b| compare_labels(a, b));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_browsers() {
        assert_eq!(classify("Playwright Chromium"), "chromium");
        assert_eq!(classify("playwright-firefox"), "firefox");
        assert_eq!(classify(":safari: Playwright Safari"), "webkit");
        assert_eq!(classify("playwright webkit"), "webkit");
        assert_eq!(classify("Playwright Mobile"), "mobile");
        assert_eq!(classify("playwright-iphone-13"), "mobile");
    }

    #[test]
    fn first_match_wins() {
        assert_eq!(classify("playwright-chromium-safari-hybrid"), "chromium");
        assert_eq!(classify("firefox on mobile"), "firefox");
    }

    #[test]
    fn iframe_suffix_on_known_base() {
        assert_eq!(classify("playwright-chromium-iframe"), "chromium (iframe)");
        assert_eq!(
            classify("Playwright WebKit frame_with_picture"),
            "webkit (iframe)"
        );
    }

    #[test]
    fn unknown_base_never_gets_iframe_suffix() {
        assert_eq!(
            classify("playwright-unknown-iframe"),
            "playwright-unknown-iframe"
        );
    }

    #[test]
    fn sort_order() {
        let sorted = sort_labels([
            "webkit",
            "zeta job",
            "chromium (iframe)",
            "firefox",
            "alpha job",
            "mobile",
            "chromium",
            "webkit (iframe)",
        ]);
        assert_eq!(
            sorted,
            vec![
                "chromium",
                "chromium (iframe)",
                "mobile",
                "firefox",
                "webkit",
                "webkit (iframe)",
                "alpha job",
                "zeta job",
            ]
        );
    }

    #[test]
    fn unknown_labels_with_parens_fall_back_to_lexicographic() {
        let sorted = sort_labels(["b (x)", "a (iframe)", "a (y)"]);
        assert_eq!(sorted, vec!["a (y)", "b (x)", "a (iframe)"]);
    }
}
