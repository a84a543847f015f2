use regex::Regex;
use std::sync::OnceLock;

static ENV_TAG_RE: OnceLock<Regex> = OnceLock::new();

fn env_tag_re() -> &'static Regex {
    ENV_TAG_RE.get_or_init(|| Regex::new(r"^\[[^\]]+\]\s+›\s+").unwrap())
}

/// Canonical test key: the raw failure line without its leading
/// `[project] › ` tag, so the same test joins across browser jobs.
pub fn normalize_test_name(raw: &str) -> String {
    env_tag_re()
        .replace(raw.trim_start(), "")
        .trim()
        .to_string()
}
