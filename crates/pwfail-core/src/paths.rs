use crate::cache::CacheIdentity;
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const CACHE_DIR_NAME: &str = "playwright-failures-cache";
pub const DEFAULT_TOOL: &str = "bk-fetch";
pub const DEFAULT_JOB_FILTER: &str = "playwright";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join(CACHE_DIR_NAME)
}

static UNSAFE_CHARS_RE: OnceLock<Regex> = OnceLock::new();

fn unsafe_chars_re() -> &'static Regex {
    UNSAFE_CHARS_RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]").unwrap())
}

/// Replace anything that is not safe in a file name with `_`.
pub fn sanitize_component(value: &str) -> String {
    let cleaned = unsafe_chars_re().replace_all(value, "_");
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned.into_owned()
    }
}

pub fn cache_file_name(key: &CacheIdentity) -> String {
    format!(
        "{}__{}__{}__{}.json",
        sanitize_component(&key.org_slug),
        sanitize_component(&key.pipeline_slug),
        sanitize_component(&key.build_number),
        sanitize_component(&key.tool_path),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
