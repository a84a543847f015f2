//! The two end-to-end flows: summarizing a build's Playwright failures, and
//! looking up the error block for one failing test in one job.
//!
//! Jobs are processed one at a time, in the order the build lists them. A
//! problem with one job is recorded on that job's record and never stops the
//! others; only the initial build fetch is fatal.

use crate::aggregate::{summarize, BuildSummary};
use crate::cache::{CacheEntry, CacheIdentity, CachePayload, CacheStore, JobStates};
use crate::environment::classify;
use crate::error::{PwfailError, Result};
use crate::error_block::{extract_block, find_last_match_before};
use crate::fetch::{BuildRef, BuildSource};
use crate::log::{normalize, Normalization};
use crate::summary::{extract_failed_tests, find_summary_row, FailedTests};
use crate::types::{BuildInfo, FailureRecord, JobDescriptor};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub fn is_playwright_job(name: &str, filter: &str) -> bool {
    name.to_lowercase().contains(&filter.to_lowercase())
}

// ---------------------------------------------------------------------------
// Build summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub build: BuildRef,
    pub tool_path: String,
    pub job_filter: String,
    /// When false the cache is not consulted, but is still refreshed.
    pub use_cache: bool,
}

impl SummaryRequest {
    pub fn identity(&self) -> CacheIdentity {
        CacheIdentity {
            tool_path: self.tool_path.clone(),
            org_slug: self.build.org.clone(),
            pipeline_slug: self.build.pipeline.clone(),
            build_number: self.build.build.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    pub cached: bool,
    pub cache_path: Option<String>,
    pub cached_at: Option<DateTime<Utc>>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub build: BuildInfo,
    pub summary: BuildSummary,
    pub jobs: Vec<FailureRecord>,
    pub meta: ReportMeta,
}

/// Parse one job's log into its failed-test list. A failed job whose log has
/// no usable summary is a data problem and reported as an error.
pub fn failures_from_log(raw: &str) -> Result<FailedTests> {
    let lines = normalize(raw, Normalization::Scan);
    let failed = extract_failed_tests(&lines);
    if failed.failed_line_row.is_none() {
        return Err(PwfailError::NoSummaryLine);
    }
    if failed.tests.is_empty() {
        return Err(PwfailError::NoFailingTests);
    }
    Ok(failed)
}

pub async fn extract_job<S: BuildSource>(
    source: &S,
    build: &BuildRef,
    job: &JobDescriptor,
) -> FailureRecord {
    let label = classify(&job.name);
    let outcome = source
        .fetch_job_log(build, &job.id)
        .await
        .and_then(|raw| failures_from_log(&raw));
    match outcome {
        Ok(failed) => {
            tracing::debug!(job = %job.id, %label, tests = failed.tests.len(), "extracted failures");
            FailureRecord::extracted(job, label, failed)
        }
        Err(e) => {
            tracing::warn!(job = %job.id, %label, error = %e, "job extraction failed");
            FailureRecord::errored(job, label, e.to_string())
        }
    }
}

pub async fn summarize_build<S, C>(source: &S, store: &C, req: &SummaryRequest) -> Result<BuildReport>
where
    S: BuildSource,
    C: CacheStore,
{
    let checked_at = Utc::now();
    let response = source.fetch_build(&req.build).await?;

    let playwright_jobs: Vec<&JobDescriptor> = response
        .jobs
        .iter()
        .filter(|j| is_playwright_job(&j.name, &req.job_filter))
        .collect();
    let live_states: JobStates = playwright_jobs
        .iter()
        .map(|j| (j.id.clone(), j.state.clone()))
        .collect();

    let key = req.identity();
    let cache_path = store.location(&key);

    if req.use_cache {
        match store.get(&key) {
            Some(entry) if entry.is_valid(&key, &live_states) => {
                tracing::info!(build = %req.build.build, "using cached summary");
                return Ok(BuildReport {
                    build: entry.payload.build,
                    summary: entry.payload.summary,
                    jobs: entry.payload.jobs,
                    meta: ReportMeta {
                        cached: true,
                        cache_path,
                        cached_at: Some(entry.meta.cached_at),
                        checked_at,
                    },
                });
            }
            Some(_) => tracing::info!(build = %req.build.build, "cached summary is stale"),
            None => tracing::debug!(build = %req.build.build, "no cached summary"),
        }
    }

    let mut records = Vec::new();
    for job in playwright_jobs.iter().filter(|j| j.is_failed()) {
        records.push(extract_job(source, &req.build, job).await);
    }

    let entry = CacheEntry::new(
        &key,
        live_states,
        CachePayload {
            build: response.build,
            summary: summarize(&records),
            jobs: records,
        },
    );
    if let Err(e) = store.put(&key, &entry) {
        tracing::warn!(error = %e, "failed to write cache entry");
    }

    Ok(BuildReport {
        build: entry.payload.build,
        summary: entry.payload.summary,
        jobs: entry.payload.jobs,
        meta: ReportMeta {
            cached: false,
            cache_path,
            cached_at: Some(entry.meta.cached_at),
            checked_at,
        },
    })
}

// ---------------------------------------------------------------------------
// Error lookup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ErrorLookupRequest {
    pub build: BuildRef,
    pub test_name: String,
    pub job_id: String,
    pub job_url: Option<String>,
    /// Row of the failed summary line, if the caller already knows it.
    pub failed_line_row: Option<usize>,
}

impl ErrorLookupRequest {
    pub fn validate(&self) -> Result<()> {
        if self.test_name.trim().is_empty() {
            return Err(PwfailError::Usage("test name must not be empty".into()));
        }
        if self.job_id.trim().is_empty() {
            return Err(PwfailError::Usage("job id must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub test_name: String,
    pub job_id: String,
    pub job_url: Option<String>,
    pub match_row: Option<usize>,
    pub start_row: Option<usize>,
    pub end_row: Option<usize>,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupMeta {
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorLookupReport {
    pub error: ErrorDetail,
    pub meta: LookupMeta,
    pub build: BuildInfo,
}

pub async fn lookup_error_block<S: BuildSource>(
    source: &S,
    req: &ErrorLookupRequest,
) -> Result<ErrorLookupReport> {
    req.validate()?;
    let checked_at = Utc::now();
    let response = source.fetch_build(&req.build).await?;
    let raw = source.fetch_job_log(&req.build, &req.job_id).await?;

    let needle = req.test_name.trim();
    let summary_row = match req.failed_line_row {
        Some(row) => Some(row),
        None => find_summary_row(&normalize(&raw, Normalization::Scan)),
    };

    let lines = normalize(&raw, Normalization::Preserve);
    let match_row = find_last_match_before(&lines, needle, summary_row);
    let block = extract_block(&lines, match_row.unwrap_or(0), needle);
    if block.is_empty() {
        return Err(PwfailError::ErrorBlockNotFound(needle.to_string()));
    }
    tracing::debug!(?summary_row, ?match_row, rows = block.lines.len(), "extracted error block");

    let job_url = req
        .job_url
        .clone()
        .or_else(|| response.job(&req.job_id).and_then(|j| j.job_url.clone()));

    Ok(ErrorLookupReport {
        error: ErrorDetail {
            test_name: req.test_name.clone(),
            job_id: req.job_id.clone(),
            job_url,
            match_row,
            start_row: block.start_row,
            end_row: block.end_row,
            lines: block.lines,
        },
        meta: LookupMeta { checked_at },
        build: response.build,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
