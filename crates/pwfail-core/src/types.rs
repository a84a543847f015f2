//! Boundary types for the build/job data returned by the fetch tool, and the
//! per-job failure record produced by extraction.
//!
//! Parsing is lenient per job: a job missing its `id` or `name` is dropped
//! rather than failing the whole build.

use crate::error::{PwfailError, Result};
use crate::summary::{FailedTests, TestEntry};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STATE_FAILED: &str = "failed";
pub const STATE_UNKNOWN: &str = "unknown";

// ---------------------------------------------------------------------------
// BuildInfo / JobDescriptor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub number: Option<u64>,
    pub web_url: Option<String>,
    pub branch: Option<String>,
    pub commit: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    pub id: String,
    pub name: String,
    pub state: String,
    pub job_url: Option<String>,
}

impl JobDescriptor {
    pub fn is_failed(&self) -> bool {
        self.state == STATE_FAILED
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildResponse {
    pub build: BuildInfo,
    pub jobs: Vec<JobDescriptor>,
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl BuildResponse {
    pub fn from_json(value: &Value) -> Result<Self> {
        if !value.is_object() {
            return Err(PwfailError::MalformedEnvelope(
                "build response is not a JSON object".into(),
            ));
        }

        let number = match value.get("number") {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };
        let build = BuildInfo {
            number,
            web_url: str_field(value, "web_url"),
            branch: str_field(value, "branch"),
            commit: str_field(value, "commit"),
            message: str_field(value, "message"),
        };

        let jobs = value
            .get("jobs")
            .and_then(Value::as_array)
            .map(|jobs| jobs.iter().filter_map(parse_job).collect())
            .unwrap_or_default();

        Ok(Self { build, jobs })
    }

    pub fn job(&self, id: &str) -> Option<&JobDescriptor> {
        self.jobs.iter().find(|j| j.id == id)
    }
}

fn parse_job(value: &Value) -> Option<JobDescriptor> {
    let (Some(id), Some(name)) = (str_field(value, "id"), str_field(value, "name")) else {
        tracing::debug!(job = %value, "skipping job without id or name");
        return None;
    };
    Some(JobDescriptor {
        id,
        name,
        state: str_field(value, "state").unwrap_or_else(|| STATE_UNKNOWN.to_string()),
        job_url: str_field(value, "web_url"),
    })
}

/// Pull the raw log text out of a `job-log` envelope.
pub fn log_content(value: &Value) -> Result<String> {
    value
        .get("content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| PwfailError::MalformedEnvelope("job log has no 'content' string".into()))
}

// ---------------------------------------------------------------------------
// FailureRecord
// ---------------------------------------------------------------------------

/// Extraction outcome for one failed job. Either the test lists are filled
/// or `error` is set, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    pub job_name: String,
    pub job_id: String,
    pub job_url: Option<String>,
    pub label: String,
    pub state: String,
    pub failed_line: Option<String>,
    pub failed_line_row: Option<usize>,
    pub tests: Vec<String>,
    pub test_entries: Vec<TestEntry>,
    pub error: Option<String>,
}

impl FailureRecord {
    pub fn extracted(job: &JobDescriptor, label: String, failed: FailedTests) -> Self {
        Self {
            job_name: job.name.clone(),
            job_id: job.id.clone(),
            job_url: job.job_url.clone(),
            label,
            state: job.state.clone(),
            failed_line: failed.failed_line,
            failed_line_row: failed.failed_line_row,
            tests: failed.tests,
            test_entries: failed.test_entries,
            error: None,
        }
    }

    pub fn errored(job: &JobDescriptor, label: String, error: impl Into<String>) -> Self {
        Self {
            job_name: job.name.clone(),
            job_id: job.id.clone(),
            job_url: job.job_url.clone(),
            label,
            state: job.state.clone(),
            failed_line: None,
            failed_line_row: None,
            tests: Vec::new(),
            test_entries: Vec::new(),
            error: Some(error.into()),
        }
    }
}
