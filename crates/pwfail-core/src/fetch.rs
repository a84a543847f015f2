//! Build and job-log retrieval through an external fetch tool.
//!
//! The tool is any executable that speaks this protocol on stdout:
//!
//! - `TOOL build --org O --pipeline P --build N` prints the build JSON object
//!   (`number`, `web_url`, `branch`, `commit`, `message`, `jobs[]`).
//! - `TOOL job-log --org O --pipeline P --build N --job-id ID` prints
//!   `{"content": "<raw log text>"}`.
//!
//! Every fetch is a single attempt. A non-zero exit is a transport error that
//! carries the head of stderr. Children are spawned with `kill_on_drop`, so
//! dropping a pending fetch future terminates the process.

use std::future::Future;
use std::process::Stdio;

use serde_json::Value;
use tokio::process::Command;

use crate::error::{PwfailError, Result};
use crate::types::{log_content, BuildResponse};

const HINT_CHARS: usize = 500;

/// Identifies one CI build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRef {
    pub org: String,
    pub pipeline: String,
    pub build: String,
}

/// The two fetches the pipelines need.
pub trait BuildSource {
    fn fetch_build(&self, build: &BuildRef) -> impl Future<Output = Result<BuildResponse>> + Send;

    fn fetch_job_log(
        &self,
        build: &BuildRef,
        job_id: &str,
    ) -> impl Future<Output = Result<String>> + Send;
}

// ---------------------------------------------------------------------------
// CommandSource
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CommandSource {
    tool: String,
}

impl CommandSource {
    pub fn new(tool: impl Into<String>) -> Self {
        Self { tool: tool.into() }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    async fn run_json(&self, args: &[&str]) -> Result<Value> {
        tracing::debug!(tool = %self.tool, ?args, "running fetch tool");

        let output = Command::new(&self.tool)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PwfailError::FetchSpawnFailed {
                tool: self.tool.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let hint = stderr.trim().chars().take(HINT_CHARS).collect::<String>();
            return Err(PwfailError::FetchFailed {
                status: output.status.to_string(),
                hint,
            });
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| PwfailError::MalformedEnvelope(format!("invalid JSON on stdout: {e}")))
    }
}

impl BuildSource for CommandSource {
    async fn fetch_build(&self, build: &BuildRef) -> Result<BuildResponse> {
        let value = self
            .run_json(&[
                "build",
                "--org",
                &build.org,
                "--pipeline",
                &build.pipeline,
                "--build",
                &build.build,
            ])
            .await?;
        BuildResponse::from_json(&value)
    }

    async fn fetch_job_log(&self, build: &BuildRef, job_id: &str) -> Result<String> {
        let value = self
            .run_json(&[
                "job-log",
                "--org",
                &build.org,
                "--pipeline",
                &build.pipeline,
                "--build",
                &build.build,
                "--job-id",
                job_id,
            ])
            .await?;
        log_content(&value)
    }
}
