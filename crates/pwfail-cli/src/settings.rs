use crate::Cli;
use anyhow::{bail, Context};
use pwfail_core::{config::Config, fetch::BuildRef, paths};
use std::path::PathBuf;

/// Effective settings after layering flags/env over the config file over
/// built-in defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub build: BuildRef,
    pub tool_path: String,
    pub cache_dir: PathBuf,
    pub job_filter: String,
}

impl Settings {
    pub fn resolve(cli: &Cli) -> anyhow::Result<Self> {
        let config = match &cli.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => Config::default(),
        };
        merge(
            config,
            Overrides {
                org: cli.org.clone(),
                pipeline: cli.pipeline.clone(),
                build: cli.build.clone(),
                tool_path: cli.tool.clone(),
                cache_dir: cli.cache_dir.clone(),
                job_filter: cli.job_filter.clone(),
            },
        )
    }
}

struct Overrides {
    org: Option<String>,
    pipeline: Option<String>,
    build: String,
    tool_path: Option<String>,
    cache_dir: Option<PathBuf>,
    job_filter: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn merge(config: Config, overrides: Overrides) -> anyhow::Result<Settings> {
    let Some(org) = non_empty(overrides.org).or(non_empty(config.org)) else {
        bail!("missing required argument --org");
    };
    let Some(pipeline) = non_empty(overrides.pipeline).or(non_empty(config.pipeline)) else {
        bail!("missing required argument --pipeline");
    };
    if overrides.build.trim().is_empty() {
        bail!("missing required argument --build");
    }

    Ok(Settings {
        build: BuildRef {
            org,
            pipeline,
            build: overrides.build,
        },
        tool_path: non_empty(overrides.tool_path)
            .or(non_empty(config.tool_path))
            .unwrap_or_else(|| paths::DEFAULT_TOOL.to_string()),
        cache_dir: overrides
            .cache_dir
            .or(config.cache_dir)
            .unwrap_or_else(paths::default_cache_dir),
        job_filter: non_empty(overrides.job_filter)
            .or(non_empty(config.job_filter))
            .unwrap_or_else(|| paths::DEFAULT_JOB_FILTER.to_string()),
    })
}
