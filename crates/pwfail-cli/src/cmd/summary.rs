use super::{run_until_interrupted, Outcome};
use crate::output::{print_json, print_table};
use crate::settings::Settings;
use crate::Cli;
use anyhow::Context;
use pwfail_core::{
    cache::FsCacheStore,
    fetch::CommandSource,
    pipeline::{summarize_build, BuildReport, SummaryRequest},
};

pub fn run(settings: &Settings, cli: &Cli) -> anyhow::Result<Outcome> {
    let source = CommandSource::new(settings.tool_path.clone());
    let store = FsCacheStore::new(settings.cache_dir.clone());
    let req = SummaryRequest {
        build: settings.build.clone(),
        tool_path: settings.tool_path.clone(),
        job_filter: settings.job_filter.clone(),
        use_cache: !cli.no_cache,
    };

    let Some(report) = run_until_interrupted(summarize_build(&source, &store, &req))
        .with_context(|| format!("failed to summarize build {}", req.build.build))?
    else {
        return Ok(Outcome::Cancelled);
    };

    if cli.table {
        print_report(&report);
    } else {
        print_json(&report)?;
    }
    Ok(Outcome::Completed)
}

fn print_report(report: &BuildReport) {
    let number = report
        .build
        .number
        .map(|n| n.to_string())
        .unwrap_or_else(|| "?".into());
    let branch = report.build.branch.as_deref().unwrap_or("-");
    println!("Build:         #{number} ({branch})");
    if let Some(url) = &report.build.web_url {
        println!("URL:           {url}");
    }

    let summary = &report.summary;
    println!("Failed jobs:   {}", summary.failed_jobs);
    println!("Environments:  {}", summary.environments.join(", "));
    println!(
        "Failing tests: {} ({} everywhere, {} multiple, {} single)",
        summary.unique_failing_tests,
        summary.tests_failing_everywhere.len(),
        summary.tests_failing_multiple.len(),
        summary.tests_failing_single.len()
    );
    if report.meta.cached {
        println!("(cached)");
    }

    if !summary.tests_by_test.is_empty() {
        println!();
        let rows = summary
            .tests_by_test
            .iter()
            .map(|e| vec![e.count.to_string(), e.labels.join(", "), e.test_name.clone()])
            .collect();
        print_table(&["COUNT", "ENVIRONMENTS", "TEST"], rows);
    }

    if !summary.job_errors.is_empty() {
        println!();
        println!("Job errors:");
        for e in &summary.job_errors {
            println!("  {} [{}] {}: {}", e.job_id, e.label, e.job_name, e.error);
        }
    }
}
