use super::{run_until_interrupted, Outcome};
use crate::output::print_json;
use crate::settings::Settings;
use crate::Cli;
use anyhow::Context;
use pwfail_core::{
    fetch::CommandSource,
    pipeline::{lookup_error_block, ErrorLookupReport, ErrorLookupRequest},
};

pub fn run(settings: &Settings, cli: &Cli, test_name: &str) -> anyhow::Result<Outcome> {
    let Some(job_id) = cli.job_id.clone() else {
        anyhow::bail!("--error-for requires --job-id");
    };
    let req = ErrorLookupRequest {
        build: settings.build.clone(),
        test_name: test_name.to_string(),
        job_id,
        job_url: cli.job_url.clone(),
        failed_line_row: cli.failed_line_row,
    };
    req.validate()?;

    let source = CommandSource::new(settings.tool_path.clone());
    let Some(report) = run_until_interrupted(lookup_error_block(&source, &req))
        .with_context(|| format!("error lookup in job {} failed", req.job_id))?
    else {
        return Ok(Outcome::Cancelled);
    };

    if cli.table {
        print_block(&report);
    } else {
        print_json(&report)?;
    }
    Ok(Outcome::Completed)
}

fn print_block(report: &ErrorLookupReport) {
    let error = &report.error;
    println!("Test:  {}", error.test_name);
    println!("Job:   {}", error.job_id);
    if let Some(url) = &error.job_url {
        println!("URL:   {url}");
    }
    println!();
    let first = error.start_row.unwrap_or(1);
    for (offset, line) in error.lines.iter().enumerate() {
        println!("{:>6} | {line}", first + offset);
    }
}
