mod cmd;
mod output;
mod settings;

use clap::Parser;
use cmd::Outcome;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "playwright-failures",
    about = "Summarize Playwright failures across the browser jobs of a CI build",
    version
)]
struct Cli {
    /// CI organization slug
    #[arg(long, env = "PWFAIL_ORG")]
    org: Option<String>,

    /// CI pipeline slug
    #[arg(long, env = "PWFAIL_PIPELINE")]
    pipeline: Option<String>,

    /// Build number
    #[arg(long)]
    build: String,

    /// Look up the error block for this test instead of summarizing the build
    #[arg(long = "error-for", value_name = "TEST_NAME", requires = "job_id")]
    error_for: Option<String>,

    /// Job whose log holds the failure (with --error-for)
    #[arg(long, requires = "error_for")]
    job_id: Option<String>,

    /// Job URL to report in the error lookup
    #[arg(long)]
    job_url: Option<String>,

    /// Row of the "N failed" summary line, if already known
    #[arg(long)]
    failed_line_row: Option<usize>,

    /// Fetch tool executable (default: bk-fetch)
    #[arg(long = "tool", env = "PWFAIL_TOOL")]
    tool: Option<String>,

    /// Directory for cached summaries (default: <tmp>/playwright-failures-cache)
    #[arg(long, env = "PWFAIL_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Substring identifying Playwright jobs by name (default: playwright)
    #[arg(long, env = "PWFAIL_JOB_FILTER")]
    job_filter: Option<String>,

    /// YAML file with defaults for the options above
    #[arg(long, env = "PWFAIL_CONFIG")]
    config: Option<PathBuf>,

    /// Ignore any cached summary (the cache is still refreshed)
    #[arg(long)]
    no_cache: bool,

    /// Print a human-readable table instead of JSON
    #[arg(long)]
    table: bool,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = settings::Settings::resolve(&cli).and_then(|settings| match &cli.error_for {
        Some(test_name) => cmd::error_for::run(&settings, &cli, test_name),
        None => cmd::summary::run(&settings, &cli),
    });

    match result {
        Ok(Outcome::Completed) => {}
        Ok(Outcome::Cancelled) => {
            if let Err(e) = output::print_json(&serde_json::json!({ "cancelled": true })) {
                eprintln!("error: failed to write cancellation result: {e:#}");
            }
            std::process::exit(130);
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}
