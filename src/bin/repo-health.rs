//! CLI tool for fetching repository data and computing health metrics

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use repo_health_metrics::{
    get_metric, get_metrics, CanonicalRecord, ExecutorConfig, MetricOutcome, RepositoryQuery,
};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "repo-health")]
#[command(about = "Fetch GitHub repository data and derive open-source-health metrics", long_about = None)]
#[command(version)]
struct Cli {
    /// Repository to inspect, as owner/name
    #[arg(short = 'r', long = "repo")]
    repository: String,

    /// GitHub API token (falls back to the GITHUB_TOKEN environment variable)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: String,

    /// Path to custom executor configuration (TOML)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Fragments to acquire (default: all known fragments)
    #[arg(long = "fragment")]
    fragments: Vec<String>,

    /// Honor the API rate-limit budget, waiting for resets when low
    #[arg(long)]
    rate_limit: bool,

    /// Enable verbose logging and per-round progress
    #[arg(short = 'v', long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the repository record and print it as JSON
    Fetch {
        /// Output file (default: stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Fetch the repository record and compute health metrics
    Score {
        /// Compute only the named metric
        #[arg(long)]
        metric: Option<String>,

        /// Output file (default: stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let (owner, name) = parse_slug(&cli.repository)?;

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ExecutorConfig::default(),
    };
    config.rate_limit |= cli.rate_limit;
    config.verbose |= cli.verbose;

    let mut query = RepositoryQuery::new(owner, name);
    if cli.fragments.is_empty() {
        query = query.select_all();
    } else {
        for fragment in &cli.fragments {
            query = query.select(fragment)?;
        }
    }

    let spinner = acquisition_spinner(&cli.repository);
    let record = match query.execute(&cli.token, &config).await {
        Ok(record) => {
            spinner.finish_and_clear();
            record
        }
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };

    match cli.command {
        Commands::Fetch { output } => {
            let rendered = serde_json::to_string_pretty(&record)?;
            write_output(output.as_deref(), &rendered)?;
        }
        Commands::Score { metric, output } => {
            let report = match metric {
                Some(name) => {
                    let outcome = get_metric(&name, &record)?;
                    let mut single = repo_health_metrics::MetricReport::new();
                    let _ = single.insert(name, outcome);
                    single
                }
                None => get_metrics(&record),
            };
            let rendered = serde_json::to_string_pretty(&report)?;
            write_output(output.as_deref(), &rendered)?;
            print_summary(&cli.repository, &record, &report);
        }
    }

    Ok(())
}

/// Split an `owner/name` slug
fn parse_slug(slug: &str) -> anyhow::Result<(String, String)> {
    match slug.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner.to_string(), name.to_string()))
        }
        _ => Err(anyhow!("expected repository as owner/name, got '{}'", slug)),
    }
}

fn load_config(path: &Path) -> anyhow::Result<ExecutorConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("invalid config at {}", path.display()))
}

fn write_output(path: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{}", content),
    }
    Ok(())
}

fn acquisition_spinner(slug: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("fetching {}", slug));
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

fn print_summary(
    slug: &str,
    record: &CanonicalRecord,
    report: &repo_health_metrics::MetricReport,
) {
    let failed = report.values().filter(|o| o.is_failed()).count();
    let computed = report.len() - failed;
    eprintln!(
        "{} {}: {} fragments, {} metrics computed, {}",
        "Done".green().bold(),
        slug,
        record.len(),
        computed,
        if failed == 0 {
            "no failures".to_string()
        } else {
            format!("{}", format!("{} failed", failed).yellow())
        }
    );
    if let Some(rate) = &record.rate_limit {
        eprintln!(
            "rate limit: {} cost, {} of {} remaining",
            rate.cost, rate.remaining, rate.limit
        );
    }
    for (name, outcome) in report {
        if let MetricOutcome::Failed { reason } = outcome {
            eprintln!("  {} {}: {}", "failed".yellow(), name, reason);
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("repo_health_metrics=debug,repo_health=debug"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("repo_health_metrics=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
