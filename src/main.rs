use clap::{Parser, ValueEnum};
use minitwit_acceptance::domain::scenarios::{
    run_browser_suite, run_http_suite, ScenarioUsers, SuiteReport,
};
use minitwit_acceptance::infrastructure::config::{Config, LogFormat};
use minitwit_acceptance::infrastructure::http::MiniTwitClient;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SuiteSelection {
    All,
    Http,
    Browser,
}

/// Acceptance tests for a running MiniTwit deployment
#[derive(Debug, Parser)]
#[command(name = "minitwit-acceptance", version)]
struct Args {
    /// Which scenarios to run
    #[arg(long, value_enum, default_value = "all")]
    suite: SuiteSelection,

    /// Where to write the JSON run report
    #[arg(long, default_value = "acceptance-report.json")]
    report: PathBuf,

    /// Append this suffix to every scenario username
    #[arg(long)]
    user_suffix: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        target_url = %config.base_url(),
        suite = ?args.suite,
        verbose = config.is_verbose(),
        "Starting MiniTwit acceptance run"
    );

    let users = match &args.user_suffix {
        Some(suffix) => ScenarioUsers::suffixed(suffix),
        None => ScenarioUsers::default(),
    };

    let started_at = chrono::Utc::now();
    let mut results = Vec::new();

    if matches!(args.suite, SuiteSelection::All | SuiteSelection::Http) {
        let client = MiniTwitClient::new(&config.base_url(), config.phrasebook.clone())?;
        results.extend(run_http_suite(&client, &users).await);
    }

    if matches!(args.suite, SuiteSelection::All | SuiteSelection::Browser) {
        results.extend(run_browser_suite(&config, &users).await);
    }

    let report = SuiteReport::new(started_at, results);
    report.log_summary();
    report.write(&args.report)?;

    if !report.all_passed() {
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "minitwit_acceptance=info".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "minitwit_acceptance=info".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
