//! Veriweb CLI
//!
//! Runs a JSON step sequence against a target application and reports
//! the outcome.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use url::Url;

use veriweb::browser::SessionConfig;
use veriweb::runner::{RunnerConfig, VerificationRunner};
use veriweb::step;

/// Declarative UI-flow verification runner
#[derive(Parser, Debug)]
#[command(name = "veriweb")]
#[command(version)]
#[command(about = "Run a declarative UI verification flow against a web application")]
struct Args {
    /// Path to a JSON file holding the step sequence
    steps: PathBuf,

    /// Base address of the application under verification
    #[arg(short, long, default_value = "http://localhost:8080")]
    base_url: Url,

    /// Directory receiving screenshot artifacts
    #[arg(short, long, default_value = "artifacts")]
    artifact_dir: PathBuf,

    /// Default step timeout in milliseconds
    #[arg(short, long, default_value = "10000")]
    timeout_ms: u64,

    /// Test-identification attribute used by bare selectors
    #[arg(long, default_value = "data-test")]
    test_attribute: String,

    /// Fail the run when the page reported console errors
    #[arg(long)]
    fail_on_page_errors: bool,

    /// Run the browser with a visible window
    #[arg(long)]
    headed: bool,

    /// Path to Chrome/Chromium executable
    #[arg(long)]
    chrome_path: Option<String>,

    /// Emit the full RunResult as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let steps = step::load_steps(&args.steps)
        .with_context(|| format!("loading steps from {}", args.steps.display()))?;
    tracing::info!(
        "Running {} step(s) against {}",
        steps.len(),
        args.base_url
    );

    let mut session = SessionConfig::builder().headless(!args.headed);
    if let Some(path) = args.chrome_path {
        session = session.chrome_path(path);
    }

    let config = RunnerConfig::builder()
        .base_url(args.base_url)
        .artifact_dir(args.artifact_dir)
        .default_timeout_ms(args.timeout_ms)
        .test_attribute(args.test_attribute)
        .fail_on_page_errors(args.fail_on_page_errors)
        .session(session.build())
        .build();

    let runner = VerificationRunner::new(config);
    let result = runner.run(&steps).await.context("running verification")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.success {
        println!(
            "PASS: {} step(s) in {}ms, {} artifact(s)",
            result.steps_executed,
            result.duration_ms,
            result.artifact_paths.len()
        );
    } else {
        let index = result
            .failed_step_index
            .map(|i| i.to_string())
            .unwrap_or_else(|| "-".to_string());
        let detail = result
            .error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown failure".to_string());
        println!("FAIL at step {}: {}", index, detail);
        for path in &result.artifact_paths {
            println!("  artifact: {}", path.display());
        }
    }

    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
