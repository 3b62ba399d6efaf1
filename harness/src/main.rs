//! Reload scenario runner
//!
//! Spawns the target service, drives one SIGHUP reload scenario
//! against it and reports the outcome.

use clap::Parser;
use std::time::Duration;
use tokio::time::timeout;

use harness::{PipelineBinding, PipelineConfig, ReloadScenario, ScenarioConfig};

#[derive(Parser)]
#[command(name = "harness")]
#[command(about = "SIGHUP reload verification harness")]
struct Args {
    /// Service executable to verify (invoked with --config-file=<path>)
    #[arg(long)]
    service: String,

    /// Overall scenario timeout in seconds
    #[arg(long, default_value = "120")]
    timeout_secs: u64,

    /// Per-marker watch timeout in seconds
    #[arg(long, default_value = "10")]
    marker_timeout_secs: u64,

    /// Enable verbose tracing output
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    init_harness_tracing(args.verbose);

    tracing::info!("🧪 Verifying reload behavior of '{}'", args.service);

    let initial = PipelineConfig::new(vec![PipelineBinding::new(
        "meters",
        vec!["cpu".into()],
        vec!["file".into()],
    )]);
    let updated = PipelineConfig::new(vec![PipelineBinding::new(
        "meters",
        vec!["cpu".into(), "memory".into()],
        vec!["file".into()],
    )]);

    let config = ScenarioConfig::builder(args.service.as_str())
        .marker_timeout(Duration::from_secs(args.marker_timeout_secs))
        .build();

    let outcome = timeout(
        Duration::from_secs(args.timeout_secs),
        ReloadScenario::run(config, &initial, &updated),
    )
    .await;

    match outcome {
        Ok(Ok(state)) => {
            tracing::info!("✅ Scenario finished in state {:?}", state);
            Ok(())
        }
        Ok(Err(e)) => {
            tracing::error!("❌ Scenario failed: {}", e);
            Err(e.into())
        }
        Err(_) => {
            tracing::error!("⏰ Scenario timed out after {}s", args.timeout_secs);
            Err("scenario timeout".into())
        }
    }
}

fn init_harness_tracing(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = if verbose {
        EnvFilter::new("harness=debug,info")
    } else {
        EnvFilter::new("harness=info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
