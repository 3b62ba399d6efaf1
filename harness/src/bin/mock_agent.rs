//! Mock supervised service used by the integration tests.
//!
//! Honors the reload contract the harness verifies: emits a line
//! containing "Starting" at boot, and on each SIGHUP emits
//! "Caught SIGHUP" followed by "Pipeline config: " plus the freshly
//! re-read pipeline definition. Markers go to stderr, which is the
//! stream the harness watches. It carries no pipeline logic of its
//! own beyond re-reading the file it was pointed at.

use std::path::PathBuf;

use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};

use harness::PipelineConfig;

#[derive(Parser)]
#[command(name = "mock-agent")]
#[command(about = "SIGHUP-aware stand-in for a supervised service")]
struct Args {
    /// Host configuration file (INI-like key/value content)
    #[arg(long)]
    config_file: PathBuf,
}

/// Pull `pipeline_cfg_file` out of the INI-like host config.
fn pipeline_file_from(conf: &str) -> Option<PathBuf> {
    conf.lines()
        .filter_map(|line| line.split_once('='))
        .find(|(key, _)| key.trim() == "pipeline_cfg_file")
        .map(|(_, value)| PathBuf::from(value.trim()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let conf = std::fs::read_to_string(&args.config_file)?;
    let pipeline_path =
        pipeline_file_from(&conf).ok_or("no pipeline_cfg_file entry in host config")?;

    // Fail fast on a malformed pipeline definition.
    PipelineConfig::load(&pipeline_path)?;

    // Handlers must be in place before the startup marker goes out, or
    // a prompt SIGHUP from the harness would terminate us.
    let mut hangup = signal(SignalKind::hangup())?;
    let mut terminate = signal(SignalKind::terminate())?;

    eprintln!("Starting mock-agent (PID: {})", std::process::id());

    loop {
        tokio::select! {
            _ = hangup.recv() => {
                eprintln!("Caught SIGHUP, reloading configuration");
                let reloaded = PipelineConfig::load(&pipeline_path)?;
                eprintln!("Pipeline config: {}", reloaded.to_line()?);
            }
            _ = terminate.recv() => break,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}
