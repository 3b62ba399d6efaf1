//! Service Reload Verification Harness
//!
//! Verifies that a long-running service, when sent SIGHUP, re-reads
//! its pipeline configuration and resumes operation without a full
//! restart. The harness spawns the service, watches its stderr for
//! lifecycle markers within bounded time budgets, mutates the on-disk
//! configuration and compares the reloaded snapshot the service
//! reports against what was written.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use harness::{PipelineBinding, PipelineConfig, ReloadScenario, ScenarioConfig};
//!
//! # async fn demo() -> harness::HarnessResult<()> {
//! let initial = PipelineConfig::new(vec![PipelineBinding::new(
//!     "meters",
//!     vec!["cpu".into()],
//!     vec!["file".into()],
//! )]);
//! let updated = PipelineConfig::new(vec![PipelineBinding::new(
//!     "meters",
//!     vec!["cpu".into(), "memory".into()],
//!     vec!["file".into()],
//! )]);
//!
//! let config = ScenarioConfig::builder("./target/release/service")
//!     .marker_timeout(Duration::from_secs(10))
//!     .build();
//!
//! let state = ReloadScenario::run(config, &initial, &updated).await?;
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod config;
pub mod error;
pub mod scenario;
pub mod supervisor;
pub mod watcher;

// Main interfaces - re-exported at crate root for convenience
pub use config::{HostConfig, PipelineBinding, PipelineConfig, ScenarioConfig};
pub use error::{HarnessError, HarnessResult};
pub use scenario::{ReloadScenario, ScenarioState};
pub use supervisor::{wait_until, ProcessState, ServiceProcess};
pub use watcher::{OutputWatcher, WatchOutcome, WatchResult};

// Supporting types
pub use config::ScenarioConfigBuilder;
pub use scenario::{RELOAD_MARKER, SIGHUP_MARKER, STARTUP_MARKER};
pub use supervisor::POLL_INTERVAL;
