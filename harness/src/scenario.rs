//! Reload verification scenario
//!
//! The integration scenario itself, expressed as a state machine:
//! `NotStarted → Started → SignalSent → ReloadConfirmed | Failed`.
//! All fixtures live in a per-scenario temp directory, so concurrent
//! scenarios cannot interfere; the child is killed and reaped on every
//! exit path.

use std::path::PathBuf;
use std::time::Duration;

use nix::sys::signal::Signal;
use tempfile::TempDir;
use tokio::process::ChildStderr;

use crate::config::{HostConfig, PipelineConfig, ScenarioConfig};
use crate::error::{HarnessError, HarnessResult};
use crate::supervisor::{wait_until, ServiceProcess};
use crate::watcher::{OutputWatcher, WatchOutcome, WatchResult};

/// Marker emitted when the service finishes booting.
pub const STARTUP_MARKER: &str = "Starting";
/// Marker emitted when the service receives the reload signal.
pub const SIGHUP_MARKER: &str = "Caught SIGHUP";
/// Marker prefixing the serialized reloaded pipeline configuration.
pub const RELOAD_MARKER: &str = "Pipeline config: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioState {
    NotStarted,
    Started,
    SignalSent,
    ReloadConfirmed,
    Failed,
}

impl ScenarioState {
    fn name(self) -> &'static str {
        match self {
            ScenarioState::NotStarted => "NotStarted",
            ScenarioState::Started => "Started",
            ScenarioState::SignalSent => "SignalSent",
            ScenarioState::ReloadConfirmed => "ReloadConfirmed",
            ScenarioState::Failed => "Failed",
        }
    }
}

/// A single restart/reload verification scenario.
pub struct ReloadScenario {
    config: ScenarioConfig,
    workdir: TempDir,
    pipeline_path: PathBuf,
    host_conf_path: PathBuf,
    state: ScenarioState,
    service: Option<ServiceProcess>,
    watcher: Option<OutputWatcher<ChildStderr>>,
    reference: Option<PipelineConfig>,
}

impl ReloadScenario {
    /// Lay out the scenario fixtures in a fresh temp directory: the
    /// initial pipeline definition and the host config pointing at it.
    pub fn new(config: ScenarioConfig, initial: &PipelineConfig) -> HarnessResult<Self> {
        let workdir = TempDir::with_prefix("reload-scenario-")?;

        let pipeline_path = workdir.path().join("pipeline.json");
        initial.store(&pipeline_path)?;

        let host_conf_path = workdir.path().join("service.conf");
        HostConfig::new(&pipeline_path).write_to(&host_conf_path)?;

        Ok(Self {
            config,
            workdir,
            pipeline_path,
            host_conf_path,
            state: ScenarioState::NotStarted,
            service: None,
            watcher: None,
            reference: None,
        })
    }

    pub fn state(&self) -> ScenarioState {
        self.state
    }

    /// Scratch directory holding this scenario's fixtures.
    pub fn workdir(&self) -> &std::path::Path {
        self.workdir.path()
    }

    /// `NotStarted → Started`: spawn the service, observe the startup
    /// marker on its stderr, confirm it is alive.
    pub async fn start(&mut self) -> HarnessResult<()> {
        if self.state != ScenarioState::NotStarted {
            let state = self.state.name();
            return self.fail(HarnessError::OutOfOrder { state });
        }

        let mut service = match ServiceProcess::spawn(
            &self.config.service_command,
            std::iter::empty::<&str>(),
            Some(&self.host_conf_path),
        ) {
            Ok(service) => service,
            Err(e) => return self.fail(e),
        };

        let Some(stderr) = service.take_stderr() else {
            let _ = service.kill_and_wait().await;
            return self.fail(HarnessError::Io(std::io::Error::other(
                "service stderr was not piped",
            )));
        };
        let pid = service.pid();
        tracing::info!(
            "🚀 Spawned '{}' (PID: {})",
            self.config.service_command,
            pid
        );

        let mut watcher = OutputWatcher::new(stderr);
        let started = watcher
            .watch(STARTUP_MARKER, self.config.startup_timeout)
            .await;
        self.watcher = Some(watcher);

        if let Err(e) = Self::check_match(&started, STARTUP_MARKER, self.config.startup_timeout) {
            self.service = Some(service);
            return self.fail(e);
        }

        let alive = wait_until(|| service.is_alive(), self.config.liveness_timeout).await;
        self.service = Some(service);
        if !alive {
            return self.fail(HarnessError::UnexpectedExit { pid });
        }

        self.state = ScenarioState::Started;
        tracing::info!("✅ Service startup confirmed (PID: {})", pid);
        Ok(())
    }

    /// `Started → SignalSent`: overwrite the pipeline file, re-read the
    /// reference snapshot from disk, deliver SIGHUP.
    pub fn trigger_reload(&mut self, updated: &PipelineConfig) -> HarnessResult<()> {
        if self.state != ScenarioState::Started {
            let state = self.state.name();
            return self.fail(HarnessError::OutOfOrder { state });
        }

        if let Err(e) = updated.store(&self.pipeline_path) {
            return self.fail(e);
        }
        // Re-read from disk so the reference reflects exactly what the
        // child will parse, not what we think we wrote.
        let reference = match PipelineConfig::load(&self.pipeline_path) {
            Ok(reference) => reference,
            Err(e) => return self.fail(e),
        };
        self.reference = Some(reference);

        let signalled = self
            .service
            .as_ref()
            .map(|service| (service.pid(), service.signal(Signal::SIGHUP)));
        match signalled {
            Some((pid, Ok(()))) => {
                self.state = ScenarioState::SignalSent;
                tracing::info!("📨 Delivered SIGHUP to PID {}", pid);
                Ok(())
            }
            Some((_, Err(e))) => self.fail(e),
            None => {
                let state = self.state.name();
                self.fail(HarnessError::OutOfOrder { state })
            }
        }
    }

    /// `SignalSent → ReloadConfirmed`: the service must stay alive,
    /// acknowledge the signal and report a reloaded configuration equal
    /// to the reference snapshot.
    pub async fn confirm(&mut self) -> HarnessResult<()> {
        if self.state != ScenarioState::SignalSent {
            let state = self.state.name();
            return self.fail(HarnessError::OutOfOrder { state });
        }

        let Some(service) = self.service.take() else {
            let state = self.state.name();
            return self.fail(HarnessError::OutOfOrder { state });
        };
        let pid = service.pid();
        let alive = wait_until(|| service.is_alive(), self.config.liveness_timeout).await;
        self.service = Some(service);
        if !alive {
            return self.fail(HarnessError::UnexpectedExit { pid });
        }

        let Some(mut watcher) = self.watcher.take() else {
            let state = self.state.name();
            return self.fail(HarnessError::OutOfOrder { state });
        };

        let caught = watcher
            .watch(SIGHUP_MARKER, self.config.marker_timeout)
            .await;
        if let Err(e) = Self::check_match(&caught, SIGHUP_MARKER, self.config.marker_timeout) {
            self.watcher = Some(watcher);
            return self.fail(e);
        }
        tracing::info!("✅ Signal receipt confirmed");

        let reloaded = watcher
            .watch(RELOAD_MARKER, self.config.marker_timeout)
            .await;
        self.watcher = Some(watcher);
        let payload = match Self::check_match(&reloaded, RELOAD_MARKER, self.config.marker_timeout)
        {
            Ok(payload) => payload,
            Err(e) => return self.fail(e),
        };

        let observed = match PipelineConfig::parse(&payload) {
            Ok(observed) => observed,
            Err(e) => return self.fail(e),
        };
        let Some(expected) = self.reference.clone() else {
            let state = self.state.name();
            return self.fail(HarnessError::OutOfOrder { state });
        };
        if observed != expected {
            let expected = expected
                .to_line()
                .unwrap_or_else(|_| "<unserializable>".to_string());
            return self.fail(HarnessError::ConfigMismatch {
                expected,
                observed: payload,
            });
        }

        self.state = ScenarioState::ReloadConfirmed;
        tracing::info!("✅ Reload confirmed (PID: {})", pid);
        Ok(())
    }

    /// Kill and reap the child. Temp files are removed when the
    /// scenario is dropped. Idempotent.
    pub async fn shutdown(&mut self) {
        // Drop any reader still holding the stderr pipe.
        self.watcher = None;
        if let Some(mut service) = self.service.take() {
            let pid = service.pid();
            if let Err(e) = service.kill_and_wait().await {
                tracing::warn!("⚠️ Failed to reap service (PID: {}): {}", pid, e);
            }
        }
    }

    /// Run the whole scenario, releasing resources on every exit path.
    pub async fn run(
        config: ScenarioConfig,
        initial: &PipelineConfig,
        updated: &PipelineConfig,
    ) -> HarnessResult<ScenarioState> {
        let mut scenario = Self::new(config, initial)?;
        let result = scenario.execute(updated).await;
        scenario.shutdown().await;
        result.map(|()| scenario.state)
    }

    async fn execute(&mut self, updated: &PipelineConfig) -> HarnessResult<()> {
        self.start().await?;
        self.trigger_reload(updated)?;
        self.confirm().await
    }

    fn check_match(result: &WatchResult, marker: &str, budget: Duration) -> HarnessResult<String> {
        match result.outcome {
            WatchOutcome::Matched => Ok(result.remainder.clone().unwrap_or_default()),
            WatchOutcome::TimedOut => Err(HarnessError::WatchTimeout {
                marker: marker.to_string(),
                timeout: budget,
            }),
            WatchOutcome::StreamClosed => Err(HarnessError::StreamClosed {
                marker: marker.to_string(),
            }),
        }
    }

    fn fail<T>(&mut self, err: HarnessError) -> HarnessResult<T> {
        self.state = ScenarioState::Failed;
        tracing::error!("❌ Scenario failed: {}", err);
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineBinding;

    fn sample_pipeline() -> PipelineConfig {
        PipelineConfig::new(vec![PipelineBinding::new(
            "meters",
            vec!["cpu".into()],
            vec!["file".into()],
        )])
    }

    fn sample_config() -> ScenarioConfig {
        ScenarioConfig::builder("./nonexistent-service").build()
    }

    #[test]
    fn fixtures_are_laid_out_in_a_fresh_tempdir() {
        let scenario = ReloadScenario::new(sample_config(), &sample_pipeline()).unwrap();
        assert_eq!(scenario.state(), ScenarioState::NotStarted);

        let on_disk = PipelineConfig::load(&scenario.pipeline_path).unwrap();
        assert_eq!(on_disk, sample_pipeline());

        let conf = std::fs::read_to_string(&scenario.host_conf_path).unwrap();
        assert!(conf.contains("pipeline_cfg_file="));
        assert!(conf.contains(scenario.pipeline_path.to_str().unwrap()));
    }

    #[test]
    fn two_scenarios_use_distinct_workdirs() {
        let a = ReloadScenario::new(sample_config(), &sample_pipeline()).unwrap();
        let b = ReloadScenario::new(sample_config(), &sample_pipeline()).unwrap();
        assert_ne!(a.workdir.path(), b.workdir.path());
    }

    #[test]
    fn steps_out_of_order_fail_the_scenario() {
        let mut scenario = ReloadScenario::new(sample_config(), &sample_pipeline()).unwrap();
        let err = scenario.trigger_reload(&sample_pipeline()).unwrap_err();
        assert!(matches!(err, HarnessError::OutOfOrder { .. }));
        assert_eq!(scenario.state(), ScenarioState::Failed);
    }

    #[tokio::test]
    async fn spawn_failure_moves_to_failed() {
        let mut scenario = ReloadScenario::new(sample_config(), &sample_pipeline()).unwrap();
        let err = scenario.start().await.unwrap_err();
        assert!(matches!(err, HarnessError::Spawn { .. }));
        assert_eq!(scenario.state(), ScenarioState::Failed);
        scenario.shutdown().await;
    }
}
