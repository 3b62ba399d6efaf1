//! Scenario and service configuration
//!
//! Configuration handed to the supervised service (host config +
//! pipeline definition) and the parameters driving a scenario run.

pub mod host;
pub mod pipeline;

pub use host::HostConfig;
pub use pipeline::{PipelineBinding, PipelineConfig};

use std::time::Duration;

/// Default budget for observing the startup marker.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(60);
/// Default budget for each post-signal marker watch.
pub const DEFAULT_MARKER_TIMEOUT: Duration = Duration::from_secs(10);
/// Default budget for liveness polling.
pub const DEFAULT_LIVENESS_TIMEOUT: Duration = Duration::from_secs(60);

/// Parameters for a single reload scenario.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    /// Executable to verify; invoked with `--config-file=<path>`.
    pub service_command: String,
    pub startup_timeout: Duration,
    pub marker_timeout: Duration,
    pub liveness_timeout: Duration,
}

impl ScenarioConfig {
    /// Create a new builder for the given service executable.
    pub fn builder(service_command: impl Into<String>) -> ScenarioConfigBuilder {
        ScenarioConfigBuilder::new(service_command)
    }
}

pub struct ScenarioConfigBuilder {
    config: ScenarioConfig,
}

impl ScenarioConfigBuilder {
    pub fn new(service_command: impl Into<String>) -> Self {
        Self {
            config: ScenarioConfig {
                service_command: service_command.into(),
                startup_timeout: DEFAULT_STARTUP_TIMEOUT,
                marker_timeout: DEFAULT_MARKER_TIMEOUT,
                liveness_timeout: DEFAULT_LIVENESS_TIMEOUT,
            },
        }
    }

    /// Budget for the startup marker watch
    pub fn startup_timeout(mut self, timeout: Duration) -> Self {
        self.config.startup_timeout = timeout;
        self
    }

    /// Budget for each post-signal marker watch
    pub fn marker_timeout(mut self, timeout: Duration) -> Self {
        self.config.marker_timeout = timeout;
        self
    }

    /// Budget for liveness polling
    pub fn liveness_timeout(mut self, timeout: Duration) -> Self {
        self.config.liveness_timeout = timeout;
        self
    }

    pub fn build(self) -> ScenarioConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_defaults() {
        let config = ScenarioConfig::builder("./service").build();
        assert_eq!(config.service_command, "./service");
        assert_eq!(config.startup_timeout, DEFAULT_STARTUP_TIMEOUT);
        assert_eq!(config.marker_timeout, DEFAULT_MARKER_TIMEOUT);
        assert_eq!(config.liveness_timeout, DEFAULT_LIVENESS_TIMEOUT);
    }

    #[test]
    fn builder_overrides_timeouts() {
        let config = ScenarioConfig::builder("./service")
            .startup_timeout(Duration::from_secs(5))
            .marker_timeout(Duration::from_secs(1))
            .liveness_timeout(Duration::from_secs(2))
            .build();
        assert_eq!(config.startup_timeout, Duration::from_secs(5));
        assert_eq!(config.marker_timeout, Duration::from_secs(1));
        assert_eq!(config.liveness_timeout, Duration::from_secs(2));
    }
}
