//! Pipeline configuration snapshots
//!
//! An ordered sequence of source/sink binding records with structural
//! equality. The serialized form is single-line JSON so a reloaded
//! snapshot fits on one marker line of the service's output.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::HarnessResult;

/// One named binding of telemetry sources to sinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineBinding {
    pub name: String,
    pub sources: Vec<String>,
    pub sinks: Vec<String>,
}

impl PipelineBinding {
    pub fn new(name: impl Into<String>, sources: Vec<String>, sinks: Vec<String>) -> Self {
        Self {
            name: name.into(),
            sources,
            sinks,
        }
    }
}

/// An ordered pipeline definition.
///
/// Equality is structural: two snapshots compare equal independent of
/// incidental formatting in their serialized forms. Binding order is
/// significant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub pipelines: Vec<PipelineBinding>,
}

impl PipelineConfig {
    pub fn new(pipelines: Vec<PipelineBinding>) -> Self {
        Self { pipelines }
    }

    /// Parse a snapshot from its serialized form.
    pub fn parse(text: &str) -> HarnessResult<Self> {
        Ok(serde_json::from_str(text.trim())?)
    }

    /// Single-line serialization, used both on disk and in the reload
    /// marker payload.
    pub fn to_line(&self) -> HarnessResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn load(path: &Path) -> HarnessResult<Self> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    pub fn store(&self, path: &Path) -> HarnessResult<()> {
        let mut line = self.to_line()?;
        line.push('\n');
        std::fs::write(path, line)?;
        Ok(())
    }
}
