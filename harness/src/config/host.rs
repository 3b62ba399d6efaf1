//! Host configuration file assembly
//!
//! The supervised service takes an INI-like `--config-file`. The
//! harness only assembles and writes this content; it never parses it
//! back.

use std::path::{Path, PathBuf};

/// INI-like host configuration handed to the child process.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pipeline_cfg_file: PathBuf,
    log_level: String,
    extras: Vec<(String, String)>,
}

impl HostConfig {
    pub fn new(pipeline_cfg_file: impl Into<PathBuf>) -> Self {
        Self {
            pipeline_cfg_file: pipeline_cfg_file.into(),
            log_level: "debug".to_string(),
            extras: Vec::new(),
        }
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Append an extra `key=value` entry under `[DEFAULT]`.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.push((key.into(), value.into()));
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::from("[DEFAULT]\n");
        out.push_str(&format!("log_level={}\n", self.log_level));
        out.push_str(&format!(
            "pipeline_cfg_file={}\n",
            self.pipeline_cfg_file.display()
        ));
        for (key, value) in &self.extras {
            out.push_str(&format!("{key}={value}\n"));
        }
        out
    }

    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.render())
    }
}
