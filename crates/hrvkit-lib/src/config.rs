use crate::batch::BatchOptions;
use crate::io::table::OutputFormat;
use crate::metrics::hrv::{EngineConfig, MIN_NN_INTERVALS};
use crate::signal::TimeUnit;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Batch settings loaded from a TOML file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    /// Directory containing one beat file per subject.
    #[serde(default)]
    pub input_dir: Option<PathBuf>,
    /// Summary table destination.
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default = "default_suffix")]
    pub suffix: String,
    #[serde(default)]
    pub time_unit: TimeUnit,
    #[serde(default = "default_min_nn")]
    pub min_nn: usize,
    #[serde(default)]
    pub format: OutputFormat,
}

fn default_suffix() -> String {
    ".csv".into()
}

fn default_min_nn() -> usize {
    MIN_NN_INTERVALS
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: None,
            output: None,
            suffix: default_suffix(),
            time_unit: TimeUnit::default(),
            min_nn: default_min_nn(),
            format: OutputFormat::default(),
        }
    }
}

impl BatchConfig {
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            time_unit: self.time_unit,
            min_nn: self.min_nn,
        }
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            suffix: self.suffix.clone(),
            engine: self.engine(),
        }
    }
}

pub fn parse_config(text: &str) -> Result<BatchConfig> {
    Ok(toml::from_str(text)?)
}

pub fn read_config(path: &Path) -> Result<BatchConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("parsing config {}", path.display()))
}
