use crate::{
    conditioning::ConditionerConfig, detectors::DetectionOverrides, metrics::IntervalConfig,
    reconcile::ReconcileConfig,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables of the whole heart-rate pipeline. Every section is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub conditioner: ConditionerConfig,
    pub detection: DetectionOverrides,
    pub intervals: IntervalConfig,
    pub reconcile: ReconcileConfig,
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("parsing pipeline configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }
}
