use crate::generator::profile::GeneratorConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use vitalcore::prelude::VitalConfig;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub pipeline: VitalConfig,
    pub generator: GeneratorConfig,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        config
            .pipeline
            .validate()
            .with_context(|| format!("validating workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Default pipeline with the synthetic subject described on the command line.
    pub fn from_args(breathing_hz: f64, heart_hz: f64, duration_s: f64) -> Self {
        let mut config = Self::default();
        config.generator.motion.breathing_hz = breathing_hz;
        config.generator.motion.heart_hz = heart_hz;
        config.generator.duration_s = Some(duration_s);
        config
    }
}
