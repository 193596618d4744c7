//! JSON run configuration for the command-line driver.

use crate::error::{ForestError, Result};
use crate::forest::DecisionForestParams;
use crate::tree::DecisionTreeParams;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Overrides for the reference training invocation. Every field is
/// optional in the JSON; omitted fields keep their defaults.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Directory holding the MNIST IDX files. Defaults to the working
    /// directory.
    pub data_dir: PathBuf,
    pub forest_params: DecisionForestParams,
    /// Tree parameters. A `class_count` of 0 (the default) is replaced
    /// by the label count detected in the dataset.
    pub tree_params: DecisionTreeParams,
}

pub fn load_run_config(path: &Path) -> Result<RunConfig> {
    let contents = fs::read_to_string(path)?;
    let config: RunConfig = serde_json::from_str(&contents).map_err(|e| {
        ForestError::InvalidData(format!("failed to parse config {}: {e}", path.display()))
    })?;
    Ok(config)
}
