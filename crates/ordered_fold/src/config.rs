//! Fold construction parameters

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{FoldError, Result};
use crate::window::{check_dimension, check_multiplier};

/// Parameters shared by learn and averaging fold construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoldParams {
    /// Shuffle the learn permutation
    pub shuffle: bool,
    /// Documents per shuffled block (1 shuffles single documents)
    pub permutation_block_size: usize,
    /// Number of model outputs per document
    pub approx_dimension: usize,
    /// Growth factor between consecutive window tails
    pub fold_len_multiplier: f64,
    /// Multi-feature statistic budget before the table is cleared
    pub max_multi_feature_ctrs: usize,
}

impl Default for FoldParams {
    fn default() -> Self {
        Self {
            shuffle: true,
            permutation_block_size: 1,
            approx_dimension: 1,
            fold_len_multiplier: 2.0,
            max_multi_feature_ctrs: 50_000,
        }
    }
}

impl FoldParams {
    pub fn validate(&self) -> Result<()> {
        if self.permutation_block_size == 0 {
            return Err(FoldError::InvalidConfiguration(
                "permutation block size must be at least 1".to_string(),
            ));
        }
        check_dimension(self.approx_dimension)?;
        check_multiplier(self.fold_len_multiplier)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let params: Self = toml::from_str(content).map_err(|e| FoldError::Config(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        tracing::info!(path = %path.as_ref().display(), "loaded fold parameters");
        Self::from_toml_str(&content)
    }
}
