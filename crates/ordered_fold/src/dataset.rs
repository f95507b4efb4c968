//! In-memory training data consumed by fold construction
//!
//! Holds learn targets, optional weights and optional baseline predictions,
//! all in original sample order. Held-out documents contribute only to the
//! total sample count and the baseline.

use crate::errors::{FoldError, Result};

/// Training data view with learn and held-out documents
#[derive(Clone, Debug, Default)]
pub struct TrainData {
    target: Vec<f32>,
    weights: Option<Vec<f32>>,
    /// Baseline predictions indexed `[dim][sample]`
    baseline: Option<Vec<Vec<f64>>>,
    holdout_count: usize,
}

impl TrainData {
    pub fn new(target: Vec<f32>) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    pub fn with_weights(mut self, weights: Vec<f32>) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Baseline as one array per approximation dimension
    pub fn with_baseline(mut self, baseline: Vec<Vec<f64>>) -> Self {
        self.baseline = Some(baseline);
        self
    }

    /// Number of held-out documents appended after the learn documents
    pub fn with_holdout(mut self, holdout_count: usize) -> Self {
        self.holdout_count = holdout_count;
        self
    }

    pub fn learn_sample_count(&self) -> usize {
        self.target.len()
    }

    /// Learn plus held-out documents
    pub fn total_sample_count(&self) -> usize {
        self.target.len() + self.holdout_count
    }

    pub fn target(&self) -> &[f32] {
        &self.target
    }

    pub fn weights(&self) -> Option<&[f32]> {
        self.weights.as_deref()
    }

    pub fn baseline(&self) -> Option<&[Vec<f64>]> {
        self.baseline.as_deref()
    }

    /// Check array lengths against the sample counts
    pub fn validate(&self) -> Result<()> {
        let learn = self.learn_sample_count();
        if let Some(weights) = &self.weights {
            if weights.len() != learn {
                return Err(FoldError::InvalidConfiguration(format!(
                    "expected {} weights, got {}",
                    learn,
                    weights.len()
                )));
            }
        }

        if let Some(baseline) = &self.baseline {
            let total = self.total_sample_count();
            if baseline.is_empty() {
                return Err(FoldError::InvalidConfiguration(
                    "baseline has no dimensions".to_string(),
                ));
            }
            for (dim, values) in baseline.iter().enumerate() {
                if values.len() < total {
                    return Err(FoldError::InvalidConfiguration(format!(
                        "baseline dimension {} has {} values, need at least {}",
                        dim,
                        values.len(),
                        total
                    )));
                }
            }
        }
        Ok(())
    }

    /// Check that the baseline, if any, has one array per dimension
    pub(crate) fn check_baseline_dimension(&self, approx_dimension: usize) -> Result<()> {
        match &self.baseline {
            Some(baseline) if baseline.len() != approx_dimension => {
                Err(FoldError::InvalidConfiguration(format!(
                    "baseline has {} dimensions, approx dimension is {}",
                    baseline.len(),
                    approx_dimension
                )))
            }
            _ => Ok(()),
        }
    }
}
