//! Mix/tail window schedule
//!
//! Ordered boosting processes the permutation in geometrically growing
//! windows. Window `i` treats permuted positions `[0, mix_count)` as
//! resolved history and `[mix_count, tail_finish)` as the tail being
//! fitted in this stage. Each window owns its own prediction and
//! derivative buffers covering `[0, tail_finish)`.

use crate::errors::{FoldError, Result};

/// Datasets at or below this size start from a single-document mix
const SMALL_DATASET_LIMIT: usize = 500;
const MAX_MIN_BATCH_SIZE: usize = 100;
const MIN_BATCH_DIVISOR: usize = 50;

/// Size of the first mix prefix for a learn set of `sample_count` documents.
pub fn select_min_batch_size(sample_count: usize) -> usize {
    if sample_count > SMALL_DATASET_LIMIT {
        MAX_MIN_BATCH_SIZE.min(sample_count / MIN_BATCH_DIVISOR)
    } else {
        1
    }
}

/// One stage of the ordered-boosting schedule
#[derive(Clone, Debug, PartialEq)]
pub struct Window {
    /// Current model prediction, `[dim][pos]`
    pub approx: Vec<Vec<f64>>,
    pub derivatives: Vec<Vec<f64>>,
    pub weighted_derivatives: Vec<Vec<f64>>,
    mix_count: usize,
    tail_finish: usize,
    mix_seeded: bool,
}

impl Window {
    /// Zeroed window over `[0, buffer_len)` with `approx_dimension` outputs.
    ///
    /// Callers guarantee `mix_count <= tail_finish <= buffer_len`.
    pub(crate) fn new(
        mix_count: usize,
        tail_finish: usize,
        buffer_len: usize,
        approx_dimension: usize,
    ) -> Self {
        debug_assert!(mix_count <= tail_finish && tail_finish <= buffer_len);
        let zeroed = || vec![vec![0.0; buffer_len]; approx_dimension];
        Self {
            approx: zeroed(),
            derivatives: zeroed(),
            weighted_derivatives: zeroed(),
            mix_count,
            tail_finish,
            mix_seeded: mix_count == 0,
        }
    }

    pub fn mix_count(&self) -> usize {
        self.mix_count
    }

    pub fn tail_finish(&self) -> usize {
        self.tail_finish
    }

    /// Permuted positions newly processed by this window
    pub fn tail(&self) -> std::ops::Range<usize> {
        self.mix_count..self.tail_finish
    }

    /// Length of every per-dimension buffer
    pub fn buffer_len(&self) -> usize {
        self.approx.first().map_or(0, Vec::len)
    }

    pub fn approx_dimension(&self) -> usize {
        self.approx.len()
    }

    /// Whether the mix prefix holds carried-forward predictions
    pub fn is_mix_seeded(&self) -> bool {
        self.mix_seeded
    }

    pub(crate) fn mark_mix_seeded(&mut self) {
        self.mix_seeded = true;
    }

    /// Copy `previous`'s approx over `[0, mix_count)` into this window.
    ///
    /// `previous` must be the window whose `tail_finish` equals this
    /// window's `mix_count`.
    pub fn seed_mix_from(&mut self, previous: &Window) -> Result<()> {
        if previous.tail_finish != self.mix_count {
            return Err(FoldError::InvalidConfiguration(format!(
                "cannot seed mix of {} documents from a window ending at {}",
                self.mix_count, previous.tail_finish
            )));
        }
        if previous.approx_dimension() != self.approx_dimension() {
            return Err(FoldError::InvalidConfiguration(format!(
                "approx dimension mismatch: {} vs {}",
                previous.approx_dimension(),
                self.approx_dimension()
            )));
        }

        let mix = self.mix_count;
        for (dst, src) in self.approx.iter_mut().zip(&previous.approx) {
            dst[..mix].copy_from_slice(&src[..mix]);
        }
        self.mix_seeded = true;
        Ok(())
    }
}

/// Overwrite `approx[dim][pos]` for `pos` in `[begin, end)` with the
/// baseline of the original document at that position. Positions past the
/// permutation (held-out documents) map to themselves.
pub fn init_from_baseline(
    begin: usize,
    end: usize,
    baseline: &[Vec<f64>],
    permutation: &[usize],
    approx: &mut [Vec<f64>],
) {
    for pos in begin..end {
        let original = permutation.get(pos).copied().unwrap_or(pos);
        for (dim_approx, dim_baseline) in approx.iter_mut().zip(baseline) {
            dim_approx[pos] = dim_baseline[original];
        }
    }
}

pub(crate) fn check_multiplier(multiplier: f64) -> Result<()> {
    if !multiplier.is_finite() || multiplier <= 1.0 {
        return Err(FoldError::InvalidConfiguration(format!(
            "fold length multiplier must be a finite value above 1, got {}",
            multiplier
        )));
    }
    Ok(())
}

pub(crate) fn check_dimension(approx_dimension: usize) -> Result<()> {
    if approx_dimension == 0 {
        return Err(FoldError::InvalidConfiguration(
            "approx dimension must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// End of the tail that follows a mix of `mix_count` documents.
pub fn next_tail_finish(mix_count: usize, multiplier: f64, sample_count: usize) -> usize {
    let grown = (mix_count as f64 * multiplier).ceil() as usize;
    grown.max(mix_count + 1).min(sample_count)
}

/// Window boundaries `(mix_count, tail_finish)` for a learn set.
pub fn learn_schedule_bounds(sample_count: usize, multiplier: f64) -> Result<Vec<(usize, usize)>> {
    check_multiplier(multiplier)?;

    let mut bounds = Vec::new();
    let mut left_part_len = select_min_batch_size(sample_count);
    if left_part_len >= sample_count {
        if sample_count > 0 {
            bounds.push((0, sample_count));
        }
        return Ok(bounds);
    }

    while left_part_len < sample_count {
        let tail_finish = next_tail_finish(left_part_len, multiplier, sample_count);
        bounds.push((left_part_len, tail_finish));
        left_part_len = tail_finish;
    }
    Ok(bounds)
}

/// Allocate the learn fold schedule for `permutation.len()` documents.
pub fn build_learn_windows(
    approx_dimension: usize,
    multiplier: f64,
    baseline: Option<&[Vec<f64>]>,
    permutation: &[usize],
) -> Result<Vec<Window>> {
    check_dimension(approx_dimension)?;
    let sample_count = permutation.len();
    let bounds = learn_schedule_bounds(sample_count, multiplier)?;

    let mut windows = Vec::with_capacity(bounds.len());
    for (mix_count, tail_finish) in bounds {
        let mut window = Window::new(mix_count, tail_finish, tail_finish, approx_dimension);
        if let Some(baseline) = baseline {
            init_from_baseline(
                mix_count,
                tail_finish,
                baseline,
                permutation,
                &mut window.approx,
            );
        }
        // No earlier window feeds the first mix
        if windows.is_empty() {
            window.mark_mix_seeded();
        }
        tracing::debug!(mix_count, tail_finish, "allocated learn window");
        windows.push(window);
    }
    Ok(windows)
}

/// Single window spanning learn and held-out documents.
pub fn build_averaging_window(
    total_sample_count: usize,
    approx_dimension: usize,
    baseline: Option<&[Vec<f64>]>,
    permutation: &[usize],
) -> Result<Window> {
    check_dimension(approx_dimension)?;
    let learn_sample_count = permutation.len();
    if total_sample_count < learn_sample_count {
        return Err(FoldError::InvalidConfiguration(format!(
            "total sample count {} is below learn sample count {}",
            total_sample_count, learn_sample_count
        )));
    }

    let mut window = Window::new(
        learn_sample_count,
        total_sample_count,
        total_sample_count,
        approx_dimension,
    );
    if let Some(baseline) = baseline {
        init_from_baseline(
            0,
            total_sample_count,
            baseline,
            permutation,
            &mut window.approx,
        );
    }
    window.mark_mix_seeded();
    Ok(window)
}
