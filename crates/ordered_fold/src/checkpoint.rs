//! Approx buffer checkpoints
//!
//! Layout: window count as `u64`, then every window's approx buffers in
//! schedule order. Buffers use bincode's default encoding: little-endian
//! `u64` length prefixes followed by raw `f64` bits, so values round-trip
//! exactly. The schedule itself is not stored and must be rebuilt from
//! the same parameters before loading.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::errors::{FoldError, Result};
use crate::window::Window;

/// Write the approx buffers of `windows` to `writer`.
pub fn save_approxes<W: Write>(windows: &[Window], writer: &mut W) -> Result<()> {
    let window_count = windows.len() as u64;
    bincode::serialize_into(&mut *writer, &window_count)?;
    for window in windows {
        bincode::serialize_into(&mut *writer, &window.approx)?;
    }
    writer.flush()?;
    Ok(())
}

/// Restore approx buffers saved by [`save_approxes`].
///
/// Every window is decoded and shape-checked before any buffer is replaced,
/// so on error `windows` is left untouched. Restored buffers already hold
/// the carried-forward mix prefixes, so every window is marked seeded.
pub fn load_approxes<R: Read>(windows: &mut [Window], reader: &mut R) -> Result<()> {
    let window_count: u64 = bincode::deserialize_from(&mut *reader)?;
    let expected = windows.len() as u64;
    if window_count != expected {
        tracing::warn!(
            expected,
            found = window_count,
            "rejecting checkpoint with a different window count"
        );
        return Err(FoldError::SchemaMismatch {
            expected,
            found: window_count,
        });
    }

    let mut staged = Vec::with_capacity(windows.len());
    for (idx, window) in windows.iter().enumerate() {
        let approx: Vec<Vec<f64>> = bincode::deserialize_from(&mut *reader)?;
        check_shape(idx, window, &approx)?;
        staged.push(approx);
    }

    for (window, approx) in windows.iter_mut().zip(staged) {
        window.approx = approx;
        window.mark_mix_seeded();
    }
    Ok(())
}

fn check_shape(idx: usize, window: &Window, approx: &[Vec<f64>]) -> Result<()> {
    if approx.len() != window.approx_dimension() {
        return Err(FoldError::ShapeMismatch {
            window: idx,
            detail: format!(
                "expected {} dimensions, found {}",
                window.approx_dimension(),
                approx.len()
            ),
        });
    }
    let buffer_len = window.buffer_len();
    if let Some(bad) = approx.iter().find(|values| values.len() != buffer_len) {
        return Err(FoldError::ShapeMismatch {
            window: idx,
            detail: format!(
                "expected buffers of length {}, found {}",
                buffer_len,
                bad.len()
            ),
        });
    }
    Ok(())
}

pub fn save_to_path<P: AsRef<Path>>(windows: &[Window], path: P) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    save_approxes(windows, &mut writer)
}

pub fn load_from_path<P: AsRef<Path>>(windows: &mut [Window], path: P) -> Result<()> {
    let mut reader = BufReader::new(File::open(path.as_ref())?);
    load_approxes(windows, &mut reader)
}
