use thiserror::Error;

/// Errors returned by fold construction, statistic lookup and checkpointing.
#[derive(Debug, Error)]
pub enum FoldError {
    /// Checkpoint window count disagrees with the live schedule
    #[error("schema mismatch: checkpoint has {found} windows, fold has {expected}")]
    SchemaMismatch { expected: u64, found: u64 },

    /// Checkpoint buffer shape disagrees with the live window
    #[error("schema mismatch in window {window}: {detail}")]
    ShapeMismatch { window: usize, detail: String },

    /// Statistic table lookup miss
    #[error("statistic not found: {0}")]
    NotFound(String),

    /// Rejected construction parameters or dataset
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Configuration file could not be parsed
    #[error("config error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Checkpoint encoding error
    #[error("checkpoint codec error: {0}")]
    Codec(#[from] bincode::Error),
}

impl FoldError {
    /// True for both checkpoint schema variants.
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(
            self,
            FoldError::SchemaMismatch { .. } | FoldError::ShapeMismatch { .. }
        )
    }
}

/// Result type for fold operations
pub type Result<T> = std::result::Result<T, FoldError>;
