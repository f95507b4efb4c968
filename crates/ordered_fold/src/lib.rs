//! IPPAN Ordered Fold - training-state container for ordered boosting
//!
//! Builds the learn permutation, the geometric mix/tail window schedule
//! with its prediction and derivative buffers, and the online statistic
//! tables a gradient-boosting run mutates round after round. Approx
//! buffers can be checkpointed and restored bit-exactly.

pub mod checkpoint;
pub mod config;
pub mod ctr;
pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod fold;
pub mod permutation;
pub mod target;
pub mod window;

pub use config::FoldParams;
pub use ctr::{
    BinFeature, EvictionPolicy, FeatureCombination, FullClear, OnlineCtr, OnlineStatistic,
    Projection, StatisticTables,
};
pub use dataset::TrainData;
pub use deterministic::{RestorableRng, RngState};
pub use errors::{FoldError, Result};
pub use fold::{Fold, FoldKind};
pub use permutation::build_permutation;
pub use target::{BorderClassifier, TargetClasses, TargetClassifier};
pub use window::{select_min_batch_size, Window};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
