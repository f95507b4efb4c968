//! IPPAN fold planner CLI
//!
//! Builds learn and averaging folds for a synthetic dataset of the given
//! size and prints the resulting mix/tail schedule.

use anyhow::{Context, Result};
use clap::Parser;
use ippan_ordered_fold::{
    select_min_batch_size, BorderClassifier, Fold, FoldParams, RestorableRng, StatisticTables,
    TrainData, VERSION,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "fold-plan")]
#[command(author = "IPPAN Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Print the ordered-boosting window schedule", long_about = None)]
struct Args {
    /// Number of learn samples
    #[arg(short, long, default_value = "10000")]
    samples: usize,

    /// Number of held-out samples added to the averaging fold
    #[arg(long, default_value = "0")]
    holdout: usize,

    /// Fold parameters file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fold length multiplier
    #[arg(long)]
    multiplier: Option<f64>,

    /// Permutation block size
    #[arg(long)]
    block_size: Option<usize>,

    /// Approximation dimension
    #[arg(long)]
    dimension: Option<usize>,

    /// Random seed for the permutation
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Keep the identity permutation
    #[arg(long)]
    no_shuffle: bool,

    /// Print the plan as JSON
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Serialize)]
struct WindowPlan {
    mix_count: usize,
    tail_finish: usize,
}

#[derive(Debug, Serialize)]
struct Plan {
    samples: usize,
    total_samples: usize,
    min_batch_size: usize,
    params: FoldParams,
    learn_windows: Vec<WindowPlan>,
    averaging_window: Option<WindowPlan>,
}

fn resolve_params(args: &Args) -> Result<FoldParams> {
    let mut params = match &args.config {
        Some(path) => FoldParams::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => FoldParams::default(),
    };
    if let Some(multiplier) = args.multiplier {
        params.fold_len_multiplier = multiplier;
    }
    if let Some(block_size) = args.block_size {
        params.permutation_block_size = block_size;
    }
    if let Some(dimension) = args.dimension {
        params.approx_dimension = dimension;
    }
    if args.no_shuffle {
        params.shuffle = false;
    }
    params.validate().context("Invalid fold parameters")?;
    Ok(params)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("IPPAN fold planner v{}", VERSION);
    let params = resolve_params(&args)?;
    info!(
        "Planning folds for {} samples ({} held out), seed {}",
        args.samples, args.holdout, args.seed
    );

    let data = TrainData::new((0..args.samples).map(|i| (i % 2) as f32).collect())
        .with_holdout(args.holdout);
    let classifiers = [BorderClassifier::new(vec![0.5])];
    let mut rng = RestorableRng::new(args.seed);

    let learn: Fold = Fold::build_learn_with(
        &data,
        &classifiers,
        &params,
        &mut rng,
        StatisticTables::new(),
    )
    .context("Failed to build learn fold")?;
    let averaging: Fold = Fold::build_averaging_with(
        &data,
        &classifiers,
        &params,
        &mut rng,
        StatisticTables::new(),
    )
    .context("Failed to build averaging fold")?;

    let plan = Plan {
        samples: data.learn_sample_count(),
        total_samples: data.total_sample_count(),
        min_batch_size: select_min_batch_size(data.learn_sample_count()),
        params,
        learn_windows: learn
            .windows()
            .iter()
            .map(|w| WindowPlan {
                mix_count: w.mix_count(),
                tail_finish: w.tail_finish(),
            })
            .collect(),
        averaging_window: averaging.windows().first().map(|w| WindowPlan {
            mix_count: w.mix_count(),
            tail_finish: w.tail_finish(),
        }),
    };

    if args.json {
        let json = serde_json::to_string_pretty(&plan).context("Failed to serialize plan")?;
        println!("{}", json);
        return Ok(());
    }

    println!(
        "samples={} total={} min_batch={} multiplier={}",
        plan.samples, plan.total_samples, plan.min_batch_size, plan.params.fold_len_multiplier
    );
    for (idx, window) in plan.learn_windows.iter().enumerate() {
        println!(
            "  learn[{:>2}] mix={:>8} tail_finish={:>8} tail={:>8}",
            idx,
            window.mix_count,
            window.tail_finish,
            window.tail_finish - window.mix_count
        );
    }
    if let Some(window) = &plan.averaging_window {
        println!(
            "  averaging mix={:>8} tail_finish={:>8}",
            window.mix_count, window.tail_finish
        );
    }
    Ok(())
}
