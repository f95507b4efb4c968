//! Per-run ordered-boosting fold
//!
//! A learn fold carries the geometric mix/tail schedule used to fit
//! trees without target leakage. An averaging fold has a single window
//! over learn and held-out documents and produces the averaged model
//! predictions. Both own their statistic tables and are mutated in place
//! by the training loop between rounds.

use std::io::{Read, Write};
use std::path::Path;

use crate::checkpoint;
use crate::config::FoldParams;
use crate::ctr::{
    EvictionPolicy, FeatureCombination, FullClear, OnlineCtr, OnlineStatistic, Projection,
    StatisticTables,
};
use crate::dataset::TrainData;
use crate::deterministic::RestorableRng;
use crate::errors::{FoldError, Result};
use crate::permutation::build_permutation;
use crate::target::{assign_permuted, TargetClasses, TargetClassifier};
use crate::window::{build_averaging_window, build_learn_windows, Window};

/// Role of a fold in the training run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FoldKind {
    Learn,
    Averaging,
}

/// Permutation, permuted targets, window schedule and statistic tables
#[derive(Clone, Debug)]
pub struct Fold<K = Projection, V = OnlineCtr, P = FullClear> {
    kind: FoldKind,
    learn_permutation: Vec<usize>,
    learn_target: Vec<f32>,
    learn_weights: Option<Vec<f32>>,
    target_classes: TargetClasses,
    windows: Vec<Window>,
    approx_dimension: usize,
    effective_doc_count: usize,
    max_multi_feature_ctrs: usize,
    ctrs: StatisticTables<K, V, P>,
}

impl Fold {
    /// Build the learn fold with default statistic tables.
    pub fn build_learn<C: TargetClassifier>(
        data: &TrainData,
        classifiers: &[C],
        shuffle: bool,
        permutation_block_size: usize,
        approx_dimension: usize,
        multiplier: f64,
        rng: &mut RestorableRng,
    ) -> Result<Self> {
        let params = FoldParams {
            shuffle,
            permutation_block_size,
            approx_dimension,
            fold_len_multiplier: multiplier,
            ..FoldParams::default()
        };
        Self::build_learn_with(data, classifiers, &params, rng, StatisticTables::new())
    }

    /// Build an averaging fold with default statistic tables.
    pub fn build_averaging<C: TargetClassifier>(
        data: &TrainData,
        classifiers: &[C],
        shuffle: bool,
        approx_dimension: usize,
        rng: &mut RestorableRng,
    ) -> Result<Self> {
        let params = FoldParams {
            shuffle,
            approx_dimension,
            ..FoldParams::default()
        };
        Self::build_averaging_with(data, classifiers, &params, rng, StatisticTables::new())
    }
}

impl<K, V, P> Fold<K, V, P>
where
    K: FeatureCombination,
    V: OnlineStatistic,
    P: EvictionPolicy<K, V>,
{
    /// Build a learn fold from validated parameters and the given tables.
    pub fn build_learn_with<C: TargetClassifier>(
        data: &TrainData,
        classifiers: &[C],
        params: &FoldParams,
        rng: &mut RestorableRng,
        ctrs: StatisticTables<K, V, P>,
    ) -> Result<Self> {
        params.validate()?;
        data.validate()?;
        data.check_baseline_dimension(params.approx_dimension)?;

        let learn_sample_count = data.learn_sample_count();
        let learn_permutation = build_permutation(
            learn_sample_count,
            params.shuffle,
            params.permutation_block_size,
            rng,
        )?;
        let windows = build_learn_windows(
            params.approx_dimension,
            params.fold_len_multiplier,
            data.baseline(),
            &learn_permutation,
        )?;

        let mut fold = Self::assemble(
            FoldKind::Learn,
            learn_permutation,
            windows,
            params,
            learn_sample_count,
            ctrs,
        );
        fold.reassign_targets(data, classifiers)?;

        tracing::info!(
            samples = learn_sample_count,
            windows = fold.windows.len(),
            shuffle = params.shuffle,
            block_size = params.permutation_block_size,
            "built learn fold"
        );
        Ok(fold)
    }

    /// Build an averaging fold covering learn and held-out documents.
    ///
    /// Shuffling here always permutes single documents.
    pub fn build_averaging_with<C: TargetClassifier>(
        data: &TrainData,
        classifiers: &[C],
        params: &FoldParams,
        rng: &mut RestorableRng,
        ctrs: StatisticTables<K, V, P>,
    ) -> Result<Self> {
        params.validate()?;
        data.validate()?;
        data.check_baseline_dimension(params.approx_dimension)?;

        let learn_sample_count = data.learn_sample_count();
        let total_sample_count = data.total_sample_count();
        let learn_permutation = build_permutation(learn_sample_count, params.shuffle, 1, rng)?;
        let window = build_averaging_window(
            total_sample_count,
            params.approx_dimension,
            data.baseline(),
            &learn_permutation,
        )?;

        let mut fold = Self::assemble(
            FoldKind::Averaging,
            learn_permutation,
            vec![window],
            params,
            total_sample_count,
            ctrs,
        );
        fold.reassign_targets(data, classifiers)?;

        tracing::info!(
            learn = learn_sample_count,
            total = total_sample_count,
            shuffle = params.shuffle,
            "built averaging fold"
        );
        Ok(fold)
    }

    fn assemble(
        kind: FoldKind,
        learn_permutation: Vec<usize>,
        windows: Vec<Window>,
        params: &FoldParams,
        effective_doc_count: usize,
        ctrs: StatisticTables<K, V, P>,
    ) -> Self {
        Self {
            kind,
            learn_permutation,
            learn_target: Vec::new(),
            learn_weights: None,
            target_classes: TargetClasses::default(),
            windows,
            approx_dimension: params.approx_dimension,
            effective_doc_count,
            max_multi_feature_ctrs: params.max_multi_feature_ctrs,
            ctrs,
        }
    }

    /// Recompute permuted targets, weights and target classes.
    ///
    /// `data` must have exactly as many learn documents as the permutation.
    pub fn reassign_targets<C: TargetClassifier>(
        &mut self,
        data: &TrainData,
        classifiers: &[C],
    ) -> Result<()> {
        data.validate()?;
        if data.learn_sample_count() != self.learn_permutation.len() {
            return Err(FoldError::InvalidConfiguration(format!(
                "dataset has {} learn samples, fold permutation has {}",
                data.learn_sample_count(),
                self.learn_permutation.len()
            )));
        }

        self.learn_target = assign_permuted(data.target(), &self.learn_permutation);
        self.learn_weights = data
            .weights()
            .map(|weights| assign_permuted(weights, &self.learn_permutation));
        self.target_classes = TargetClasses::build(&self.learn_target, classifiers);
        Ok(())
    }

    pub fn kind(&self) -> FoldKind {
        self.kind
    }

    /// Original index of every permuted position
    pub fn permutation(&self) -> &[usize] {
        &self.learn_permutation
    }

    pub fn learn_sample_count(&self) -> usize {
        self.learn_permutation.len()
    }

    /// Documents the fold's buffers are sized for
    pub fn effective_doc_count(&self) -> usize {
        self.effective_doc_count
    }

    pub fn learn_target(&self) -> &[f32] {
        &self.learn_target
    }

    /// Permuted weights, `None` when the dataset is unweighted
    pub fn learn_weights(&self) -> Option<&[f32]> {
        self.learn_weights.as_deref()
    }

    pub fn target_classes(&self) -> &TargetClasses {
        &self.target_classes
    }

    pub fn approx_dimension(&self) -> usize {
        self.approx_dimension
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn windows_mut(&mut self) -> &mut [Window] {
        &mut self.windows
    }

    pub fn window(&self, idx: usize) -> Option<&Window> {
        self.windows.get(idx)
    }

    pub fn window_mut(&mut self, idx: usize) -> Option<&mut Window> {
        self.windows.get_mut(idx)
    }

    /// Carry the previous window's predictions into window `idx`'s mix.
    pub fn seed_mix(&mut self, idx: usize) -> Result<()> {
        if idx >= self.windows.len() {
            return Err(FoldError::InvalidConfiguration(format!(
                "window {} out of range, fold has {}",
                idx,
                self.windows.len()
            )));
        }
        if idx == 0 {
            self.windows[0].mark_mix_seeded();
            return Ok(());
        }
        let (head, tail) = self.windows.split_at_mut(idx);
        tail[0].seed_mix_from(&head[idx - 1])
    }

    /// Seed every window's mix from its predecessor, first to last.
    pub fn seed_all_mixes(&mut self) -> Result<()> {
        for idx in 0..self.windows.len() {
            self.seed_mix(idx)?;
        }
        Ok(())
    }

    pub fn ctrs(&self) -> &StatisticTables<K, V, P> {
        &self.ctrs
    }

    pub fn ctrs_mut(&mut self) -> &mut StatisticTables<K, V, P> {
        &mut self.ctrs
    }

    pub fn get_ctr(&self, projection: &K) -> Result<&V> {
        self.ctrs.get(projection)
    }

    pub fn get_ctr_ref(&mut self, projection: K) -> &mut V {
        self.ctrs.get_or_create(projection)
    }

    pub fn drop_empty_ctrs(&mut self) -> usize {
        self.ctrs.prune_empty()
    }

    pub fn trim_online_ctrs(&mut self, max_multi_feature_ctrs: usize) -> usize {
        self.ctrs.trim_multi_feature(max_multi_feature_ctrs)
    }

    /// Multi-feature statistic budget taken from the fold parameters
    pub fn max_multi_feature_ctrs(&self) -> usize {
        self.max_multi_feature_ctrs
    }

    /// Trim the multi-feature table against the configured budget.
    pub fn trim_online_ctrs_to_budget(&mut self) -> usize {
        self.ctrs.trim_multi_feature(self.max_multi_feature_ctrs)
    }

    pub fn save_approxes<W: Write>(&self, writer: &mut W) -> Result<()> {
        checkpoint::save_approxes(&self.windows, writer)
    }

    pub fn load_approxes<R: Read>(&mut self, reader: &mut R) -> Result<()> {
        checkpoint::load_approxes(&mut self.windows, reader)
    }

    pub fn save_approxes_to_path<Q: AsRef<Path>>(&self, path: Q) -> Result<()> {
        checkpoint::save_to_path(&self.windows, path)
    }

    pub fn load_approxes_from_path<Q: AsRef<Path>>(&mut self, path: Q) -> Result<()> {
        checkpoint::load_from_path(&mut self.windows, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permutation::is_bijection;
    use crate::target::BorderClassifier;

    fn create_simple_data(n: usize) -> TrainData {
        TrainData::new((0..n).map(|i| (i % 4) as f32).collect())
    }

    #[test]
    fn test_learn_fold_schedule() {
        let data = create_simple_data(600);
        let mut rng = RestorableRng::new(42);
        let fold = Fold::build_learn(
            &data,
            &[BorderClassifier::new(vec![1.5])],
            true,
            1,
            1,
            2.0,
            &mut rng,
        )
        .unwrap();

        assert_eq!(fold.kind(), FoldKind::Learn);
        assert_eq!(fold.effective_doc_count(), 600);
        assert!(is_bijection(fold.permutation()));
        assert_eq!(fold.windows().len(), 6);
        assert_eq!(fold.windows()[0].mix_count(), 12);
        assert_eq!(fold.windows().last().unwrap().tail_finish(), 600);
        assert!(fold.windows()[0].is_mix_seeded());
        assert!(fold.windows()[1..].iter().all(|w| !w.is_mix_seeded()));
    }

    #[test]
    fn test_targets_follow_permutation() {
        let data = TrainData::new(vec![0.0, 1.0, 2.0, 3.0, 4.0])
            .with_weights(vec![0.1, 0.2, 0.3, 0.4, 0.5]);
        let mut rng = RestorableRng::new(7);
        let fold = Fold::build_learn(
            &data,
            &[BorderClassifier::new(vec![2.5])],
            true,
            1,
            1,
            2.0,
            &mut rng,
        )
        .unwrap();

        let weights = fold.learn_weights().unwrap();
        for (z, &idx) in fold.permutation().iter().enumerate() {
            assert_eq!(fold.learn_target()[z], data.target()[idx]);
            assert_eq!(weights[z], data.weights().unwrap()[idx]);
            let expected_class = usize::from(data.target()[idx] > 2.5);
            assert_eq!(fold.target_classes().classes(0)[z], expected_class);
        }
        assert_eq!(fold.target_classes().class_count(0), 2);
    }

    #[test]
    fn test_missing_weights_stay_missing() {
        let data = create_simple_data(10);
        let mut rng = RestorableRng::new(1);
        let fold =
            Fold::build_learn(&data, &[BorderClassifier::constant()], false, 1, 1, 2.0, &mut rng)
                .unwrap();
        assert!(fold.learn_weights().is_none());
    }

    #[test]
    fn test_reassign_targets_is_idempotent() {
        let data = create_simple_data(50).with_weights(vec![1.0; 50]);
        let classifiers = [BorderClassifier::new(vec![0.5, 1.5])];
        let mut rng = RestorableRng::new(3);
        let mut fold = Fold::build_learn(&data, &classifiers, true, 1, 1, 2.0, &mut rng).unwrap();
        let target = fold.learn_target().to_vec();
        let classes = fold.target_classes().clone();

        fold.reassign_targets(&data, &classifiers).unwrap();
        assert_eq!(fold.learn_target(), target.as_slice());
        assert_eq!(fold.target_classes(), &classes);
    }

    #[test]
    fn test_reassign_targets_rejects_other_dataset() {
        let data = create_simple_data(10);
        let classifiers = [BorderClassifier::constant()];
        let mut rng = RestorableRng::new(3);
        let mut fold = Fold::build_learn(&data, &classifiers, true, 1, 1, 2.0, &mut rng).unwrap();
        let target = fold.learn_target().to_vec();

        let shorter = create_simple_data(5);
        assert!(matches!(
            fold.reassign_targets(&shorter, &classifiers),
            Err(FoldError::InvalidConfiguration(_))
        ));
        let bad_weights = create_simple_data(10).with_weights(vec![1.0; 3]);
        assert!(matches!(
            fold.reassign_targets(&bad_weights, &classifiers),
            Err(FoldError::InvalidConfiguration(_))
        ));
        assert_eq!(fold.learn_target(), target.as_slice());
    }

    #[test]
    fn test_configured_ctr_budget_triggers_trim() {
        let data = create_simple_data(10);
        let params = FoldParams {
            max_multi_feature_ctrs: 2,
            ..FoldParams::default()
        };
        let mut rng = RestorableRng::new(8);
        let mut fold: Fold = Fold::build_learn_with(
            &data,
            &[BorderClassifier::constant()],
            &params,
            &mut rng,
            StatisticTables::new(),
        )
        .unwrap();
        assert_eq!(fold.max_multi_feature_ctrs(), 2);

        for i in 1..=2 {
            let mut multi = Projection::single_cat(0);
            multi.add_cat(i);
            fold.get_ctr_ref(multi);
        }
        assert_eq!(fold.trim_online_ctrs_to_budget(), 0);

        let mut multi = Projection::single_cat(0);
        multi.add_cat(3);
        fold.get_ctr_ref(multi);
        assert_eq!(fold.trim_online_ctrs_to_budget(), 3);
        assert_eq!(fold.ctrs().multi_feature_len(), 0);
    }

    #[test]
    fn test_default_ctr_budget() {
        let data = create_simple_data(4);
        let mut rng = RestorableRng::new(8);
        let fold =
            Fold::build_learn(&data, &[BorderClassifier::constant()], true, 1, 1, 2.0, &mut rng)
                .unwrap();
        assert_eq!(
            fold.max_multi_feature_ctrs(),
            FoldParams::default().max_multi_feature_ctrs
        );
    }

    #[test]
    fn test_invalid_construction() {
        let data = create_simple_data(10);
        let classifiers = [BorderClassifier::constant()];
        let mut rng = RestorableRng::new(1);
        for result in [
            Fold::build_learn(&data, &classifiers, true, 1, 1, 1.0, &mut rng),
            Fold::build_learn(&data, &classifiers, true, 0, 1, 2.0, &mut rng),
            Fold::build_learn(&data, &classifiers, true, 1, 0, 2.0, &mut rng),
        ] {
            assert!(matches!(result, Err(FoldError::InvalidConfiguration(_))));
        }

        let with_baseline = create_simple_data(10).with_baseline(vec![vec![0.0; 10]]);
        assert!(Fold::build_learn(&with_baseline, &classifiers, true, 1, 2, 2.0, &mut rng).is_err());
    }

    #[test]
    fn test_empty_dataset_has_no_windows() {
        let data = TrainData::new(Vec::new());
        let mut rng = RestorableRng::new(1);
        let fold =
            Fold::build_learn(&data, &[BorderClassifier::constant()], true, 1, 1, 2.0, &mut rng)
                .unwrap();
        let mut fold = fold;
        assert!(fold.windows().is_empty());
        assert!(fold.seed_all_mixes().is_ok());
        assert!(fold.seed_mix(0).is_err());
    }

    #[test]
    fn test_averaging_fold() {
        let data = create_simple_data(8).with_holdout(4);
        let mut rng = RestorableRng::new(11);
        let fold =
            Fold::build_averaging(&data, &[BorderClassifier::constant()], true, 2, &mut rng)
                .unwrap();

        assert_eq!(fold.kind(), FoldKind::Averaging);
        assert_eq!(fold.windows().len(), 1);
        let window = &fold.windows()[0];
        assert_eq!(window.mix_count(), 8);
        assert_eq!(window.tail_finish(), 12);
        assert_eq!(window.buffer_len(), 12);
        assert_eq!(window.approx_dimension(), 2);
        assert_eq!(fold.effective_doc_count(), 12);
        assert_eq!(fold.learn_target().len(), 8);
    }

    #[test]
    fn test_seed_mix_carries_previous_tail() {
        let data = create_simple_data(20);
        let mut rng = RestorableRng::new(5);
        let mut fold =
            Fold::build_learn(&data, &[BorderClassifier::constant()], true, 1, 1, 2.0, &mut rng)
                .unwrap();

        for window in fold.windows_mut() {
            let tail = window.tail();
            for pos in tail {
                window.approx[0][pos] = pos as f64 * 10.0;
            }
        }
        fold.seed_all_mixes().unwrap();

        let windows = fold.windows();
        for idx in 1..windows.len() {
            let window = &windows[idx];
            assert!(window.is_mix_seeded());
            assert_eq!(
                &window.approx[0][..window.mix_count()],
                &windows[idx - 1].approx[0][..window.mix_count()]
            );
        }
        let count = windows.len();
        assert!(fold.seed_mix(count).is_err());
    }

    #[test]
    fn test_ctr_facade() {
        let data = create_simple_data(10);
        let mut rng = RestorableRng::new(5);
        let mut fold =
            Fold::build_learn(&data, &[BorderClassifier::constant()], true, 1, 1, 2.0, &mut rng)
                .unwrap();

        let single = Projection::single_cat(0);
        let mut multi = Projection::single_cat(0);
        multi.add_cat(1);

        assert!(matches!(fold.get_ctr(&single), Err(FoldError::NotFound(_))));
        fold.get_ctr_ref(single.clone()).feature.push(vec![1, 2]);
        fold.get_ctr_ref(multi.clone());
        assert_eq!(fold.ctrs().single_feature_len(), 1);
        assert_eq!(fold.ctrs().multi_feature_len(), 1);

        assert_eq!(fold.drop_empty_ctrs(), 1);
        assert!(fold.get_ctr(&single).is_ok());
        assert_eq!(fold.trim_online_ctrs(0), 0);
    }
}
