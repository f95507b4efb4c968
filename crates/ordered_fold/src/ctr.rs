//! Online statistic tables keyed by feature combination
//!
//! Statistics for single-feature projections and for combinations of two
//! or more features live in separate hash tables. Routing is a pure
//! function of the key. Only the multi-feature table is subject to
//! eviction under memory pressure.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::errors::{FoldError, Result};

/// Key identifying a set of features whose joint statistic is tracked.
pub trait FeatureCombination: Hash + Eq + Clone + Debug {
    /// Number of underlying features (categorical plus binarized numeric)
    fn feature_count(&self) -> usize;
}

/// Routing predicate between the two tables
pub fn is_single_feature<K: FeatureCombination>(key: &K) -> bool {
    key.feature_count() == 1
}

/// Binarized numeric feature: `float_feature > borders[split_idx]`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BinFeature {
    pub float_feature: usize,
    pub split_idx: usize,
}

/// Combination of categorical and binarized numeric features
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Projection {
    pub cat_features: Vec<usize>,
    pub bin_features: Vec<BinFeature>,
}

impl Projection {
    pub fn single_cat(cat_feature: usize) -> Self {
        Self {
            cat_features: vec![cat_feature],
            bin_features: Vec::new(),
        }
    }

    /// Add a categorical feature, keeping the key canonical
    pub fn add_cat(&mut self, cat_feature: usize) {
        if let Err(pos) = self.cat_features.binary_search(&cat_feature) {
            self.cat_features.insert(pos, cat_feature);
        }
    }

    pub fn add_bin(&mut self, bin_feature: BinFeature) {
        if let Err(pos) = self.bin_features.binary_search(&bin_feature) {
            self.bin_features.insert(pos, bin_feature);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cat_features.is_empty() && self.bin_features.is_empty()
    }
}

impl FeatureCombination for Projection {
    fn feature_count(&self) -> usize {
        self.cat_features.len() + self.bin_features.len()
    }
}

/// Per-combination statistic record
pub trait OnlineStatistic: Default {
    /// True once the record holds no computed values
    fn is_empty(&self) -> bool;
}

/// Quantized online CTR values per target-statistic type and document
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OnlineCtr {
    /// `[ctr_idx][doc]`
    pub feature: Vec<Vec<u8>>,
    pub unique_values_count: usize,
}

impl OnlineStatistic for OnlineCtr {
    fn is_empty(&self) -> bool {
        self.feature.is_empty()
    }
}

/// Memory-pressure policy for the multi-feature table.
pub trait EvictionPolicy<K, V> {
    /// Shrink `table` given the entry budget; returns the number evicted.
    fn trim(&mut self, table: &mut HashMap<K, V>, max_entries: usize) -> usize;

    /// Called when a mutable lookup finds or inserts a multi-feature entry
    fn record_access(&mut self, _key: &K) {}
}

/// Drop the whole table once it exceeds the budget.
#[derive(Clone, Copy, Debug, Default)]
pub struct FullClear;

impl<K, V> EvictionPolicy<K, V> for FullClear {
    fn trim(&mut self, table: &mut HashMap<K, V>, max_entries: usize) -> usize {
        if table.len() > max_entries {
            let evicted = table.len();
            table.clear();
            evicted
        } else {
            0
        }
    }
}

/// Single-feature and multi-feature statistic tables behind one facade
#[derive(Clone, Debug)]
pub struct StatisticTables<K = Projection, V = OnlineCtr, P = FullClear> {
    single: HashMap<K, V>,
    multi: HashMap<K, V>,
    policy: P,
}

impl<K, V, P: Default> Default for StatisticTables<K, V, P> {
    fn default() -> Self {
        Self {
            single: HashMap::new(),
            multi: HashMap::new(),
            policy: P::default(),
        }
    }
}

impl<K, V> StatisticTables<K, V, FullClear>
where
    K: FeatureCombination,
    V: OnlineStatistic,
{
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K, V, P> StatisticTables<K, V, P>
where
    K: FeatureCombination,
    V: OnlineStatistic,
    P: EvictionPolicy<K, V>,
{
    pub fn with_policy(policy: P) -> Self {
        Self {
            single: HashMap::new(),
            multi: HashMap::new(),
            policy,
        }
    }

    /// Table responsible for `key`
    pub fn table(&self, key: &K) -> &HashMap<K, V> {
        if is_single_feature(key) {
            &self.single
        } else {
            &self.multi
        }
    }

    fn table_mut(&mut self, key: &K) -> &mut HashMap<K, V> {
        if is_single_feature(key) {
            &mut self.single
        } else {
            &mut self.multi
        }
    }

    pub fn get(&self, key: &K) -> Result<&V> {
        self.table(key)
            .get(key)
            .ok_or_else(|| FoldError::NotFound(format!("{:?}", key)))
    }

    pub fn get_mut(&mut self, key: &K) -> Result<&mut V> {
        let found = if is_single_feature(key) {
            self.single.get_mut(key)
        } else {
            let found = self.multi.get_mut(key);
            if found.is_some() {
                self.policy.record_access(key);
            }
            found
        };
        found.ok_or_else(|| FoldError::NotFound(format!("{:?}", key)))
    }

    /// Existing record, or a freshly default-constructed one
    pub fn get_or_create(&mut self, key: K) -> &mut V {
        if is_single_feature(&key) {
            self.single.entry(key).or_default()
        } else {
            self.policy.record_access(&key);
            self.multi.entry(key).or_default()
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.table(key).contains_key(key)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.table_mut(key).remove(key)
    }

    /// Remove every empty record from both tables.
    pub fn prune_empty(&mut self) -> usize {
        let before = self.len();
        self.single.retain(|_, stat| !stat.is_empty());
        self.multi.retain(|_, stat| !stat.is_empty());
        let removed = before - self.len();
        if removed > 0 {
            tracing::debug!(removed, "pruned empty statistics");
        }
        removed
    }

    /// Apply the eviction policy to the multi-feature table.
    pub fn trim_multi_feature(&mut self, max_entries: usize) -> usize {
        let evicted = self.policy.trim(&mut self.multi, max_entries);
        if evicted > 0 {
            tracing::warn!(
                evicted,
                max_entries,
                "multi-feature statistic table over budget, evicted entries"
            );
        }
        evicted
    }

    pub fn single_feature_len(&self) -> usize {
        self.single.len()
    }

    pub fn multi_feature_len(&self) -> usize {
        self.multi.len()
    }

    pub fn len(&self) -> usize {
        self.single.len() + self.multi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.single.is_empty() && self.multi.is_empty()
    }

    pub fn clear(&mut self) {
        self.single.clear();
        self.multi.clear();
    }

    pub fn single_feature(&self) -> impl Iterator<Item = (&K, &V)> {
        self.single.iter()
    }

    pub fn multi_feature(&self) -> impl Iterator<Item = (&K, &V)> {
        self.multi.iter()
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }
}
