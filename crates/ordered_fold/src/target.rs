//! Permuted targets and discrete target classes
//!
//! Online categorical statistics count documents per target class, so each
//! configured classifier maps every permuted target to a class id once per
//! fold.

/// Maps raw target values to discrete classes for one statistic type.
pub trait TargetClassifier {
    fn classify(&self, value: f32) -> usize;

    fn class_count(&self) -> usize;
}

/// Border-based classifier: the class of a value is the number of borders
/// strictly below it, so `n` borders yield `n + 1` classes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BorderClassifier {
    borders: Vec<f32>,
}

impl BorderClassifier {
    pub fn new(mut borders: Vec<f32>) -> Self {
        borders.sort_by(|a, b| a.total_cmp(b));
        borders.dedup();
        Self { borders }
    }

    /// Single class regardless of target
    pub fn constant() -> Self {
        Self::default()
    }

    pub fn borders(&self) -> &[f32] {
        &self.borders
    }
}

impl TargetClassifier for BorderClassifier {
    fn classify(&self, value: f32) -> usize {
        self.borders.partition_point(|&border| border < value)
    }

    fn class_count(&self) -> usize {
        self.borders.len() + 1
    }
}

/// Reorder `source` so position `z` holds `source[permutation[z]]`.
pub fn assign_permuted<T: Copy>(source: &[T], permutation: &[usize]) -> Vec<T> {
    permutation.iter().map(|&idx| source[idx]).collect()
}

/// Per-classifier class ids of every permuted document
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TargetClasses {
    classes: Vec<Vec<usize>>,
    class_counts: Vec<usize>,
}

impl TargetClasses {
    pub fn build<C: TargetClassifier>(permuted_target: &[f32], classifiers: &[C]) -> Self {
        let mut classes = Vec::with_capacity(classifiers.len());
        let mut class_counts = Vec::with_capacity(classifiers.len());

        for classifier in classifiers {
            classes.push(
                permuted_target
                    .iter()
                    .map(|&value| classifier.classify(value))
                    .collect(),
            );
            class_counts.push(classifier.class_count());
        }

        Self {
            classes,
            class_counts,
        }
    }

    /// Number of classifiers
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Class ids for classifier `ctr_idx`, indexed by permuted position
    pub fn classes(&self, ctr_idx: usize) -> &[usize] {
        &self.classes[ctr_idx]
    }

    pub fn class_count(&self, ctr_idx: usize) -> usize {
        self.class_counts[ctr_idx]
    }

    pub fn class_counts(&self) -> &[usize] {
        &self.class_counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_border_classifier() {
        let classifier = BorderClassifier::new(vec![0.5, -1.0, 0.5]);
        assert_eq!(classifier.borders(), &[-1.0, 0.5]);
        assert_eq!(classifier.class_count(), 3);
        assert_eq!(classifier.classify(-2.0), 0);
        assert_eq!(classifier.classify(-1.0), 0);
        assert_eq!(classifier.classify(0.0), 1);
        assert_eq!(classifier.classify(0.5), 1);
        assert_eq!(classifier.classify(0.6), 2);
    }

    #[test]
    fn test_constant_classifier() {
        let classifier = BorderClassifier::constant();
        assert_eq!(classifier.class_count(), 1);
        assert_eq!(classifier.classify(1e9), 0);
    }

    #[test]
    fn test_assign_permuted() {
        let source = vec![10.0f32, 20.0, 30.0, 40.0];
        let permutation = vec![2, 0, 3, 1];
        assert_eq!(
            assign_permuted(&source, &permutation),
            vec![30.0, 10.0, 40.0, 20.0]
        );
    }

    #[test]
    fn test_target_classes_follow_permuted_order() {
        let permuted = vec![0.0f32, 1.0, 2.0, 3.0];
        let classifiers = vec![
            BorderClassifier::new(vec![1.5]),
            BorderClassifier::new(vec![0.5, 2.5]),
        ];
        let table = TargetClasses::build(&permuted, &classifiers);

        assert_eq!(table.len(), 2);
        assert_eq!(table.classes(0), &[0, 0, 1, 1]);
        assert_eq!(table.classes(1), &[0, 1, 1, 2]);
        assert_eq!(table.class_counts(), &[2, 3]);
    }

    #[test]
    fn test_no_classifiers() {
        let table = TargetClasses::build::<BorderClassifier>(&[1.0, 2.0], &[]);
        assert!(table.is_empty());
    }
}
