//! Multinomial Naive Bayes over unigram + bigram counts.
//!
//! A [`TextClassifier`] is either untrained (no model) or holds a complete
//! [`CategoryModel`]. Training builds the new model on the side and only swaps
//! it in once fitting succeeded, so a failed fit never leaves partial state.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::store::ClassifierStore;
use crate::text::Vocabulary;

/// One labeled description used for fitting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub description: String,
    pub label: String,
}

impl TrainingExample {
    pub fn new(description: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            label: label.into(),
        }
    }
}

/// Fitting parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Minimum number of training documents an n-gram must appear in
    pub min_df: usize,
    /// Share of examples held out for accuracy measurement
    pub holdout_ratio: f64,
    /// Seed for the train/holdout shuffle
    pub seed: u64,
    /// Laplace smoothing
    pub alpha: f64,
    /// Threshold used by [`TextClassifier::predict_default`]
    pub default_threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_df: 2,
            holdout_ratio: 0.2,
            seed: 42,
            alpha: 1.0,
            default_threshold: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrainError {
    #[error("need at least 2 distinct categories to train, got {labels}")]
    NotEnoughData { labels: usize },

    #[error("no n-gram occurs in at least {min_df} training descriptions")]
    EmptyVocabulary { min_df: usize },
}

/// Outcome of a successful fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainReport {
    /// Fraction of holdout examples labeled correctly
    pub accuracy: f64,
    pub train_size: usize,
    pub holdout_size: usize,
    /// Labels the model can predict
    pub labels: Vec<String>,
    /// Whether the model was written to the store
    pub persisted: bool,
}

/// Fitted parameters: vocabulary, labels, log priors and per-label token
/// log likelihoods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryModel {
    vocabulary: Vocabulary,
    classes: Vec<String>,
    class_log_prior: Vec<f64>,
    feature_log_prob: Vec<Vec<f64>>,
}

impl CategoryModel {
    /// Fit on `examples` using an already pruned vocabulary.
    pub fn fit(examples: &[&TrainingExample], vocabulary: Vocabulary, alpha: f64) -> Self {
        let classes: Vec<String> = examples
            .iter()
            .map(|e| e.label.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let n_features = vocabulary.len();
        let mut class_count = vec![0.0; classes.len()];
        let mut feature_count = vec![vec![0.0; n_features]; classes.len()];

        for ex in examples {
            // classes is sorted, so binary search always hits
            let Ok(c) = classes.binary_search(&ex.label) else { continue };
            class_count[c] += 1.0;
            for (idx, count) in vocabulary.transform(&ex.description) {
                feature_count[c][idx] += count;
            }
        }

        let total: f64 = class_count.iter().sum();
        let class_log_prior = class_count.iter().map(|n| (n / total).ln()).collect();

        let feature_log_prob = feature_count
            .iter()
            .map(|row| {
                let denom = row.iter().sum::<f64>() + alpha * n_features as f64;
                row.iter().map(|n| ((n + alpha) / denom).ln()).collect()
            })
            .collect();

        Self {
            vocabulary,
            classes,
            class_log_prior,
            feature_log_prob,
        }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub(crate) fn reindex(&mut self) {
        self.vocabulary.reindex();
    }

    /// Posterior distribution over labels, most likely first.
    ///
    /// Returns `None` when the numbers do not work out (empty or corrupt
    /// model, non-finite likelihoods).
    pub fn posterior(&self, description: &str) -> Option<Vec<(String, f64)>> {
        if self.classes.is_empty()
            || self.class_log_prior.len() != self.classes.len()
            || self.feature_log_prob.len() != self.classes.len()
        {
            return None;
        }

        let x = self.vocabulary.transform(description);
        let mut jll = Vec::with_capacity(self.classes.len());
        for (prior, flp) in self.class_log_prior.iter().zip(&self.feature_log_prob) {
            let mut score = *prior;
            for &(idx, count) in &x {
                score += count * flp.get(idx)?;
            }
            jll.push(score);
        }

        let max = jll.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return None;
        }
        let exp: Vec<f64> = jll.iter().map(|s| (s - max).exp()).collect();
        let norm: f64 = exp.iter().sum();
        if !norm.is_finite() || norm <= 0.0 {
            return None;
        }

        let mut dist: Vec<(String, f64)> = self
            .classes
            .iter()
            .cloned()
            .zip(exp.into_iter().map(|e| e / norm))
            .collect();
        dist.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Some(dist)
    }

    pub fn recognizes(&self, description: &str) -> bool {
        !self.vocabulary.transform(description).is_empty()
    }

    /// Most likely label regardless of confidence
    pub fn best(&self, description: &str) -> Option<(String, f64)> {
        self.posterior(description)?.into_iter().next()
    }
}

/// Trainable description → category classifier with an optional backing store
#[derive(Debug, Default)]
pub struct TextClassifier {
    config: ClassifierConfig,
    model: Option<CategoryModel>,
    store: Option<ClassifierStore>,
}

impl TextClassifier {
    /// An untrained classifier with no persistence
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            model: None,
            store: None,
        }
    }

    /// Attach a store and restore a previously saved model from it, if any.
    pub fn with_store(config: ClassifierConfig, store: ClassifierStore) -> Self {
        let model = store.load();
        if model.is_some() {
            info!(path = %store.path().display(), "loaded saved category model");
        }
        Self {
            config,
            model,
            store: Some(store),
        }
    }

    /// Wrap an existing fitted model
    pub fn from_model(config: ClassifierConfig, model: CategoryModel) -> Self {
        Self {
            config,
            model: Some(model),
            store: None,
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<&CategoryModel> {
        self.model.as_ref()
    }

    /// Whether `description` shares at least one n-gram with the model's
    /// vocabulary. Without one a prediction only reflects the label priors.
    pub fn recognizes(&self, description: &str) -> bool {
        self.model.as_ref().is_some_and(|m| m.recognizes(description))
    }

    /// Fit a new model, replacing the current one on success, and save it to
    /// the store when one is attached.
    pub fn train(&mut self, examples: &[TrainingExample]) -> Result<TrainReport, TrainError> {
        let labels: BTreeSet<&str> = examples.iter().map(|e| e.label.as_str()).collect();
        if labels.len() < 2 {
            debug!(labels = labels.len(), "skipping training");
            return Err(TrainError::NotEnoughData { labels: labels.len() });
        }

        let (train, holdout) = split(examples, self.config.holdout_ratio, self.config.seed);
        let docs: Vec<&str> = train.iter().map(|e| e.description.as_str()).collect();
        let vocabulary = Vocabulary::fit(&docs, self.config.min_df);
        if vocabulary.is_empty() {
            return Err(TrainError::EmptyVocabulary {
                min_df: self.config.min_df,
            });
        }

        let model = CategoryModel::fit(&train, vocabulary, self.config.alpha);

        let correct = holdout
            .iter()
            .filter(|e| model.best(&e.description).is_some_and(|(label, _)| label == e.label))
            .count();
        let accuracy = if holdout.is_empty() {
            0.0
        } else {
            correct as f64 / holdout.len() as f64
        };

        let persisted = match &self.store {
            Some(store) => match store.save(&model) {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "category model trained but could not be saved");
                    false
                }
            },
            None => false,
        };

        let report = TrainReport {
            accuracy,
            train_size: train.len(),
            holdout_size: holdout.len(),
            labels: model.classes().to_vec(),
            persisted,
        };
        info!(
            accuracy = %format!("{:.2}", accuracy),
            train = report.train_size,
            holdout = report.holdout_size,
            vocabulary = model.vocabulary().len(),
            "model trained"
        );

        self.model = Some(model);
        Ok(report)
    }

    /// Predict a category, but only when the top posterior is at least
    /// `threshold`. Untrained classifiers and numeric failures yield `None`.
    pub fn predict(&self, description: &str, threshold: f64) -> Option<String> {
        let Some(model) = &self.model else {
            debug!("prediction skipped: model not trained");
            return None;
        };

        match model.best(description) {
            Some((label, p)) if p >= threshold => Some(label),
            Some(_) => None,
            None => {
                warn!(description, "prediction failed");
                None
            }
        }
    }

    /// [`predict`](Self::predict) with the configured default threshold
    pub fn predict_default(&self, description: &str) -> Option<String> {
        self.predict(description, self.config.default_threshold)
    }

    /// Full posterior distribution; empty when untrained or on failure
    pub fn posterior(&self, description: &str) -> Vec<(String, f64)> {
        self.model
            .as_ref()
            .and_then(|m| m.posterior(description))
            .unwrap_or_default()
    }
}

/// Stratified split. Each label's examples are shuffled with the seeded
/// generator and `floor(ratio * n_label)` of them go to the holdout, but a
/// label never gives up its last example. When that leaves the holdout
/// empty, the largest label with two or more examples gives up one.
fn split(
    examples: &[TrainingExample],
    ratio: f64,
    seed: u64,
) -> (Vec<&TrainingExample>, Vec<&TrainingExample>) {
    let mut groups: BTreeMap<&str, Vec<&TrainingExample>> = BTreeMap::new();
    for ex in examples {
        groups.entry(ex.label.as_str()).or_default().push(ex);
    }

    let mut rng = SplitMix64(seed);
    let mut quotas = Vec::with_capacity(groups.len());
    for group in groups.values_mut() {
        for i in (1..group.len()).rev() {
            let j = (rng.next() % (i as u64 + 1)) as usize;
            group.swap(i, j);
        }
        let n = group.len();
        quotas.push(((ratio.max(0.0) * n as f64).floor() as usize).min(n - 1));
    }

    if quotas.iter().all(|&q| q == 0) {
        let mut largest: Option<(usize, usize)> = None;
        for (i, group) in groups.values().enumerate() {
            if group.len() >= 2 && largest.is_none_or(|(_, n)| group.len() > n) {
                largest = Some((i, group.len()));
            }
        }
        if let Some((i, _)) = largest {
            quotas[i] = 1;
        }
    }

    let mut train = Vec::with_capacity(examples.len());
    let mut holdout = Vec::new();
    for (group, quota) in groups.into_values().zip(quotas) {
        let (held, kept) = group.split_at(quota);
        holdout.extend_from_slice(held);
        train.extend_from_slice(kept);
    }
    (train, holdout)
}

struct SplitMix64(u64);

impl SplitMix64 {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn examples() -> Vec<TrainingExample> {
        [
            ("pizza dinner", "Food"),
            ("pizza lunch", "Food"),
            ("burger dinner", "Food"),
            ("burger lunch", "Food"),
            ("coffee beans", "Food"),
            ("coffee shop", "Food"),
            ("uber ride", "Transport"),
            ("ola ride", "Transport"),
            ("uber airport ride", "Transport"),
            ("ola cab ride", "Transport"),
            ("bus pass", "Transport"),
            ("bus ticket", "Transport"),
        ]
        .into_iter()
        .map(|(d, l)| TrainingExample::new(d, l))
        .collect()
    }

    #[test]
    fn test_untrained_predicts_nothing() {
        let clf = TextClassifier::new(ClassifierConfig::default());
        assert!(!clf.is_trained());
        assert_eq!(clf.predict("pizza", 0.0), None);
        assert!(clf.posterior("pizza").is_empty());
    }

    #[test]
    fn test_single_label_is_not_enough_data() {
        let mut clf = TextClassifier::new(ClassifierConfig::default());
        let data = vec![
            TrainingExample::new("pizza", "Food"),
            TrainingExample::new("pizza slice", "Food"),
        ];
        assert_eq!(clf.train(&data), Err(TrainError::NotEnoughData { labels: 1 }));
        assert!(!clf.is_trained());
        assert_eq!(clf.predict("pizza", 0.0), None);
    }

    #[test]
    fn test_train_then_predict_training_example() {
        let mut clf = TextClassifier::new(ClassifierConfig::default());
        let report = clf.train(&examples()).unwrap();
        assert!(clf.is_trained());
        assert!((0.0..=1.0).contains(&report.accuracy));
        // floor(0.2 * 6) = 1 from each label
        assert_eq!(report.holdout_size, 2);
        assert_eq!(report.train_size, 10);
        assert!(!report.persisted);
        for ex in examples() {
            assert!(clf.predict(&ex.description, 0.0).is_some());
        }
    }

    #[test]
    fn test_threshold_gates_prediction() {
        let mut clf = TextClassifier::new(ClassifierConfig {
            holdout_ratio: 0.1,
            ..Default::default()
        });
        clf.train(&examples()).unwrap();
        // Unknown text falls back to the priors, which are nowhere near certain
        assert!(clf.predict("zzz unknown", 0.0).is_some());
        assert_eq!(clf.predict("zzz unknown", 0.99), None);
        assert_eq!(clf.predict("zzz unknown", 1.01), None);
    }

    #[test]
    fn test_posterior_sums_to_one_and_is_sorted() {
        let mut clf = TextClassifier::new(ClassifierConfig::default());
        clf.train(&examples()).unwrap();
        let dist = clf.posterior("ride");
        let total: f64 = dist.iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(dist.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn test_empty_vocabulary_leaves_model_unchanged() {
        let mut clf = TextClassifier::new(ClassifierConfig::default());
        let data = vec![
            TrainingExample::new("pizza", "Food"),
            TrainingExample::new("bus", "Transport"),
            TrainingExample::new("pen", "Stationery"),
        ];
        assert_eq!(clf.train(&data), Err(TrainError::EmptyVocabulary { min_df: 2 }));
        assert!(!clf.is_trained());
    }

    #[test]
    fn test_retrain_replaces_model() {
        let mut clf = TextClassifier::new(ClassifierConfig { min_df: 1, ..Default::default() });
        clf.train(&examples()).unwrap();
        let before = clf.model().unwrap().classes().to_vec();

        let other = vec![
            TrainingExample::new("netflix plan", "Entertainment"),
            TrainingExample::new("netflix month", "Entertainment"),
            TrainingExample::new("rent month", "Utilities"),
            TrainingExample::new("rent flat", "Utilities"),
            TrainingExample::new("water bill month", "Utilities"),
        ];
        clf.train(&other).unwrap();
        assert_ne!(clf.model().unwrap().classes(), before.as_slice());
    }

    #[test]
    fn test_split_is_deterministic() {
        let data = examples();
        let (a_train, a_hold) = split(&data, 0.2, 42);
        let (b_train, b_hold) = split(&data, 0.2, 42);
        assert_eq!(a_train, b_train);
        assert_eq!(a_hold, b_hold);
        assert_eq!(a_hold.len(), 2);
        assert_eq!(a_hold.iter().filter(|e| e.label == "Food").count(), 1);
    }

    #[test]
    fn test_split_never_takes_a_labels_last_example() {
        let data = vec![TrainingExample::new("a", "x"), TrainingExample::new("b", "y")];
        let (train, holdout) = split(&data, 0.2, 42);
        assert_eq!(train.len(), 2);
        assert!(holdout.is_empty());

        let (train, holdout) = split(&data, 0.99, 7);
        assert_eq!(train.len(), 2);
        assert!(holdout.is_empty());
    }

    #[test]
    fn test_split_holds_out_one_from_largest_label_when_quotas_round_down() {
        let data = vec![
            TrainingExample::new("a", "x"),
            TrainingExample::new("b", "y"),
            TrainingExample::new("c", "y"),
            TrainingExample::new("d", "y"),
        ];
        let (train, holdout) = split(&data, 0.2, 42);
        assert_eq!(train.len(), 3);
        assert_eq!(holdout.len(), 1);
        assert_eq!(holdout[0].label, "y");
    }

    #[test]
    fn test_single_example_label_stays_in_training() {
        let mut data: Vec<TrainingExample> = (1..=9)
            .map(|i| TrainingExample::new(format!("pizza slice {i}"), "Food"))
            .collect();
        data.push(TrainingExample::new("bus ticket", "Transport"));

        for seed in 0..32 {
            let (train, _) = split(&data, 0.2, seed);
            assert!(train.iter().any(|e| e.label == "Transport"), "seed {seed}");
        }

        let mut clf = TextClassifier::new(ClassifierConfig::default());
        let report = clf.train(&data).unwrap();
        assert_eq!(report.labels, ["Food", "Transport"]);
        assert_eq!(report.train_size, 9);
        assert_eq!(report.holdout_size, 1);
        assert!(clf.posterior("pizza slice").iter().all(|(_, p)| *p < 1.0));
    }

    #[test]
    fn test_default_threshold_accepts_what_stricter_threshold_rejects() {
        // With no vocabulary the posterior is the prior: 72/100 Food
        let data: Vec<TrainingExample> = (0..100)
            .map(|i| {
                let label = if i < 72 { "Food" } else { "Transport" };
                TrainingExample::new(format!("entry {i}"), label)
            })
            .collect();
        let refs: Vec<&TrainingExample> = data.iter().collect();
        let model = CategoryModel::fit(&refs, Vocabulary::from_terms(Vec::new()), 1.0);
        let clf = TextClassifier::from_model(ClassifierConfig::default(), model);

        let (label, p) = clf.model().unwrap().best("anything").unwrap();
        assert_eq!(label, "Food");
        assert!((p - 0.72).abs() < 1e-12);
        assert_eq!(clf.predict_default("anything"), Some("Food".to_string()));
        assert_eq!(clf.predict("anything", 0.75), None);
        assert!(!clf.recognizes("anything"));
    }

    #[test]
    fn test_recognizes_only_vocabulary_terms() {
        let mut clf = TextClassifier::new(ClassifierConfig::default());
        assert!(!clf.recognizes("uber ride"));
        clf.train(&examples()).unwrap();
        assert!(clf.recognizes("uber ride"));
        assert!(!clf.recognizes("zzz unknown"));
    }

    #[test]
    fn test_model_fit_priors_and_likelihoods() {
        let data = [
            TrainingExample::new("ride", "Transport"),
            TrainingExample::new("ride", "Transport"),
            TrainingExample::new("pizza", "Food"),
        ];
        let refs: Vec<&TrainingExample> = data.iter().collect();
        let vocab = Vocabulary::from_terms(vec!["pizza".into(), "ride".into()]);
        let model = CategoryModel::fit(&refs, vocab, 1.0);
        assert_eq!(model.classes(), ["Food", "Transport"]);
        let (label, p) = model.best("ride").unwrap();
        assert_eq!(label, "Transport");
        // P(T|ride) ∝ 2/3 * 3/4 ; P(F|ride) ∝ 1/3 * 1/3
        let expected = (2.0 / 3.0 * 0.75) / (2.0 / 3.0 * 0.75 + 1.0 / 9.0);
        assert!((p - expected).abs() < 1e-12);
    }
}
