//! Classifier-first categorization with the keyword rules as the fallback.

use serde::{Deserialize, Serialize};
use tally_core::{Categorize, RuleMatcher, known_category};
use tracing::debug;

use crate::classifier::{TextClassifier, TrainError, TrainReport, TrainingExample};

/// Confidence the classifier must reach before its answer is used over the
/// rules. Stricter than the classifier's own default.
pub const DEFAULT_THRESHOLD: f64 = 0.75;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategorizerConfig {
    pub threshold: f64,
}

impl Default for CategorizerConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Owns the process' classifier and rule table
#[derive(Debug)]
pub struct Categorizer {
    classifier: TextClassifier,
    rules: RuleMatcher,
    threshold: f64,
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::rules_only(RuleMatcher::default())
    }
}

impl Categorizer {
    pub fn new(classifier: TextClassifier, rules: RuleMatcher) -> Self {
        Self {
            classifier,
            rules,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn with_config(mut self, config: &CategorizerConfig) -> Self {
        self.threshold = config.threshold;
        self
    }

    /// Rules only, untrained classifier
    pub fn rules_only(rules: RuleMatcher) -> Self {
        Self::new(TextClassifier::default(), rules)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn classifier(&self) -> &TextClassifier {
        &self.classifier
    }

    pub fn rules(&self) -> &RuleMatcher {
        &self.rules
    }

    /// Re-fit the classifier. Exclusive access keeps predictions from racing
    /// the weight swap.
    pub fn train(&mut self, examples: &[TrainingExample]) -> Result<TrainReport, TrainError> {
        self.classifier.train(examples)
    }

    /// Category for a description; never empty, "Other" when nothing applies.
    pub fn categorize(&self, description: &str) -> String {
        // Some log writers store the category itself in the description column
        if let Some(category) = known_category(description) {
            return category;
        }

        if description.trim().is_empty() {
            return self.rules.categorize(description);
        }

        // With no known n-gram the posterior is just the label priors
        if self.classifier.recognizes(description) {
            if let Some(category) = self.classifier.predict(description, self.threshold) {
                debug!(description, %category, "classifier");
                return category;
            }
        }

        let category = self.rules.categorize(description);
        debug!(description, %category, "rules");
        category
    }
}

impl Categorize for Categorizer {
    fn categorize(&self, description: &str) -> String {
        Categorizer::categorize(self, description)
    }
}
