//! Deterministic keyword rules mapping transaction descriptions to categories.
//!
//! Rules are checked in table order and the first category with a keyword
//! contained in the (lowercased) description wins.

use serde::{Deserialize, Serialize};

use crate::category::{Categorize, OTHER};

/// One row of the rule table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub category: String,
    pub keywords: Vec<String>,
}

impl Rule {
    pub fn new<I, S>(category: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            category: category.into(),
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
        }
    }

    fn matches(&self, normalized: &str) -> bool {
        self.keywords.iter().any(|k| normalized.contains(k.as_str()))
    }
}

/// Keyword → category lookup over an ordered rule table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMatcher {
    rules: Vec<Rule>,
}

impl Default for RuleMatcher {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl RuleMatcher {
    /// Build a matcher from rules in match order. Keywords are lowercased here
    /// so tables loaded from config behave like the built-in one.
    pub fn new(rules: Vec<Rule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|r| Rule::new(r.category, r.keywords))
            .collect();
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Categorize a description. Empty input and no match both yield "Other".
    pub fn categorize(&self, description: &str) -> String {
        let desc = description.to_lowercase();
        if desc.is_empty() {
            return OTHER.to_string();
        }

        self.rules
            .iter()
            .find(|rule| rule.matches(&desc))
            .map(|rule| rule.category.clone())
            .unwrap_or_else(|| OTHER.to_string())
    }
}

impl Categorize for RuleMatcher {
    fn categorize(&self, description: &str) -> String {
        RuleMatcher::categorize(self, description)
    }
}

/// The built-in rule table
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "Food",
            [
                "pizza",
                "burger",
                "restaurant",
                "cafe",
                "restaurant food",
                "groceries",
                "snacks",
                "icecream",
                "coffee",
            ],
        ),
        Rule::new(
            "Transport",
            ["uber ride", "bus", "train", "taxi", "fuel", "ola ride", "uber"],
        ),
        Rule::new(
            "Entertainment",
            ["netflix", "cinema", "movie", "concert", "game", "checking out", "trip"],
        ),
        Rule::new(
            "Shopping",
            [
                "amazon",
                "mall",
                "clothing",
                "electronics",
                "flipkart headphones",
                "groceries",
                "flipkart order",
            ],
        ),
        Rule::new(
            "Utilities",
            ["electricity", "water", "internet", "gas", "rent", "laundry"],
        ),
        Rule::new(
            "Stationery",
            ["pen", "notebooks", "printer paper", "internet subscription"],
        ),
    ]
}
