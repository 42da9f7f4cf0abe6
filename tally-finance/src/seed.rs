//! Built-in training set used until the user trains on their own data.

use crate::classifier::TrainingExample;

const SEED: &[(&str, &str)] = &[
    ("pizza", "Food"),
    ("flipkart headphones", "Shopping"),
    ("ola ride", "Transport"),
    ("uber ride", "Transport"),
    ("salary", "Income"),
    ("pen", "Stationery"),
    ("checking out", "Other"),
    ("trip", "Travel"),
    ("notebooks", "Stationery"),
    ("coffee", "Food"),
    ("movie ticket", "Entertainment"),
    ("restaurant food", "Food"),
    ("laundry", "Utilities"),
    ("groceries", "Food"),
    ("internet subscription", "Utilities"),
    ("flipkart order", "Shopping"),
    ("burger", "Food"),
    ("icecream", "Food"),
    ("haircut", "Personal Care"),
    ("printer paper", "Stationery"),
    ("snacks", "Food"),
];

pub fn seed_examples() -> Vec<TrainingExample> {
    SEED.iter().map(|(d, l)| TrainingExample::new(*d, *l)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_seed_has_enough_labels() {
        let examples = seed_examples();
        assert_eq!(examples.len(), 21);
        let labels: BTreeSet<_> = examples.iter().map(|e| e.label.as_str()).collect();
        assert!(labels.len() >= 2);
        assert!(labels.contains("Income"));
    }
}
