//! Income / expense totals and per-category breakdowns.

use serde::{Deserialize, Serialize};
use tally_core::{Categorize, RawRecord, Transaction};
use tracing::debug;

/// Running figures for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    /// Sum of absolute amounts
    pub total: f64,
    pub count: usize,
}

/// Category → (absolute spend, transaction count), in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorizedTotals {
    entries: Vec<CategoryTotal>,
}

impl CategorizedTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one transaction's absolute amount to `category`
    pub fn add(&mut self, category: &str, amount: f64) {
        let idx = match self.entries.iter().position(|e| e.category == category) {
            Some(idx) => idx,
            None => {
                self.entries.push(CategoryTotal {
                    category: category.to_string(),
                    total: 0.0,
                    count: 0,
                });
                self.entries.len() - 1
            }
        };
        let entry = &mut self.entries[idx];
        entry.total += amount.abs();
        entry.count += 1;
    }

    pub fn get(&self, category: &str) -> Option<&CategoryTotal> {
        self.entries.iter().find(|e| e.category == category)
    }

    pub fn total(&self, category: &str) -> f64 {
        self.get(category).map(|e| e.total).unwrap_or(0.0)
    }

    pub fn count(&self, category: &str) -> usize {
        self.get(category).map(|e| e.count).unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryTotal> {
        self.entries.iter()
    }

    /// Categories in first-seen order
    pub fn categories(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.category.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_count(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }
}

/// Result of one aggregation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_income: f64,
    pub total_expense: f64,
    pub totals: CategorizedTotals,
    /// Rows that could not be decoded
    pub skipped: usize,
}

impl Summary {
    pub fn balance(&self) -> f64 {
        self.total_income - self.total_expense
    }
}

/// Categorizes transactions and folds them into a [`Summary`]
pub struct TransactionAggregator<C> {
    categorizer: C,
}

impl<C: Categorize> TransactionAggregator<C> {
    pub fn new(categorizer: C) -> Self {
        Self { categorizer }
    }

    /// Aggregate decoded transactions. Stored categories are ignored; every
    /// transaction is recategorized from its description. Entries with a
    /// non-finite amount are counted in `skipped`.
    pub fn aggregate(&self, transactions: &[Transaction]) -> Summary {
        let mut summary = Summary::default();
        for txn in transactions {
            if txn.has_finite_amount() {
                self.add(&mut summary, txn);
            } else {
                debug!(
                    amount = txn.amount,
                    description = %txn.description,
                    "skipping non-finite amount"
                );
                summary.skipped += 1;
            }
        }
        summary
    }

    /// Aggregate raw log rows, skipping the ones that do not decode.
    pub fn aggregate_records(&self, records: &[RawRecord]) -> Summary {
        let mut summary = Summary::default();
        for record in records {
            match record.parse() {
                Ok(txn) => self.add(&mut summary, &txn),
                Err(e) => {
                    debug!(error = %e, "skipping malformed row");
                    summary.skipped += 1;
                }
            }
        }
        summary
    }

    fn add(&self, summary: &mut Summary, txn: &Transaction) {
        let category = self.categorizer.categorize(&txn.description);
        debug!("'{}' => {}", txn.description, category);

        if txn.is_income() {
            summary.total_income += txn.amount;
        } else {
            summary.total_expense += txn.abs_amount();
        }
        summary.totals.add(&category, txn.amount);
    }
}
