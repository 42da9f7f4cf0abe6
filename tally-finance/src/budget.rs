//! Monthly budget limits per category and how close spending is to them.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tally_core::{Categorize, Transaction};
use thiserror::Error;
use tracing::info;

/// Share of a limit at which spending is flagged as close to the limit
pub const WARN_RATIO: f64 = 0.8;

#[derive(Debug, Error)]
pub enum BudgetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("budget file is not a category -> limit object: {0}")]
    Json(#[from] serde_json::Error),
}

/// Category → monthly limit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BudgetLimits(pub BTreeMap<String, f64>);

impl BudgetLimits {
    /// Read limits from a JSON object. A missing file means no budgets.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BudgetError> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no budget file");
            return Ok(Self::default());
        }
        let s = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&s)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), BudgetError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn set(&mut self, category: impl Into<String>, limit: f64) {
        self.0.insert(category.into(), limit);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetStatus {
    WithinLimit,
    NearLimit,
    Exceeded,
}

impl BudgetStatus {
    pub fn for_spend(spent: f64, limit: f64) -> Self {
        if spent >= limit {
            BudgetStatus::Exceeded
        } else if spent >= WARN_RATIO * limit {
            BudgetStatus::NearLimit
        } else {
            BudgetStatus::WithinLimit
        }
    }
}

/// Spend against one category's limit for a month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetCheck {
    pub category: String,
    pub spent: f64,
    pub limit: f64,
    pub status: BudgetStatus,
}

/// Compare each budgeted category's expenses in `year`/`month` with its limit.
/// Results follow the (sorted) order of the limits.
pub fn evaluate<C: Categorize>(
    transactions: &[Transaction],
    categorizer: &C,
    limits: &BudgetLimits,
    year: i32,
    month: u32,
) -> Vec<BudgetCheck> {
    let mut spent: BTreeMap<String, f64> = BTreeMap::new();
    for txn in transactions
        .iter()
        .filter(|t| {
            t.has_finite_amount()
                && t.is_expense()
                && t.date.year() == year
                && t.date.month() == month
        })
    {
        *spent.entry(categorizer.categorize(&txn.description)).or_insert(0.0) += txn.abs_amount();
    }

    limits
        .0
        .iter()
        .map(|(category, &limit)| {
            let spent = spent.get(category).copied().unwrap_or(0.0);
            BudgetCheck {
                category: category.clone(),
                spent,
                limit,
                status: BudgetStatus::for_spend(spent, limit),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tally_core::RuleMatcher;
    use tempfile::TempDir;

    fn t(amount: f64, m: u32, day: u32, desc: &str) -> Transaction {
        Transaction::new(amount, NaiveDate::from_ymd_opt(2024, m, day).unwrap(), desc)
    }

    #[test]
    fn test_status_thresholds() {
        assert_eq!(BudgetStatus::for_spend(79.0, 100.0), BudgetStatus::WithinLimit);
        assert_eq!(BudgetStatus::for_spend(80.0, 100.0), BudgetStatus::NearLimit);
        assert_eq!(BudgetStatus::for_spend(100.0, 100.0), BudgetStatus::Exceeded);
        assert_eq!(BudgetStatus::for_spend(150.0, 100.0), BudgetStatus::Exceeded);
    }

    #[test]
    fn test_evaluate_month() {
        let txns = vec![
            t(-60.0, 3, 1, "pizza"),
            t(-25.0, 3, 9, "coffee"),
            t(-500.0, 2, 28, "pizza"), // previous month
            t(300.0, 3, 2, "pizza refund"), // income never counts
            t(-10.0, 3, 5, "bus"),
            t(f64::NAN, 3, 6, "pizza"),
        ];
        let mut limits = BudgetLimits::default();
        limits.set("Food", 100.0);
        limits.set("Transport", 50.0);
        limits.set("Shopping", 20.0);

        let checks = evaluate(&txns, &RuleMatcher::default(), &limits, 2024, 3);
        assert_eq!(checks.len(), 3);
        assert_eq!(checks[0].category, "Food");
        assert_eq!(checks[0].spent, 85.0);
        assert_eq!(checks[0].status, BudgetStatus::NearLimit);
        assert_eq!(checks[1].category, "Shopping");
        assert_eq!(checks[1].spent, 0.0);
        assert_eq!(checks[2].status, BudgetStatus::WithinLimit);
    }

    #[test]
    fn test_load_save_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("budgets.json");
        assert!(BudgetLimits::load(&path).unwrap().is_empty());

        let mut limits = BudgetLimits::default();
        limits.set("Food", 3000.0);
        limits.save(&path).unwrap();
        assert_eq!(BudgetLimits::load(&path).unwrap(), limits);

        fs::write(&path, r#"{"Food": 100, "Transport": 40.5}"#).unwrap();
        let loaded = BudgetLimits::load(&path).unwrap();
        assert_eq!(loaded.0.get("Transport"), Some(&40.5));
    }

    #[test]
    fn test_load_rejects_non_object() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("budgets.json");
        fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(BudgetLimits::load(&path), Err(BudgetError::Json(_))));
    }
}
