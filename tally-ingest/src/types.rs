use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which side of the ledger a manually entered record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Income,
    Expense,
}

/// One row of the transactions table: the decoded log line plus the
/// category shown next to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedRow {
    pub amount: f64,
    pub date: NaiveDate,
    /// Original description, or the category itself when the log stored a
    /// category token in the description column
    pub description: String,
    pub category: String,
}
