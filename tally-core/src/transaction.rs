//! Transaction records as they appear in the tally log

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Date format used by the transaction log (ISO 8601 calendar date)
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single income or expense entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    /// Positive = income, negative = expense
    pub amount: f64,
    /// Date of the transaction (YYYY-MM-DD)
    pub date: NaiveDate,
    /// Free-text description, or a category name for rows written by the table view
    pub description: String,
    /// Category, assigned lazily by a categorizer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Undecoded fields of one log line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub fields: Vec<String>,
}

/// Why a log line could not be turned into a [`Transaction`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedRecord {
    #[error("expected at least 3 fields, got {0}")]
    FieldCount(usize),

    #[error("amount is not a number: {0:?}")]
    Amount(String),

    #[error("date is not YYYY-MM-DD: {0:?}")]
    Date(String),
}

impl Transaction {
    /// Create a new, uncategorized Transaction
    pub fn new(amount: f64, date: NaiveDate, description: impl Into<String>) -> Self {
        Self {
            amount,
            date,
            description: description.into(),
            category: None,
        }
    }

    /// False for NaN and infinite amounts, which the log parser never
    /// produces but hand-built transactions can carry.
    pub fn has_finite_amount(&self) -> bool {
        self.amount.is_finite()
    }

    /// Returns true if this is an expense (negative or zero amount)
    pub fn is_expense(&self) -> bool {
        !self.is_income()
    }

    /// Returns true if this is income (positive amount)
    pub fn is_income(&self) -> bool {
        self.amount > 0.0
    }

    /// Get the absolute amount
    pub fn abs_amount(&self) -> f64 {
        self.amount.abs()
    }

    /// Fields in log order: amount, date, description
    pub fn to_fields(&self) -> [String; 3] {
        [
            format_amount(self.amount),
            self.date.format(DATE_FORMAT).to_string(),
            self.description.clone(),
        ]
    }
}

impl RawRecord {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Decode into a Transaction. Extra trailing fields are ignored.
    pub fn parse(&self) -> Result<Transaction, MalformedRecord> {
        if self.fields.len() < 3 {
            return Err(MalformedRecord::FieldCount(self.fields.len()));
        }

        let amount_str = self.fields[0].trim();
        let amount: f64 = amount_str
            .parse()
            .ok()
            .filter(|a: &f64| a.is_finite())
            .ok_or_else(|| MalformedRecord::Amount(amount_str.to_string()))?;

        let date_str = self.fields[1].trim();
        let date = NaiveDate::parse_from_str(date_str, DATE_FORMAT)
            .map_err(|_| MalformedRecord::Date(date_str.to_string()))?;

        Ok(Transaction::new(amount, date, self.fields[2].clone()))
    }
}

impl TryFrom<&RawRecord> for Transaction {
    type Error = MalformedRecord;

    fn try_from(record: &RawRecord) -> Result<Self, Self::Error> {
        record.parse()
    }
}

/// Render an amount the way the log stores it: integers without a fraction,
/// everything else with Rust's shortest round-trip form.
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{:.1}", amount)
    } else {
        amount.to_string()
    }
}
