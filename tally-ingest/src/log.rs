//! The flat transaction log: one `amount,date,description` line per transaction.
//!
//! The log has no header row. Rows that cannot be decoded are kept on read
//! (as raw records) so callers decide whether to skip them; the table view
//! drops them when it rewrites the file.

use std::fs::{self, OpenOptions};
use std::path::Path;

use chrono::NaiveDate;
use tally_core::{Categorize, RawRecord, Transaction, known_category};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::types::{CategorizedRow, EntryKind};

#[derive(Debug, Error)]
pub enum LogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("could not replace log file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("amount must be a positive number, got {0}")]
    InvalidAmount(f64),

    #[error("description must not be empty")]
    EmptyDescription,
}

/// Read every line of the log as raw fields. A missing file is an empty log.
pub fn read_log(path: impl AsRef<Path>) -> Result<Vec<RawRecord>, LogError> {
    let path = path.as_ref();
    if !path.exists() {
        info!(path = %path.display(), "transaction log not found, starting empty");
        return Ok(Vec::new());
    }

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_path(path)?;

    let mut records = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        match result {
            Ok(record) => records.push(RawRecord::new(record.iter())),
            // skip undecodable lines (bad UTF-8 etc.)
            Err(e) => warn!(line = line + 1, error = %e, "skipping unreadable log line"),
        }
    }

    debug!(path = %path.display(), rows = records.len(), "read transaction log");
    Ok(records)
}

/// Read the log and decode it, returning the transactions and the number of
/// malformed rows that were skipped.
pub fn read_transactions(path: impl AsRef<Path>) -> Result<(Vec<Transaction>, usize), LogError> {
    let records = read_log(path)?;
    let mut skipped = 0;
    let txns = records
        .iter()
        .filter_map(|r| match r.parse() {
            Ok(t) => Some(t),
            Err(e) => {
                debug!(error = %e, fields = ?r.fields, "skipping malformed row");
                skipped += 1;
                None
            }
        })
        .collect();
    Ok((txns, skipped))
}

/// Append one transaction to the end of the log, creating it if needed.
pub fn append(path: impl AsRef<Path>, txn: &Transaction) -> Result<(), LogError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    wtr.write_record(txn.to_fields())?;
    wtr.flush()?;
    Ok(())
}

/// Record a manually entered income or expense. `amount` is the positive
/// value typed by the user; expenses are stored negated.
pub fn record_entry(
    path: impl AsRef<Path>,
    kind: EntryKind,
    amount: f64,
    date: NaiveDate,
    description: &str,
) -> Result<Transaction, LogError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(LogError::InvalidAmount(amount));
    }
    let description = description.trim();
    if description.is_empty() {
        return Err(LogError::EmptyDescription);
    }

    let signed = match kind {
        EntryKind::Income => amount,
        EntryKind::Expense => -amount,
    };
    let txn = Transaction::new(signed, date, description);
    append(path, &txn)?;
    info!(amount = signed, %date, description, "recorded {:?}", kind);
    Ok(txn)
}

/// Categorize every decodable record for display. Rows whose description is
/// a category token show the category in both columns.
pub fn categorized_rows<C: Categorize>(
    records: &[RawRecord],
    categorizer: &C,
) -> Vec<CategorizedRow> {
    records
        .iter()
        .filter_map(|r| r.parse().ok())
        .map(|t| {
            let (description, category) = match known_category(&t.description) {
                Some(category) => (category.clone(), category),
                None => {
                    let category = categorizer.categorize(&t.description);
                    (t.description, category)
                }
            };
            CategorizedRow {
                amount: t.amount,
                date: t.date,
                description,
                category,
            }
        })
        .collect()
}

/// Build the table view and rewrite the log as `amount,date,category`,
/// dropping malformed rows. A missing log is left alone.
pub fn rewrite_categorized<C: Categorize>(
    path: impl AsRef<Path>,
    categorizer: &C,
) -> Result<Vec<CategorizedRow>, LogError> {
    let path = path.as_ref();
    if !path.exists() {
        info!(path = %path.display(), "no transactions to rewrite");
        return Ok(Vec::new());
    }

    let records = read_log(path)?;
    let rows = categorized_rows(&records, categorizer);

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir)?;
    {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(tmp.as_file());
        for (record, row) in records.iter().filter(|r| r.parse().is_ok()).zip(&rows) {
            wtr.write_record([
                record.fields[0].trim(),
                record.fields[1].trim(),
                row.category.as_str(),
            ])?;
        }
        wtr.flush()?;
    }
    tmp.persist(path)?;

    let dropped = records.len() - rows.len();
    if dropped > 0 {
        warn!(dropped, "dropped malformed rows while rewriting the log");
    }
    Ok(rows)
}
