//! tally-ingest: reading, appending and rewriting the flat transaction log.

pub mod log;
pub mod types;

pub use log::{
    LogError, append, categorized_rows, read_log, read_transactions, record_entry,
    rewrite_categorized,
};
pub use types::{CategorizedRow, EntryKind};
