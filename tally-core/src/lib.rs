//! tally-core: transaction types, category names and the keyword rule matcher

pub mod category;
pub mod rules;
pub mod transaction;

pub use category::{Categorize, INCOME, KNOWN_CATEGORIES, OTHER, capitalize, known_category};
pub use rules::{Rule, RuleMatcher, default_rules};
pub use transaction::{DATE_FORMAT, MalformedRecord, RawRecord, Transaction, format_amount};
