//! tally-finance: text classifier, model store, categorizer, aggregation,
//! budgets and report series

pub mod aggregator;
pub mod budget;
pub mod categorizer;
pub mod classifier;
pub mod reports;
pub mod seed;
pub mod stop_words;
pub mod store;
pub mod text;

pub use aggregator::{CategorizedTotals, CategoryTotal, Summary, TransactionAggregator};
pub use budget::{
    BudgetCheck, BudgetError, BudgetLimits, BudgetStatus, evaluate as evaluate_budgets,
};
pub use categorizer::{Categorizer, CategorizerConfig, DEFAULT_THRESHOLD};
pub use classifier::{
    CategoryModel, ClassifierConfig, TextClassifier, TrainError, TrainReport, TrainingExample,
};
pub use reports::{
    Month, Trend, monthly_breakdown, monthly_spending, monthly_trend, weekly_spending,
};
pub use seed::seed_examples;
pub use store::{ClassifierStore, StoreError};
