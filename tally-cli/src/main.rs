use anyhow::{Context, Result, bail};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use tally_finance::{
    BudgetLimits, BudgetStatus, Categorizer, ClassifierStore, Summary, TextClassifier,
    TrainingExample, TransactionAggregator, evaluate_budgets, monthly_breakdown, monthly_spending,
    monthly_trend, seed_examples, weekly_spending,
};
use tally_ingest::{EntryKind, read_log, read_transactions, record_entry, rewrite_categorized};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;
mod state;

use config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "tally",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("TALLY_BUILD_SHA"), ")"),
    about = "Personal finance tracker with learned categories"
)]
struct Cli {
    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Transaction log (defaults to the configured path)
    #[arg(long, global = true)]
    log: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train the classifier from a `description,label` CSV (or the built-in examples)
    Train {
        #[arg(long)]
        examples: Option<PathBuf>,
    },

    /// Show the classifier's posterior for a description
    Predict { description: String },

    /// Categorize a description the way summaries do
    Categorize { description: String },

    /// Income, expense, balance and per-category totals
    Summary,

    /// Categorized transaction table; rewrites the log with categories
    Transactions {
        /// Only print, leave the log untouched
        #[arg(long)]
        no_rewrite: bool,
    },

    /// Record an expense (amount is entered positive)
    AddExpense {
        #[arg(long)]
        amount: f64,
        /// YYYY-MM-DD, defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        description: String,
    },

    /// Record income
    AddIncome {
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        description: String,
    },

    /// Monthly budgets
    Budget {
        #[command(subcommand)]
        command: BudgetCommand,
    },

    /// Spending series behind the charts
    Report {
        #[arg(value_enum)]
        kind: ReportKind,
    },

    /// Saved classifier model
    Model {
        #[command(subcommand)]
        command: ModelCommand,
    },

    /// Config file (~/.tally/config.toml)
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum BudgetCommand {
    /// Compare this month's (or --month YYYY-MM) spending with the limits
    Check {
        #[arg(long)]
        month: Option<String>,
    },
    /// Set a category's monthly limit
    Set { category: String, limit: f64 },
}

#[derive(Subcommand, Debug)]
enum ModelCommand {
    /// Delete the saved model
    Reset,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config
    Init,
    /// Print the effective config
    Show,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ReportKind {
    Weekly,
    Monthly,
    Breakdown,
    Trend,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    if let Command::Config { command } = &cli.command {
        return match command {
            ConfigCommand::Init => config::init_config(),
            ConfigCommand::Show => {
                let cfg = config::load_config()?;
                print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
                Ok(())
            }
        };
    }

    let cfg = config::load_config()?;
    let log_path = cli.log.clone().unwrap_or_else(|| cfg.paths.transactions.clone());

    match cli.command {
        Command::Train { examples } => {
            let examples = match examples {
                Some(p) => read_examples(&p)?,
                None => seed_examples(),
            };
            let mut categorizer = build_categorizer(&cfg, false);
            match categorizer.train(&examples) {
                Ok(report) => {
                    println!("Model trained. Accuracy: {:.2}", report.accuracy);
                    println!(
                        "Examples: {} train / {} holdout | labels: {}",
                        report.train_size,
                        report.holdout_size,
                        report.labels.join(", ")
                    );
                    if !report.persisted {
                        println!(
                            "Warning: model could not be saved to {}",
                            cfg.paths.model.display()
                        );
                    }
                }
                Err(e) => println!("Model not trained: {e}"),
            }
        }

        Command::Predict { description } => {
            let categorizer = build_categorizer(&cfg, cfg.seed_on_first_run);
            let dist = categorizer.classifier().posterior(&description);
            if dist.is_empty() {
                println!("(classifier not trained)");
            }
            for (label, p) in dist.iter().take(5) {
                println!("{:>6.1}%  {}", p * 100.0, label);
            }
            println!("=> {}", categorizer.categorize(&description));
        }

        Command::Categorize { description } => {
            let categorizer = build_categorizer(&cfg, cfg.seed_on_first_run);
            println!("{}", categorizer.categorize(&description));
        }

        Command::Summary => {
            let categorizer = build_categorizer(&cfg, cfg.seed_on_first_run);
            let records =
                read_log(&log_path).with_context(|| format!("reading {}", log_path.display()))?;
            let summary = TransactionAggregator::new(&categorizer).aggregate_records(&records);
            print_summary(&summary);
        }

        Command::Transactions { no_rewrite } => {
            let categorizer = build_categorizer(&cfg, cfg.seed_on_first_run);
            let rows = if no_rewrite {
                let records = read_log(&log_path)?;
                tally_ingest::categorized_rows(&records, &categorizer)
            } else {
                rewrite_categorized(&log_path, &categorizer)
                    .with_context(|| format!("rewriting {}", log_path.display()))?
            };
            if rows.is_empty() {
                println!("No transactions found.");
            }
            println!("{:>12}  {:<10}  {:<30}  {}", "Amount", "Date", "Description", "Category");
            for r in &rows {
                println!("{:>12.2}  {}  {:<30}  {}", r.amount, r.date, r.description, r.category);
            }
        }

        Command::AddExpense { amount, date, description } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            record_entry(&log_path, EntryKind::Expense, amount, date, &description)?;
            println!("Expense added.");

            let categorizer = build_categorizer(&cfg, cfg.seed_on_first_run);
            let limits = BudgetLimits::load(&cfg.paths.budgets)?;
            let (txns, _) = read_transactions(&log_path)?;
            for check in evaluate_budgets(&txns, &categorizer, &limits, date.year(), date.month()) {
                match check.status {
                    BudgetStatus::Exceeded => println!(
                        "Budget exceeded for '{}': spent {:.2}, limit {:.2}",
                        check.category, check.spent, check.limit
                    ),
                    BudgetStatus::NearLimit => println!(
                        "Over 80% of the budget for '{}': spent {:.2}, limit {:.2}",
                        check.category, check.spent, check.limit
                    ),
                    BudgetStatus::WithinLimit => {}
                }
            }
        }

        Command::AddIncome { amount, date, description } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            record_entry(&log_path, EntryKind::Income, amount, date, &description)?;
            println!("Income added.");
        }

        Command::Budget { command } => match command {
            BudgetCommand::Check { month } => {
                let (year, month) = match month {
                    Some(m) => parse_month(&m)?,
                    None => {
                        let today = Local::now().date_naive();
                        (today.year(), today.month())
                    }
                };
                let limits = BudgetLimits::load(&cfg.paths.budgets)?;
                if limits.is_empty() {
                    println!("No budgets set. Use: tally budget set <category> <limit>");
                    return Ok(());
                }
                let categorizer = build_categorizer(&cfg, cfg.seed_on_first_run);
                let (txns, _) = read_transactions(&log_path)?;
                println!("Budgets for {year:04}-{month:02}\n");
                for c in evaluate_budgets(&txns, &categorizer, &limits, year, month) {
                    println!(
                        "{:<16} {:>10.2} / {:>10.2}  {:?}",
                        c.category, c.spent, c.limit, c.status
                    );
                }
            }
            BudgetCommand::Set { category, limit } => {
                if !limit.is_finite() || limit <= 0.0 {
                    bail!("limit must be a positive number");
                }
                let mut limits = BudgetLimits::load(&cfg.paths.budgets)?;
                limits.set(category.clone(), limit);
                limits.save(&cfg.paths.budgets)?;
                println!("Budget for '{}' set to {:.2}", category, limit);
            }
        },

        Command::Report { kind } => {
            let (txns, skipped) = read_transactions(&log_path)?;
            if skipped > 0 {
                info!(skipped, "ignored malformed rows");
            }
            match kind {
                ReportKind::Weekly => {
                    for (week, total) in weekly_spending(&txns) {
                        println!("week of {}  {:>10.2}", week, total);
                    }
                }
                ReportKind::Monthly => {
                    for (month, total) in monthly_spending(&txns) {
                        println!("{}  {:>10.2}", month, total);
                    }
                }
                ReportKind::Breakdown => {
                    let categorizer = build_categorizer(&cfg, cfg.seed_on_first_run);
                    for (month, totals) in monthly_breakdown(&txns, &categorizer) {
                        println!("{}", month);
                        for e in totals.iter() {
                            println!("  {:<16} {:>10.2}", e.category, e.total);
                        }
                    }
                }
                ReportKind::Trend => {
                    let monthly = monthly_spending(&txns);
                    match monthly_trend(&monthly) {
                        Some(trend) => {
                            println!(
                                "slope {:+.2} per month, intercept {:.2}",
                                trend.slope, trend.intercept
                            );
                            for (i, (month, total)) in monthly.iter().enumerate() {
                                println!(
                                    "{}  {:>10.2}  (trend {:.2})",
                                    month,
                                    total,
                                    trend.at(i as f64)
                                );
                            }
                        }
                        None => println!("Need at least two months of expenses for a trend."),
                    }
                }
            }
        }

        Command::Model { command } => match command {
            ModelCommand::Reset => {
                let store = ClassifierStore::new(&cfg.paths.model);
                if store.remove()? {
                    println!("Removed {}", cfg.paths.model.display());
                } else {
                    println!("No saved model at {}", cfg.paths.model.display());
                }
            }
        },

        Command::Config { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Load the saved model (or start untrained) and optionally seed-train a
/// fresh one.
fn build_categorizer(cfg: &Config, seed_if_untrained: bool) -> Categorizer {
    if let Some(dir) = cfg.paths.model.parent() {
        if let Err(e) = fs::create_dir_all(dir) {
            warn!(
                dir = %dir.display(),
                error = %e,
                "model directory cannot be created; models will not be saved"
            );
        }
    }

    let store = ClassifierStore::new(&cfg.paths.model);
    let classifier = TextClassifier::with_store(cfg.classifier.clone(), store);
    let mut categorizer =
        Categorizer::new(classifier, cfg.rule_matcher()).with_config(&cfg.categorizer);

    if seed_if_untrained && !categorizer.classifier().is_trained() {
        match categorizer.train(&seed_examples()) {
            Ok(report) => info!(
                accuracy = %format!("{:.2}", report.accuracy),
                "trained on built-in examples"
            ),
            Err(e) => info!(
                reason = %e,
                "built-in examples did not produce a model; using keyword rules"
            ),
        }
    }
    categorizer
}

fn read_examples(path: &Path) -> Result<Vec<TrainingExample>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut out = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let (Some(desc), Some(label)) = (record.get(0), record.get(1)) else {
            continue;
        };
        let (desc, label) = (desc.trim(), label.trim());
        if desc.is_empty() || label.is_empty() {
            continue;
        }
        out.push(TrainingExample::new(desc, label));
    }
    Ok(out)
}

fn parse_month(s: &str) -> Result<(i32, u32)> {
    let date = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
        .with_context(|| format!("month must be YYYY-MM, got {s:?}"))?;
    Ok((date.year(), date.month()))
}

fn print_summary(summary: &Summary) {
    println!("Total Income:      {:>12.2}", summary.total_income);
    println!("Total Expense:     {:>12.2}", summary.total_expense);
    println!("Remaining Balance: {:>12.2}", summary.balance());
    if summary.skipped > 0 {
        println!("({} malformed rows skipped)", summary.skipped);
    }
    if summary.totals.is_empty() {
        return;
    }
    println!();
    println!("{:<16} {:>12} {:>6}", "Category", "Total", "Count");
    for e in summary.totals.iter() {
        println!("{:<16} {:>12.2} {:>6}", e.category, e.total, e.count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2024-03").unwrap(), (2024, 3));
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("March").is_err());
    }

    #[test]
    fn test_read_examples_skips_incomplete_rows() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("examples.csv");
        fs::write(&p, "pizza,Food\nonly-one-field\n,Food\n\"bus, city\",Transport\n").unwrap();
        let ex = read_examples(&p).unwrap();
        assert_eq!(
            ex,
            vec![
                TrainingExample::new("pizza", "Food"),
                TrainingExample::new("bus, city", "Transport"),
            ]
        );
    }

    #[test]
    fn test_build_categorizer_seeds_into_configured_store() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.paths.model = dir.path().join("models").join("m.bin");

        // Default classifier settings: the built-in examples must be enough
        let categorizer = build_categorizer(&cfg, true);
        assert!(categorizer.classifier().is_trained());
        assert!(cfg.paths.model.exists());
        assert_eq!(categorizer.categorize("  food "), "Food");

        // A second start restores the saved model instead of retraining
        let restarted = build_categorizer(&cfg, false);
        assert!(restarted.classifier().is_trained());

        let other = Config {
            paths: config::PathsSection {
                model: dir.path().join("other.bin"),
                ..cfg.paths.clone()
            },
            ..cfg.clone()
        };
        let untouched = build_categorizer(&other, false);
        assert!(!untouched.classifier().is_trained());
    }
}
