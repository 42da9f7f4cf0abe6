//! Expense series behind the spending charts: weekly, monthly, monthly by
//! category and a month-over-month trend line. Only negative amounts count.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tally_core::{Categorize, Transaction};

use crate::aggregator::CategorizedTotals;

/// Calendar month key, ordered chronologically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl std::fmt::Display for Month {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Least-squares fit `y = slope * x + intercept` over month indices 0..n
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub slope: f64,
    pub intercept: f64,
}

impl Trend {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

fn expenses(transactions: &[Transaction]) -> impl Iterator<Item = &Transaction> {
    transactions
        .iter()
        .filter(|t| t.has_finite_amount() && t.amount < 0.0)
}

/// Monday of the week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Spend per week, keyed by the week's Monday
pub fn weekly_spending(transactions: &[Transaction]) -> Vec<(NaiveDate, f64)> {
    let mut weeks: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for t in expenses(transactions) {
        *weeks.entry(week_start(t.date)).or_insert(0.0) += t.abs_amount();
    }
    weeks.into_iter().collect()
}

/// Spend per calendar month
pub fn monthly_spending(transactions: &[Transaction]) -> Vec<(Month, f64)> {
    let mut months: BTreeMap<Month, f64> = BTreeMap::new();
    for t in expenses(transactions) {
        *months.entry(Month::of(t.date)).or_insert(0.0) += t.abs_amount();
    }
    months.into_iter().collect()
}

/// Spend per calendar month, split by category
pub fn monthly_breakdown<C: Categorize>(
    transactions: &[Transaction],
    categorizer: &C,
) -> Vec<(Month, CategorizedTotals)> {
    let mut months: BTreeMap<Month, CategorizedTotals> = BTreeMap::new();
    for t in expenses(transactions) {
        let category = categorizer.categorize(&t.description);
        months.entry(Month::of(t.date)).or_default().add(&category, t.amount);
    }
    months.into_iter().collect()
}

/// Linear trend over the monthly series; needs at least two months.
pub fn monthly_trend(monthly: &[(Month, f64)]) -> Option<Trend> {
    let n = monthly.len();
    if n < 2 {
        return None;
    }

    let n_f = n as f64;
    let mean_x = (n_f - 1.0) / 2.0;
    let mean_y = monthly.iter().map(|(_, y)| y).sum::<f64>() / n_f;

    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (i, (_, y)) in monthly.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxy += dx * (y - mean_y);
        sxx += dx * dx;
    }

    let slope = sxy / sxx;
    Some(Trend {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}
