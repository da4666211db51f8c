//! Pure functions that filter, group and summarize transaction lists.
//!
//! All aggregation reads `amount_base` so that multi-currency ledgers sum
//! in a single currency. These functions never touch the database; callers
//! pass in the rows they loaded.

use serde::{Deserialize, Serialize};
use time::{Date, Month, OffsetDateTime};

use super::core::{Category, Transaction, TransactionKind};

/// The criteria for narrowing down a transaction list.
///
/// All criteria are optional and combine with AND. An empty filter matches
/// everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    /// Keep only transactions in this category.
    pub category: Option<Category>,
    /// Keep only income or only expenses.
    #[serde(rename = "type")]
    pub kind: Option<TransactionKind>,
    /// Keep only transactions on or after this date.
    pub from: Option<Date>,
    /// Keep only transactions on or before this date.
    pub to: Option<Date>,
    /// Keep only transactions whose title, notes or category contain this
    /// text, case-insensitively.
    pub search: Option<String>,
}

impl TransactionFilter {
    fn matches(&self, transaction: &Transaction) -> bool {
        if let Some(category) = self.category
            && transaction.category != Some(category)
        {
            return false;
        }

        if let Some(kind) = self.kind
            && transaction.kind != kind
        {
            return false;
        }

        let date = transaction.date.date();

        if let Some(from) = self.from
            && date < from
        {
            return false;
        }

        if let Some(to) = self.to
            && date > to
        {
            return false;
        }

        if let Some(ref search) = self.search {
            let needle = search.to_lowercase();
            let in_title = transaction.title.to_lowercase().contains(&needle);
            let in_notes = transaction
                .notes
                .as_ref()
                .is_some_and(|notes| notes.to_lowercase().contains(&needle));
            let in_category = transaction
                .category
                .is_some_and(|category| format!("{category:?}").to_lowercase().contains(&needle));

            if !(in_title || in_notes || in_category) {
                return false;
            }
        }

        true
    }
}

/// Drop the transactions that do not match `filter`, preserving order.
pub fn filter_transactions(
    mut transactions: Vec<Transaction>,
    filter: &TransactionFilter,
) -> Vec<Transaction> {
    transactions.retain(|transaction| filter.matches(transaction));

    transactions
}

/// A month's worth of transactions under a human readable label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthGroup {
    /// The month label, e.g. "Jan 2024".
    pub label: String,
    /// The transactions that fall in the month, in their input order.
    pub transactions: Vec<Transaction>,
}

fn short_month(month: Month) -> &'static str {
    match month {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    }
}

fn month_label(date: OffsetDateTime) -> String {
    format!("{} {}", short_month(date.month()), date.year())
}

/// Bucket transactions into calendar months, newest month first.
///
/// The input is expected to already be sorted newest first, the way the
/// database lists transactions. Every transaction lands in exactly one
/// group.
pub fn group_by_month(transactions: &[Transaction]) -> Vec<MonthGroup> {
    let mut groups: Vec<MonthGroup> = Vec::new();
    let mut current_key: Option<(i32, Month)> = None;

    for transaction in transactions {
        let key = (transaction.date.year(), transaction.date.month());

        if current_key != Some(key) {
            groups.push(MonthGroup {
                label: month_label(transaction.date),
                transactions: Vec::new(),
            });
            current_key = Some(key);
        }

        if let Some(group) = groups.last_mut() {
            group.transactions.push(transaction.clone());
        }
    }

    groups
}

/// The income, expense and balance totals over a transaction list.
///
/// All figures are in the user's base currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// The sum of all income amounts.
    pub income_total: f64,
    /// The sum of all expense amounts.
    pub expense_total: f64,
    /// `income_total - expense_total`. May be negative.
    pub balance: f64,
}

/// Total up income, expenses and the resulting balance.
pub fn summarize(transactions: &[Transaction]) -> Summary {
    let mut income_total = 0.0;
    let mut expense_total = 0.0;

    for transaction in transactions {
        match transaction.kind {
            TransactionKind::Income => income_total += transaction.amount_base,
            TransactionKind::Expense => expense_total += transaction.amount_base,
        }
    }

    Summary {
        income_total,
        expense_total,
        balance: income_total - expense_total,
    }
}

/// A single month's income and expense totals for charting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthCashflow {
    /// The short month name, e.g. "Jan".
    pub month: &'static str,
    /// Total income recorded in the month, rounded to two decimal places.
    pub income: f64,
    /// Total expenses recorded in the month, rounded to two decimal places.
    pub expense: f64,
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Total up income and expenses per calendar month of `year`.
///
/// Always returns twelve buckets, January through December, with zeroes for
/// months that have no transactions. The rounding is presentation only, the
/// stored amounts are untouched.
pub fn cashflow_by_month(transactions: &[Transaction], year: i32) -> Vec<MonthCashflow> {
    let mut income = [0.0f64; 12];
    let mut expense = [0.0f64; 12];

    for transaction in transactions {
        if transaction.date.year() != year {
            continue;
        }

        let index = transaction.date.month() as usize - 1;
        match transaction.kind {
            TransactionKind::Income => income[index] += transaction.amount_base,
            TransactionKind::Expense => expense[index] += transaction.amount_base,
        }
    }

    (0..12)
        .map(|index| MonthCashflow {
            month: short_month(Month::try_from(index as u8 + 1).unwrap_or(Month::January)),
            income: round_to_cents(income[index]),
            expense: round_to_cents(expense[index]),
        })
        .collect()
}
