use std::{cmp::Reverse, collections::BTreeMap};

use serde_json::Value;
use time::{
    format_description::FormatItem, macros::format_description, Date, OffsetDateTime,
};

use crate::db::NewExpense;
use crate::expenses::dto::{ExpenseDraft, MonthlyTotal};
use crate::storage::{Record, StoreError, Table};

const ISO_DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
const RECEIPT_DATE: &[FormatItem<'static>] = format_description!("[day]/[month]/[year]");

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum DraftError {
    #[error("Could not detect amount. Enter manually.")]
    AmountRequired,
    #[error("Invalid date '{0}', expected YYYY-MM-DD or DD/MM/YYYY")]
    InvalidDate(String),
}

/// Accepts ISO dates, ISO date-times, and the `DD/MM/YYYY` form printed on receipts.
pub fn parse_date(s: &str) -> Option<Date> {
    let s = s.trim();
    if let Ok(d) = Date::parse(s, RECEIPT_DATE) {
        return Some(d);
    }
    let head = s.get(..10)?;
    Date::parse(head, ISO_DATE).ok()
}

pub fn format_date(d: Date) -> String {
    // Only fails for years outside the four-digit range.
    d.format(ISO_DATE).unwrap_or_else(|_| d.to_string())
}

pub fn normalize_date(s: &str) -> Option<String> {
    let s = s.trim();
    if let Ok(d) = Date::parse(s, ISO_DATE) {
        return Some(format_date(d));
    }
    Date::parse(s, RECEIPT_DATE).ok().map(format_date)
}

pub fn today() -> String {
    format_date(OffsetDateTime::now_utc().date())
}

pub fn draft_to_new_expense(user_email: &str, draft: ExpenseDraft) -> Result<NewExpense, DraftError> {
    let amount = draft.amount.ok_or(DraftError::AmountRequired)?;
    let date = match draft.date.as_deref().map(str::trim) {
        None | Some("") => today(),
        Some(raw) => normalize_date(raw).ok_or_else(|| DraftError::InvalidDate(raw.to_string()))?,
    };
    Ok(NewExpense::new(
        user_email,
        amount,
        draft.category,
        draft.vendor.unwrap_or_default().trim(),
        date,
        draft.notes.unwrap_or_default(),
    )
    .with_raw_text(draft.raw_text.unwrap_or_default()))
}

fn row_date(row: &Record) -> Option<Date> {
    row.get("date").and_then(Value::as_str).and_then(parse_date)
}

/// Non-numeric or missing amounts count as zero.
fn row_amount(row: &Record) -> f64 {
    let amount = match row.get("amount") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    amount.filter(|a| a.is_finite()).unwrap_or(0.0)
}

/// The user's rows, newest date first. Undated rows go last; ties keep insertion order.
pub fn user_history(table: Table, email: &str) -> Result<Vec<Record>, StoreError> {
    table.require_column("user_email")?;
    let mut rows: Vec<Record> = table
        .rows
        .into_iter()
        .filter(|r| r.get("user_email").and_then(Value::as_str) == Some(email))
        .collect();
    rows.sort_by_cached_key(|r| Reverse(row_date(r)));
    Ok(rows)
}

/// Sums amounts per calendar month in ascending order. Rows without a usable date are dropped.
pub fn monthly_totals(rows: &[Record]) -> Vec<MonthlyTotal> {
    let mut buckets: BTreeMap<(i32, u8), f64> = BTreeMap::new();
    for row in rows {
        let Some(date) = row_date(row) else {
            continue;
        };
        *buckets
            .entry((date.year(), u8::from(date.month())))
            .or_insert(0.0) += row_amount(row);
    }
    buckets
        .into_iter()
        .map(|((year, month), total)| MonthlyTotal {
            month: format!("{:04}-{:02}", year, month),
            total,
        })
        .collect()
}
