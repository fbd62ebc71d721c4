//! Append-only persistence for users and expenses.
//!
//! Both tables are read back whole as a [`Table`]: named columns mapped to
//! JSON values, in insertion order.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::db::{Expense, NewExpense};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type Record = Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("invalid amount {0}: must be a finite number >= 0")]
    InvalidAmount(f64),
    #[error("column '{column}' not found in {table} table")]
    MissingColumn { column: String, table: &'static str },
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Unavailable(Box::new(e))
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Table {
    pub name: &'static str,
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

impl Table {
    /// Builds a snapshot; an empty table still carries `schema` as its columns.
    /// Column names are trimmed.
    pub fn from_records(name: &'static str, schema: &[&str], records: Vec<Record>) -> Self {
        let rows: Vec<Record> = records
            .into_iter()
            .map(|r| r.into_iter().map(|(k, v)| (k.trim().to_string(), v)).collect())
            .collect();
        let columns = match rows.first() {
            Some(first) => first.keys().cloned().collect(),
            None => schema.iter().map(|c| c.to_string()).collect(),
        };
        Self { name, columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn require_column(&self, column: &str) -> Result<(), StoreError> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(StoreError::MissingColumn {
                column: column.to_string(),
                table: self.name,
            })
        }
    }
}

#[async_trait]
pub trait ExpenseStore: Send + Sync {
    /// Appends a user unless the email is already present. Returns whether a row was written.
    async fn add_user(&self, email: &str, password: &str) -> Result<bool, StoreError>;

    /// True iff a user row matches both fields exactly.
    async fn validate_user(&self, email: &str, password: &str) -> Result<bool, StoreError>;

    /// Appends a fully formed record. Callers go through [`ExpenseStore::add_expense`].
    async fn append_expense(&self, expense: &Expense) -> Result<(), StoreError>;

    async fn read_all_expenses(&self) -> Result<Table, StoreError>;

    async fn read_all_users(&self) -> Result<Table, StoreError>;

    async fn add_expense(&self, expense: NewExpense) -> Result<Expense, StoreError> {
        let record = expense.into_record()?;
        self.append_expense(&record).await?;
        tracing::debug!(id = %record.id, user_email = %record.user_email, "expense appended");
        Ok(record)
    }
}
