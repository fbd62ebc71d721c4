use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::storage::StoreError;

/// Column layout of the Users table.
pub const USER_COLUMNS: [&str; 2] = ["email", "password"];

/// Column layout of the Expenses table.
pub const EXPENSE_COLUMNS: [&str; 10] = [
    "id",
    "user_email",
    "amount",
    "category",
    "vendor",
    "date",
    "notes",
    "image_url",
    "raw_text",
    "created_at",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    Groceries,
    Transport,
    Meals,
    Other,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Groceries,
        Category::Transport,
        Category::Meals,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Groceries => "Groceries",
            Category::Transport => "Transport",
            Category::Meals => "Meals",
            Category::Other => "Other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expense as submitted, before the store assigns identity.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub user_email: String,
    pub amount: f64,
    pub category: Category,
    pub vendor: String,
    /// ISO `YYYY-MM-DD`.
    pub date: String,
    pub notes: String,
    pub image_url: String,
    pub raw_text: String,
}

impl NewExpense {
    pub fn new(
        user_email: impl Into<String>,
        amount: f64,
        category: Category,
        vendor: impl Into<String>,
        date: impl Into<String>,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            user_email: user_email.into(),
            amount,
            category,
            vendor: vendor.into(),
            date: date.into(),
            notes: notes.into(),
            image_url: String::new(),
            raw_text: String::new(),
        }
    }

    pub fn with_raw_text(mut self, raw_text: impl Into<String>) -> Self {
        self.raw_text = raw_text.into();
        self
    }

    /// Validates the amount and stamps a fresh id and creation time.
    pub fn into_record(self) -> Result<Expense, StoreError> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(StoreError::InvalidAmount(self.amount));
        }
        Ok(Expense {
            id: Uuid::new_v4(),
            user_email: self.user_email,
            amount: self.amount,
            category: self.category,
            vendor: self.vendor,
            date: self.date,
            notes: self.notes,
            image_url: self.image_url,
            raw_text: self.raw_text,
            created_at: OffsetDateTime::now_utc(),
        })
    }
}

/// Expense row as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub user_email: String,
    pub amount: f64,
    pub category: Category,
    pub vendor: String,
    pub date: String,
    pub notes: String,
    pub image_url: String,
    pub raw_text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
