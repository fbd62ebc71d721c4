use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use async_trait::async_trait;

use super::{ExpenseStore, Record, StoreError, Table};
use crate::db::{Expense, User, EXPENSE_COLUMNS, USER_COLUMNS};

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    expenses: Mutex<Vec<Record>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    /// Makes every call fail with [`StoreError::Unavailable`] until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    #[cfg(test)]
    /// Appends a raw row, bypassing validation. Lets tests shape odd tables.
    pub fn push_raw_expense(&self, row: Record) {
        self.expenses.lock().unwrap_or_else(|p| p.into_inner()).push(row);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(Box::new(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "memory store offline",
            ))));
        }
        Ok(())
    }
}

#[async_trait]
impl ExpenseStore for MemoryStore {
    async fn add_user(&self, email: &str, password: &str) -> Result<bool, StoreError> {
        self.check_online()?;
        let mut users = self.users.lock().unwrap_or_else(|p| p.into_inner());
        if users.iter().any(|u| u.email == email) {
            return Ok(false);
        }
        users.push(User {
            email: email.to_string(),
            password: password.to_string(),
        });
        Ok(true)
    }

    async fn validate_user(&self, email: &str, password: &str) -> Result<bool, StoreError> {
        self.check_online()?;
        let users = self.users.lock().unwrap_or_else(|p| p.into_inner());
        Ok(users
            .iter()
            .any(|u| u.email == email && u.password == password))
    }

    async fn append_expense(&self, expense: &Expense) -> Result<(), StoreError> {
        self.check_online()?;
        let row = match serde_json::to_value(expense) {
            Ok(serde_json::Value::Object(map)) => map,
            Ok(other) => {
                return Err(StoreError::Unavailable(
                    format!("expense encoded as non-object: {}", other).into(),
                ))
            }
            Err(e) => return Err(StoreError::Unavailable(Box::new(e))),
        };
        self.expenses
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(row);
        Ok(())
    }

    async fn read_all_expenses(&self) -> Result<Table, StoreError> {
        self.check_online()?;
        let rows = self
            .expenses
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone();
        Ok(Table::from_records("Expenses", &EXPENSE_COLUMNS, rows))
    }

    async fn read_all_users(&self) -> Result<Table, StoreError> {
        self.check_online()?;
        let rows = self
            .users
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .filter_map(|u| match serde_json::to_value(u) {
                Ok(serde_json::Value::Object(map)) => Some(map),
                _ => None,
            })
            .collect();
        Ok(Table::from_records("Users", &USER_COLUMNS, rows))
    }
}
