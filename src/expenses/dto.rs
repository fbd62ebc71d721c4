use serde::{Deserialize, Serialize};

use crate::db::Category;
use crate::storage::Record;

/// An expense as edited by the user, manual or prefilled from a receipt.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseDraft {
    /// Absent when OCR found no total and the user has not typed one.
    #[serde(default)]
    pub amount: Option<f64>,
    pub category: Category,
    #[serde(default)]
    pub vendor: Option<String>,
    /// ISO `YYYY-MM-DD` or `DD/MM/YYYY`; today when absent.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub raw_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub expenses: Vec<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotal {
    /// `YYYY-MM`
    pub month: String,
    pub total: f64,
}

#[derive(Debug, Serialize)]
pub struct MonthlyResponse {
    pub months: Vec<MonthlyTotal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}
