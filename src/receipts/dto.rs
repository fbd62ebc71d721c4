use serde::Serialize;

use super::parse::ReceiptFields;

/// Prefill for the save form after a receipt scan.
#[derive(Debug, Serialize)]
pub struct ReceiptDraft {
    pub vendor: String,
    /// ISO date; today when the receipt had no usable date.
    pub date: String,
    pub total: Option<f64>,
    /// No total was found; the user must type the amount before saving.
    pub amount_required: bool,
    pub raw_text: String,
    pub ocr_ok: bool,
    /// Parser output before defaults were applied.
    pub parsed: ReceiptFields,
}
