use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use tracing::{info, instrument, warn};

use crate::{
    auth::session::SessionUser,
    error::ApiError,
    expenses::services::{normalize_date, today},
    state::AppState,
};

use super::dto::ReceiptDraft;
use super::ocr::is_supported_image;

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
const UNKNOWN_VENDOR: &str = "Unknown Vendor";

pub fn scan_routes() -> Router<AppState> {
    Router::new()
        .route("/receipts/scan", post(scan_receipt))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// POST /receipts/scan (multipart, field `file`)
///
/// Runs OCR and the field parser and returns an editable draft. Nothing is saved.
#[instrument(skip_all, fields(email = %session.email))]
pub async fn scan_receipt(
    State(state): State<AppState>,
    session: SessionUser,
    mut mp: Multipart,
) -> Result<Json<ReceiptDraft>, ApiError> {
    let mut image: Option<Bytes> = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        if !is_supported_image(&content_type) {
            warn!(%content_type, "unsupported receipt upload");
            return Err((
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Upload a png or jpg image".into(),
            ));
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        image = Some(data);
        break;
    }
    let Some(image) = image else {
        return Err((StatusCode::BAD_REQUEST, "file is required".into()));
    };

    let (raw_text, ocr_ok) = match state.ocr.image_to_text(image).await {
        Ok(text) => (text, true),
        Err(e) => {
            warn!(error = %e, "ocr failed; falling back to manual entry");
            (String::new(), false)
        }
    };

    let fields = state.parser.parse(&raw_text);
    info!(
        vendor = fields.vendor.is_some(),
        date = fields.date.is_some(),
        total = fields.total.is_some(),
        "receipt parsed"
    );

    Ok(Json(ReceiptDraft {
        vendor: fields
            .vendor
            .clone()
            .unwrap_or_else(|| UNKNOWN_VENDOR.to_string()),
        date: fields
            .date
            .as_deref()
            .and_then(normalize_date)
            .unwrap_or_else(today),
        total: fields.total,
        amount_required: fields.total.is_none(),
        raw_text,
        ocr_ok,
        parsed: fields,
    }))
}
