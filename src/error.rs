use axum::http::StatusCode;
use tracing::{error, warn};

use crate::storage::StoreError;

/// What handlers hand back on failure: a status and a message the user sees.
pub type ApiError = (StatusCode, String);

pub(crate) fn store_error(e: StoreError) -> ApiError {
    match e {
        StoreError::Unavailable(_) => {
            error!(error = %e, "storage backend unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Storage backend unavailable, please retry".into(),
            )
        }
        StoreError::InvalidAmount(_) => {
            warn!(error = %e, "rejected expense");
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        StoreError::MissingColumn { .. } => {
            error!(error = %e, "unexpected table layout");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
