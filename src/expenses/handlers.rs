use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::session::SessionUser,
    db::{Category, Expense},
    error::{store_error, ApiError},
    state::AppState,
    storage::{Record, StoreError},
};

use super::dto::{ExpenseDraft, HistoryResponse, MonthlyResponse};
use super::services::{draft_to_new_expense, monthly_totals, user_history, DraftError};

pub fn expense_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/expenses", get(list_history).post(create_expense))
        .route("/expenses/monthly", get(monthly_summary))
}

#[instrument(skip(state))]
pub async fn list_categories(State(state): State<AppState>) -> Json<Vec<Category>> {
    Json(state.config.tracker.categories.to_vec())
}

#[instrument(skip_all, fields(email = %session.email))]
pub async fn create_expense(
    State(state): State<AppState>,
    session: SessionUser,
    Json(draft): Json<ExpenseDraft>,
) -> Result<(StatusCode, Json<Expense>), ApiError> {
    let new = draft_to_new_expense(&session.email, draft).map_err(|e| {
        warn!(error = %e, "expense draft rejected");
        let status = match e {
            DraftError::AmountRequired => StatusCode::UNPROCESSABLE_ENTITY,
            DraftError::InvalidDate(_) => StatusCode::BAD_REQUEST,
        };
        (status, e.to_string())
    })?;

    let expense = state.store.add_expense(new).await.map_err(store_error)?;
    info!(id = %expense.id, amount = expense.amount, category = %expense.category, "expense saved");
    Ok((StatusCode::CREATED, Json(expense)))
}

/// Rows for the session user, or an empty view plus a warning when the table
/// does not have the expected layout.
async fn session_rows(
    state: &AppState,
    session: &SessionUser,
) -> Result<(Vec<Record>, Option<String>), ApiError> {
    let table = state.store.read_all_expenses().await.map_err(store_error)?;
    match user_history(table, &session.email) {
        Ok(rows) => Ok((rows, None)),
        Err(e @ StoreError::MissingColumn { .. }) => {
            warn!(error = %e, "expenses table layout unexpected");
            Ok((Vec::new(), Some(e.to_string())))
        }
        Err(e) => Err(store_error(e)),
    }
}

#[instrument(skip_all, fields(email = %session.email))]
pub async fn list_history(
    State(state): State<AppState>,
    session: SessionUser,
) -> Result<Json<HistoryResponse>, ApiError> {
    let (expenses, warning) = session_rows(&state, &session).await?;
    Ok(Json(HistoryResponse { expenses, warning }))
}

#[instrument(skip_all, fields(email = %session.email))]
pub async fn monthly_summary(
    State(state): State<AppState>,
    session: SessionUser,
) -> Result<Json<MonthlyResponse>, ApiError> {
    let (rows, warning) = session_rows(&state, &session).await?;
    Ok(Json(MonthlyResponse {
        months: monthly_totals(&rows),
        warning,
    }))
}
