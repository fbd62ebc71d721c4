mod dto;
pub mod handlers;
pub mod ocr;
pub mod parse;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::scan_routes()
}
