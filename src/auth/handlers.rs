use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{Credentials, MeResponse, SignInResponse, SignUpResponse},
        services::normalize_credentials,
        session::{SessionKeys, SessionUser},
    },
    error::{store_error, ApiError},
    state::AppState,
};

const BLANK_CREDENTIALS: &str = "Enter email and password!";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<Credentials>,
) -> Result<(StatusCode, Json<SignUpResponse>), ApiError> {
    let Some((email, password)) = normalize_credentials(payload) else {
        warn!("sign-up with blank credentials");
        return Err((StatusCode::BAD_REQUEST, BLANK_CREDENTIALS.into()));
    };

    let created = state
        .store
        .add_user(&email, &password)
        .await
        .map_err(store_error)?;

    if !created {
        warn!(%email, "email already registered");
        return Err((StatusCode::CONFLICT, "User already exists!".into()));
    }

    info!(%email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            email,
            message: "Account created! Please sign in.".into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<Credentials>,
) -> Result<Json<SignInResponse>, ApiError> {
    let Some((email, password)) = normalize_credentials(payload) else {
        warn!("sign-in with blank credentials");
        return Err((StatusCode::BAD_REQUEST, BLANK_CREDENTIALS.into()));
    };

    let valid = state
        .store
        .validate_user(&email, &password)
        .await
        .map_err(store_error)?;

    if !valid {
        warn!(%email, "sign-in rejected");
        return Err((
            StatusCode::UNAUTHORIZED,
            "Invalid email or password!".into(),
        ));
    }

    let keys = SessionKeys::from_ref(&state);
    let token = keys.sign(&email).map_err(|e| {
        error!(error = %e, "session sign failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Could not start session".to_string())
    })?;

    info!(%email, "user signed in");
    Ok(Json(SignInResponse { token, email }))
}

#[instrument]
pub async fn get_me(session: SessionUser) -> Json<MeResponse> {
    Json(MeResponse {
        email: session.email,
    })
}
