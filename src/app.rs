use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, expenses, receipts};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(auth::router())
                .merge(expenses::router())
                .merge(receipts::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::storage::{ExpenseStore, MemoryStore};

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, body)
    }

    fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut req = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", t));
        }
        req.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str, token: &str) -> Request<Body> {
        Request::get(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    fn upload(token: &str, content_type: &str) -> Request<Body> {
        let boundary = "XBOUNDARYX";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"bill.png\"\r\nContent-Type: {ct}\r\n\r\n",
                b = boundary,
                ct = content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"\x89PNG\r\n\x1a\nfake");
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
        Request::post("/api/v1/receipts/scan")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn sign_up_and_in(app: &Router, email: &str, password: &str) -> String {
        let creds = json!({"email": email, "password": password});
        let (status, _) = call(app, post_json("/api/v1/auth/signup", None, creds.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = call(app, post_json("/api/v1/auth/signin", None, creds)).await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn sign_up_sign_in_add_and_view() {
        let app = build_app(AppState::fake());
        let token = sign_up_and_in(&app, "a@x.com", "pw").await;

        let (status, me) = call(&app, get("/api/v1/me", &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "a@x.com");

        let (status, saved) = call(
            &app,
            post_json(
                "/api/v1/expenses",
                Some(token.as_str()),
                json!({"amount": 50, "category": "Meals", "vendor": "Cafe", "date": "2024-01-10"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(saved["amount"], 50.0);
        assert_eq!(saved["image_url"], "");

        let (status, history) = call(&app, get("/api/v1/expenses", &token)).await;
        assert_eq!(status, StatusCode::OK);
        let rows = history["expenses"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["amount"], 50.0);
        assert_eq!(rows[0]["user_email"], "a@x.com");
        assert!(history.get("warning").is_none());

        let (status, monthly) = call(&app, get("/api/v1/expenses/monthly", &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(monthly["months"], json!([{"month": "2024-01", "total": 50.0}]));
    }

    #[tokio::test]
    async fn other_users_rows_stay_hidden() {
        let app = build_app(AppState::fake());
        let alice = sign_up_and_in(&app, "a@x.com", "pw").await;
        let bob = sign_up_and_in(&app, "b@x.com", "pw").await;

        for (token, amount) in [(&alice, 10), (&bob, 99), (&bob, 1)] {
            let (status, _) = call(
                &app,
                post_json(
                    "/api/v1/expenses",
                    Some(token.as_str()),
                    json!({"amount": amount, "category": "Other", "date": "2024-02-02"}),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, history) = call(&app, get("/api/v1/expenses", &alice)).await;
        let rows = history["expenses"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["amount"], 10.0);

        let (_, monthly) = call(&app, get("/api/v1/expenses/monthly", &alice)).await;
        assert_eq!(monthly["months"], json!([{"month": "2024-02", "total": 10.0}]));
    }

    #[tokio::test]
    async fn auth_rejections() {
        let app = build_app(AppState::fake());
        let (status, _) = call(
            &app,
            post_json("/api/v1/auth/signup", None, json!({"email": "  ", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        sign_up_and_in(&app, "a@x.com", "pw").await;

        let (status, body) = call(
            &app,
            post_json("/api/v1/auth/signup", None, json!({"email": "a@x.com", "password": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body, "User already exists!");

        let (status, body) = call(
            &app,
            post_json("/api/v1/auth/signin", None, json!({"email": "a@x.com", "password": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, "Invalid email or password!");

        let (status, _) = call(
            &app,
            post_json("/api/v1/auth/signin", None, json!({"email": "a@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let res = app
            .clone()
            .oneshot(Request::get("/api/v1/expenses").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn save_without_amount_is_refused() {
        let store = Arc::new(MemoryStore::new());
        let app = build_app(AppState::fake_with(store.clone(), None));
        let token = sign_up_and_in(&app, "a@x.com", "pw").await;

        let (status, body) = call(
            &app,
            post_json(
                "/api/v1/expenses",
                Some(token.as_str()),
                json!({"category": "Groceries", "raw_text": "blurry"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body, "Could not detect amount. Enter manually.");

        let (status, _) = call(
            &app,
            post_json(
                "/api/v1/expenses",
                Some(token.as_str()),
                json!({"amount": -3, "category": "Groceries"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(store.read_all_expenses().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn receipt_scan_prefills_draft() {
        let store = Arc::new(MemoryStore::new());
        let text = "BIG BAZAAR\nDate 15/08/2024\nRice Rs 100\nTotal Rs 250\n";
        let app = build_app(AppState::fake_with(store, Some(text)));
        let token = sign_up_and_in(&app, "a@x.com", "pw").await;

        let (status, draft) = call(&app, upload(&token, "image/png")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(draft["vendor"], "BIG BAZAAR");
        assert_eq!(draft["date"], "2024-08-15");
        assert_eq!(draft["total"], 250.0);
        assert_eq!(draft["amount_required"], false);
        assert_eq!(draft["ocr_ok"], true);
        assert_eq!(draft["parsed"]["date"], "15/08/2024");

        let (status, saved) = call(
            &app,
            post_json(
                "/api/v1/expenses",
                Some(token.as_str()),
                json!({
                    "amount": draft["total"],
                    "category": "Groceries",
                    "vendor": draft["vendor"],
                    "date": draft["parsed"]["date"],
                    "raw_text": draft["raw_text"],
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(saved["date"], "2024-08-15");
        assert_eq!(saved["raw_text"], text);
    }

    #[tokio::test]
    async fn failed_ocr_asks_for_manual_amount() {
        let app = build_app(AppState::fake_with(Arc::new(MemoryStore::new()), None));
        let token = sign_up_and_in(&app, "a@x.com", "pw").await;

        let (status, draft) = call(&app, upload(&token, "image/jpeg")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(draft["ocr_ok"], false);
        assert_eq!(draft["amount_required"], true);
        assert_eq!(draft["vendor"], "Unknown Vendor");
        assert_eq!(draft["total"], Value::Null);
    }

    #[tokio::test]
    async fn scan_rejects_unsupported_uploads() {
        let app = build_app(AppState::fake());
        let token = sign_up_and_in(&app, "a@x.com", "pw").await;
        let (status, _) = call(&app, upload(&token, "application/pdf")).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn missing_user_column_degrades_to_empty_view() {
        let store = Arc::new(MemoryStore::new());
        let app = build_app(AppState::fake_with(store.clone(), None));
        let token = sign_up_and_in(&app, "a@x.com", "pw").await;
        store.push_raw_expense(
            json!({"email": "a@x.com", "amount": 5, "date": "2024-01-01"})
                .as_object()
                .cloned()
                .unwrap(),
        );

        let (status, history) = call(&app, get("/api/v1/expenses", &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history["expenses"], json!([]));
        assert!(history["warning"].as_str().unwrap().contains("user_email"));

        let (status, monthly) = call(&app, get("/api/v1/expenses/monthly", &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(monthly["months"], json!([]));
    }

    #[tokio::test]
    async fn storage_outage_surfaces_as_503() {
        let store = Arc::new(MemoryStore::new());
        let app = build_app(AppState::fake_with(store.clone(), None));
        let token = sign_up_and_in(&app, "a@x.com", "pw").await;

        store.set_offline(true);
        let (status, body) = call(&app, get("/api/v1/expenses", &token)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, "Storage backend unavailable, please retry");

        let (status, _) = call(
            &app,
            post_json("/api/v1/auth/signin", None, json!({"email": "a@x.com", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn categories_are_listed() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(Request::get("/api/v1/categories").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!(["Groceries", "Transport", "Meals", "Other"]));
    }
}
