//! Route table, handlers and middleware for the reminder API.
//!
//! Every response, including errors and preflights, carries permissive CORS
//! headers. Error bodies are always `{error, status_code}`.

use crate::core::{iso_now, ReminderError};
use crate::features::reminders::ReminderService;
use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::info;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

type AppState = Arc<ReminderService>;

/// `GET /health` body
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: String,
}

pub fn router(service: AppState) -> Router {
    Router::new()
        .route(
            "/api/reminders",
            post(create_reminder).options(preflight).fallback(fallback),
        )
        .route("/status", get(status).options(preflight).fallback(fallback))
        .route("/health", get(health).options(preflight).fallback(fallback))
        .fallback(fallback)
        .layer(middleware::map_response(with_cors_headers))
        .layer(middleware::from_fn(log_request))
        .with_state(service)
}

impl IntoResponse for ReminderError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_body())).into_response()
    }
}

async fn create_reminder(State(service): State<AppState>, body: Bytes) -> Response {
    let request = match ReminderService::decode_request(&body) {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };

    match service.process_reminder_request(request).await {
        Ok(accepted) => Json(accepted).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn status(State(service): State<AppState>) -> Response {
    Json(service.get_status()).into_response()
}

async fn health() -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok",
        message: "Server is running",
        timestamp: iso_now(),
    })
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Unknown paths and unsupported methods; OPTIONS always succeeds
async fn fallback(method: Method, uri: Uri) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    let message = if method == Method::GET {
        format!("Page not found: {}", uri.path())
    } else {
        format!("Endpoint not found: {}", uri.path())
    };
    ReminderError::NotFound(message).into_response()
}

async fn with_cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;
    info!(
        "{} {} -> {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}
