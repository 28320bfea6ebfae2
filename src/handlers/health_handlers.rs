//! Index, health & readiness handlers.
//!
//! - GET /        -> greeting
//! - GET /health  -> liveness, never touches the database
//! - GET /readyz  -> readiness that checks DB connectivity

use crate::services::drs_service::DrsService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;

/// `GET /`
pub async fn index() -> impl IntoResponse {
    Json(IndexResponse {
        content: "Hello World!".into(),
    })
}

/// `GET /health`
///
/// Always 200 with `{"status": "OK"}`; cheap and free of I/O.
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "OK".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Runs `SELECT 1` against SQLite. HTTP 200 when it succeeds,
/// HTTP 503 otherwise.
pub async fn readyz(State(service): State<DrsService>) -> impl IntoResponse {
    let sqlite_check = match service.ping().await {
        Ok(()) => CheckStatus {
            ok: true,
            error: None,
        },
        Err(e) => CheckStatus {
            ok: false,
            error: Some(format!("error: {}", e)),
        },
    };
    let overall_ok = sqlite_check.ok;

    let mut checks = HashMap::new();
    checks.insert("sqlite", sqlite_check);

    let body = ReadyResponse {
        status: if overall_ok {
            "OK".into()
        } else {
            "ERROR".into()
        },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct IndexResponse {
    content: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
