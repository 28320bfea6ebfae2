//! Defines routes for the DRS metadata server.
//!
//! ## Structure
//! - **Service endpoints** (mounted at root)
//!   - `GET /`        — greeting
//!   - `GET /health`  — liveness
//!   - `GET /readyz`  — readiness (database)
//!
//! - **DRS endpoints** (mounted under the configured API route)
//!   - `GET {api_route}/objects/{object_id}` — object metadata
//!   - `GET {api_route}/objects/{object_id}/access/{access_id}` — presigned URL

use crate::{
    handlers::{
        health_handlers::{health, index, readyz},
        object_handlers::{get_access_url, get_object},
    },
    services::drs_service::DrsService,
};
use axum::{Router, routing::get};

/// Build the router carrying `DrsService` as shared state.
///
/// `api_route` may be empty or `/` to mount the DRS endpoints at the root.
pub fn routes(api_route: &str) -> Router<DrsService> {
    let base = normalize_api_route(api_route);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        .route(&format!("{}/objects/{{object_id}}", base), get(get_object))
        .route(
            &format!("{}/objects/{{object_id}}/access/{{access_id}}", base),
            get(get_access_url),
        )
}

fn normalize_api_route(api_route: &str) -> String {
    let trimmed = api_route.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
