//! HTTP handlers for the DRS object routes. Lookups and signing are
//! delegated to `DrsService`.

use crate::{
    errors::AppError,
    models::drs::{AccessUrl, DrsObject},
    services::drs_service::{DrsError, DrsService},
};
use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};

/// Header naming the user on whose behalf a download is requested.
pub const USER_ID_HEADER: &str = "x-user-id";
const ANONYMOUS_USER: &str = "anonymous";

/// GET `<api_route>/objects/{object_id}` — object metadata, 404 when unknown.
pub async fn get_object(
    State(service): State<DrsService>,
    Path(object_id): Path<String>,
) -> Result<Json<DrsObject>, AppError> {
    tracing::debug!(object_id = %object_id, "object metadata requested");
    let object = service.get_drs_object(&object_id).await?;
    Ok(Json(object))
}

/// GET `<api_route>/objects/{object_id}/access/{access_id}` — signed URL.
///
/// Unknown objects are a client error here (400), not 404.
pub async fn get_access_url(
    State(service): State<DrsService>,
    Path((object_id, access_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<AccessUrl>, AppError> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or(ANONYMOUS_USER);

    tracing::debug!(
        object_id = %object_id,
        access_id = %access_id,
        user_id = %user_id,
        "access URL requested"
    );

    let access = service
        .get_access_url(&object_id, &access_id, user_id)
        .await
        .map_err(|err| match err {
            DrsError::ObjectNotFound(_) => {
                AppError::bad_request("The requested 'DrsObject' wasn't found")
            }
            other => other.into(),
        })?;

    Ok(Json(access))
}
