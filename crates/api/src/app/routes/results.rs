use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::errors;
use crate::app::services::AppServices;

/// `GET /results/all`: every durable row, ordered by index.
pub async fn list_all(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.ingress().list_all().await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => errors::ingress_error_to_response(e, "Error fetching results"),
    }
}

/// `GET /results/current`: the cache view (index -> value or placeholder).
pub async fn list_current(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.ingress().list_current().await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => errors::ingress_error_to_response(e, "Error fetching current results"),
    }
}
