use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::Value as JsonValue;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// `POST /calculate/results`: accept a job. Completion is not guaranteed.
///
/// A body that is not a JSON object (malformed, wrong content type, array,
/// scalar) carries no index and is answered like a non-numeric one.
pub async fn submit(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<JsonValue>, JsonRejection>,
) -> axum::response::Response {
    let request = match body {
        Ok(Json(value)) => dto::CalculateRequest::from_body(value),
        Err(rejection) => {
            tracing::warn!(error = %rejection, "unreadable submission body");
            None
        }
    };

    let Some(request) = request else {
        return errors::json_error(StatusCode::BAD_REQUEST, "Invalid number");
    };

    match services.ingress().submit(&request.index).await {
        Ok(_) => (StatusCode::OK, Json(dto::WorkingResponse { working: true })).into_response(),
        Err(e) => errors::ingress_error_to_response(e, "Error submitting job"),
    }
}
