use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use fibdispatch_core::DomainError;
use fibdispatch_core::error::InvalidInput;
use fibdispatch_infra::IngressError;

/// Map an ingress failure to its HTTP response, logging it server-side.
///
/// `context` names the failed operation in 500 bodies
/// (e.g. "Error fetching results").
pub fn ingress_error_to_response(err: IngressError, context: &'static str) -> axum::response::Response {
    match err {
        IngressError::Invalid(DomainError::InvalidInput(reason)) => {
            tracing::warn!(%reason, "rejected submission");
            let message = match reason {
                InvalidInput::NonNumeric => "Invalid number",
                InvalidInput::Negative => "Number must be non-negative",
            };
            json_error(StatusCode::BAD_REQUEST, message)
        }
        IngressError::Invalid(e @ DomainError::OutOfRange { .. }) => {
            tracing::warn!(error = %e, "rejected submission");
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "Number too high")
        }
        IngressError::NotReady(not_ready) => {
            tracing::warn!(connection = not_ready.connection, "request before connection ready");
            json_error(StatusCode::SERVICE_UNAVAILABLE, not_ready.to_string())
        }
        IngressError::Store(e) => {
            tracing::error!(error = %e, "{context}");
            json_error_with_details(StatusCode::INTERNAL_SERVER_ERROR, context, e.to_string())
        }
        IngressError::Publish(e) => {
            tracing::error!(error = %e, "{context}");
            json_error_with_details(StatusCode::INTERNAL_SERVER_ERROR, context, e.to_string())
        }
    }
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (status, axum::Json(json!({ "error": message.into() }))).into_response()
}

pub fn json_error_with_details(
    status: StatusCode,
    message: impl Into<String>,
    details: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": message.into(),
            "details": details.into(),
        })),
    )
        .into_response()
}
