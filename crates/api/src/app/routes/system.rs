use axum::http::StatusCode;

/// Liveness only; readiness is reported per endpoint via 503.
pub async fn health() -> StatusCode {
    StatusCode::OK
}
