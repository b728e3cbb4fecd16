use axum::{
    Router,
    routing::{get, post},
};

pub mod calculate;
pub mod results;
pub mod system;

/// Router for the job endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/results/all", get(results::list_all))
        .route("/results/current", get(results::list_current))
        .route("/calculate/results", post(calculate::submit))
}
