use axum::{Json, Router, routing::get};
use utoipa::OpenApi;

use crate::{services::documentation::ApiDoc, state::SharedState};

/// Serve the generated OpenAPI document.
pub fn router() -> Router<SharedState> {
    Router::new().route("/api-doc/openapi.json", get(openapi))
}

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
