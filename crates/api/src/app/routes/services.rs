use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/active", get(list_active_services))
}

pub async fn list_active_services(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.active_services().await {
        Ok(active) => Json(active).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
