use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use laundry_core::BookingId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_bookings))
        .route("/add", post(add_booking))
        .route("/accept/:id", post(accept_booking))
        .route("/decline/:id", post(decline_booking))
}

fn parse_booking_id(id: &str) -> Result<BookingId, axum::response::Response> {
    id.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid booking id"))
}

pub async fn add_booking(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::AddBookingRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::body_rejection_to_response(rejection),
    };

    let receipt = match services.submit_booking(body.into_new_booking()).await {
        Ok(r) => r,
        Err(e) => return errors::service_error_to_response(e),
    };

    (
        StatusCode::CREATED,
        Json(json!({
            "message": "Booking added successfully",
            "bookingId": receipt.booking_id,
            "customerId": receipt.customer_id,
            "unresolvedServices": receipt.unresolved,
        })),
    )
        .into_response()
}

pub async fn accept_booking(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let booking_id = match parse_booking_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let created = match services.accept_booking(booking_id).await {
        Ok(c) => c,
        Err(e) => return errors::service_error_to_response(e),
    };

    (
        StatusCode::CREATED,
        Json(json!({
            "message": "Booking accepted and converted to order",
            "orderId": created.order_id,
            "orderCode": created.order_code,
            "total_amount": created.total_amount,
        })),
    )
        .into_response()
}

pub async fn decline_booking(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let booking_id = match parse_booking_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    if let Err(e) = services.decline_booking(booking_id).await {
        return errors::service_error_to_response(e);
    }

    (StatusCode::OK, Json(json!({"message": "Booking declined"}))).into_response()
}

pub async fn list_bookings(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::BookingListParams>,
) -> axum::response::Response {
    let query = match params.into_query() {
        Ok(q) => q,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.list_bookings(query).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
