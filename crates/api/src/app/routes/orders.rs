use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post, put},
    Json, Router,
};
use serde_json::json;

use laundry_core::OrderId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_orders))
        .route("/create", post(create_walk_in_order))
        .route("/:id", get(get_order))
        .route("/:id/status", patch(update_order_status))
        .route("/:id/payment", patch(update_order_payment))
        .route("/:id/edit", put(edit_order))
}

fn parse_order_id(id: &str) -> Result<OrderId, axum::response::Response> {
    id.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"))
}

pub async fn create_walk_in_order(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateWalkInRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::body_rejection_to_response(rejection),
    };
    let walk_in = match body.into_walk_in() {
        Ok(w) => w,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let created = match services.create_walk_in(walk_in).await {
        Ok(c) => c,
        Err(e) => return errors::service_error_to_response(e),
    };

    (
        StatusCode::CREATED,
        Json(json!({
            "message": "Walk-in order created",
            "orderId": created.order_id,
            "orderCode": created.order_code,
            "total_amount": created.total_amount,
        })),
    )
        .into_response()
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::OrderListParams>,
) -> axum::response::Response {
    let query = match params.into_query() {
        Ok(q) => q,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.list_orders(query).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.get_order(order_id).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_order_status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateStatusRequest>, JsonRejection>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::body_rejection_to_response(rejection),
    };
    let status = match body.status() {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let change = match services.update_status(order_id, status).await {
        Ok(c) => c,
        Err(e) => return errors::service_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(json!({
            "message": format!("Order status updated to {}", change.to),
            "status": change.to,
            "payment_status": change.payment_status,
            "inventoryAdjusted": change.adjustments.len(),
        })),
    )
        .into_response()
}

pub async fn update_order_payment(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdatePaymentRequest>, JsonRejection>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::body_rejection_to_response(rejection),
    };
    let requested = match body.payment_status() {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let outcome = match services.update_payment(order_id, requested, body.paid_amount).await {
        Ok(o) => o,
        Err(e) => return errors::service_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(json!({
            "message": "Payment updated",
            "payment_status": outcome.payment_status,
            "paid_amount": outcome.paid_amount,
        })),
    )
        .into_response()
}

pub async fn edit_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::EditOrderRequest>, JsonRejection>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::body_rejection_to_response(rejection),
    };
    let lines = match body.into_lines() {
        Ok(l) => l,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let outcome = match services.edit_order(order_id, lines).await {
        Ok(o) => o,
        Err(e) => return errors::service_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(json!({
            "message": "Order updated",
            "total_amount": outcome.total_amount,
            "payment_status": outcome.payment_status,
        })),
    )
        .into_response()
}
