use axum::Router;

pub mod bookings;
pub mod orders;
pub mod services;
pub mod system;

/// Router for the shop endpoints (everything except `/health`).
pub fn router() -> Router {
    Router::new()
        .nest("/bookings", bookings::router())
        .nest("/orders", orders::router())
        .nest("/services", services::router())
}
