use axum::{routing::post, Router};

use crate::state::AppState;

pub mod dto;
pub mod handlers;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/request-otp", post(handlers::request_otp))
        .route("/auth/verify-otp", post(handlers::verify_otp))
}
