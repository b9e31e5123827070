use axum::{routing::post, Router};

use crate::state::AppState;

pub mod dto;
pub mod handlers;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/request-reset", post(handlers::request_reset))
        .route("/auth/reset-password", post(handlers::reset_password))
}
