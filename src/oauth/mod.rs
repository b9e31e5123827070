use axum::{routing::get, Router};

use crate::state::AppState;

pub mod handlers;
pub mod linker;
pub mod provider;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/oauth/start", get(handlers::start))
        .route("/auth/oauth/callback", get(handlers::callback))
}
