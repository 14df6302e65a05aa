use axum::{extract::DefaultBodyLimit, routing::get, Router};

use crate::state::AppState;

pub mod forms;
pub mod handlers;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/account", get(handlers::show).post(handlers::update))
        .layer(DefaultBodyLimit::max(5 * 1024 * 1024))
}
