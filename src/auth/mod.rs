use axum::{
    routing::get,
    Router,
};

use crate::state::AppState;

pub mod forms;
pub mod handlers;
pub mod password;
pub mod sessions;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", get(handlers::register_page).post(handlers::register))
        .route("/login", get(handlers::login_page).post(handlers::login))
        .route("/logout", get(handlers::logout))
}
