mod account;
mod app;
mod auth;
mod avatars;
mod config;
mod flash;
mod pages;
mod state;
mod storage;
mod users;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "folio=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = AppState::init().await?;

    if let Err(e) = sqlx::migrate!("./migrations").run(&app_state.db).await {
        tracing::warn!(error = %e, "migrations folder not found or migration failed; continuing");
    }

    match auth::sessions::Session::purge_expired(&app_state.db).await {
        Ok(purged) if purged > 0 => tracing::info!(purged, "removed expired sessions"),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "expired session sweep failed; continuing"),
    }

    let app = app::build_app(app_state);
    app::serve(app).await
}
