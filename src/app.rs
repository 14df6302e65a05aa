use std::net::SocketAddr;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_cookies::{CookieManagerLayer, Cookies};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::auth::sessions::OptionalUser;
use crate::flash::take_flash;
use crate::state::AppState;
use crate::{account, auth, pages};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .merge(auth::router())
        .merge(account::router())
        .nest_service("/static", ServeDir::new("static"))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CookieManagerLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

async fn home(State(state): State<AppState>, visitor: OptionalUser, cookies: Cookies) -> Response {
    let flash = take_flash(&cookies, &state.cookie_key);
    pages::home(visitor.0.as_ref(), flash.as_ref()).into_response()
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
