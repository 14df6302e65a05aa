use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use sqlx::{FromRow, PgPool};
use time::{Duration, OffsetDateTime};
use tower_cookies::{Cookie, Cookies, Key};
use tracing::{error, info};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::state::AppState;
use crate::users::User;

/// Cookie holding the session ID, stored in the private (encrypted) jar.
pub const SESSION_COOKIE: &str = "folio_session";

#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

impl Session {
    pub async fn create(db: &PgPool, user_id: Uuid, ttl: Duration) -> anyhow::Result<Session> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (user_id, expires_at)
            VALUES ($1, $2)
            RETURNING id, user_id, expires_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(OffsetDateTime::now_utc() + ttl)
        .fetch_one(db)
        .await?;
        Ok(session)
    }

    /// Look up a session and reject it if past its expiry. Expired rows
    /// are deleted on the spot so the table does not accumulate them.
    pub async fn find_valid(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, expires_at, created_at
            FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;

        if let Some(ref session) = session {
            if session.is_expired_at(OffsetDateTime::now_utc()) {
                info!(session_id = %id, "session expired");
                Session::delete(db, id).await?;
                return Ok(None);
            }
        }
        Ok(session)
    }

    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at < now
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Sweep out every expired session. Run at startup; steady-state
    /// cleanup happens in `find_valid`.
    pub async fn purge_expired(db: &PgPool) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < now()")
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Session lifetime: short by default, long when "remember me" is ticked.
pub fn session_ttl(config: &AppConfig, remember: bool) -> Duration {
    if remember {
        Duration::days(config.session.remember_ttl_days)
    } else {
        Duration::hours(config.session.ttl_hours)
    }
}

fn session_cookie(session_id: Uuid, ttl: Duration) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, session_id.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(std::env::var("PROTO").ok() == Some("https".to_owned()));
    cookie.set_max_age(ttl);
    cookie
}

fn session_id_from_cookies(cookies: &Cookies, key: &Key) -> Option<Uuid> {
    cookies
        .private(key)
        .get(SESSION_COOKIE)
        .and_then(|cookie| cookie.value().parse::<Uuid>().ok())
}

/// Create a session row for the user and hand the ID to the browser.
pub async fn start_session(
    state: &AppState,
    cookies: &Cookies,
    user_id: Uuid,
    remember: bool,
) -> anyhow::Result<Session> {
    let ttl = session_ttl(&state.config, remember);
    let session = Session::create(&state.db, user_id, ttl).await?;

    cookies
        .private(&state.cookie_key)
        .add(session_cookie(session.id, ttl));

    info!(session_id = %session.id, user_id = %user_id, remember, "session started");
    Ok(session)
}

/// Drop the session row (if any) and clear the cookie. Safe to call with
/// no active session.
pub async fn end_session(state: &AppState, cookies: &Cookies) -> anyhow::Result<()> {
    if let Some(session_id) = session_id_from_cookies(cookies, &state.cookie_key) {
        Session::delete(&state.db, session_id).await?;
        info!(session_id = %session_id, "session ended");
    }

    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookies.private(&state.cookie_key).remove(cookie);
    Ok(())
}

async fn resolve_session(
    state: &AppState,
    cookies: &Cookies,
) -> anyhow::Result<Option<(User, Session)>> {
    let Some(session_id) = session_id_from_cookies(cookies, &state.cookie_key) else {
        return Ok(None);
    };

    let Some(session) = Session::find_valid(&state.db, session_id).await? else {
        return Ok(None);
    };

    match User::find_by_id(&state.db, session.user_id).await? {
        Some(user) => Ok(Some((user, session))),
        None => {
            error!(session_id = %session_id, user_id = %session.user_id, "session points at missing user");
            Ok(None)
        }
    }
}

/// Requires an authenticated user; anonymous requests are redirected to
/// the login page with the requested path remembered.
pub struct CurrentUser {
    pub user: User,
    #[allow(dead_code)]
    pub session: Session,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|e| e.into_response())?;

        match resolve_session(state, &cookies).await {
            Ok(Some((user, session))) => Ok(CurrentUser { user, session }),
            Ok(None) => {
                let next = urlencoding::encode(parts.uri.path()).into_owned();
                Err(Redirect::to(&format!("/login?next={next}")).into_response())
            }
            Err(e) => {
                error!(error = %e, "session lookup failed");
                Err(StatusCode::INTERNAL_SERVER_ERROR.into_response())
            }
        }
    }
}

/// Resolves the user when a valid session exists, `None` otherwise.
pub struct OptionalUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|e| e.into_response())?;

        match resolve_session(state, &cookies).await {
            Ok(found) => Ok(OptionalUser(found.map(|(user, _)| user))),
            Err(e) => {
                error!(error = %e, "session lookup failed");
                Err(StatusCode::INTERNAL_SERVER_ERROR.into_response())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, SessionConfig};

    fn config() -> AppConfig {
        AppConfig {
            database_url: "postgres://unused".into(),
            upload_dir: "unused".into(),
            session: SessionConfig {
                secret: None,
                ttl_hours: 12,
                remember_ttl_days: 30,
            },
        }
    }

    #[test]
    fn remember_extends_session_lifetime() {
        let config = config();
        assert_eq!(session_ttl(&config, false), Duration::hours(12));
        assert_eq!(session_ttl(&config, true), Duration::days(30));
        assert!(session_ttl(&config, true) > session_ttl(&config, false));
    }

    #[test]
    fn session_cookie_is_scoped_and_http_only() {
        let cookie = session_cookie(Uuid::new_v4(), Duration::hours(12));
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.max_age(), Some(Duration::hours(12)));
    }

    #[test]
    fn expiry_is_a_strict_cutoff() {
        let now = OffsetDateTime::now_utc();
        let session = Session {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            expires_at: now + Duration::hours(1),
            created_at: now,
        };
        assert!(!session.is_expired_at(now));
        assert!(session.is_expired_at(now + Duration::hours(2)));
    }

    #[test]
    fn session_cookie_value_is_the_session_id() {
        let id = Uuid::new_v4();
        let cookie = session_cookie(id, Duration::hours(1));
        assert_eq!(cookie.value().parse::<Uuid>().ok(), Some(id));
    }
}
