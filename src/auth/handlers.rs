use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_cookies::Cookies;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        forms::{normalize_email, FieldErrors, LoginForm, RegisterForm},
        password::{hash_password, verify_password},
        sessions::{end_session, start_session, OptionalUser},
    },
    flash::{set_flash, take_flash, Flash},
    pages,
    state::AppState,
    users::User,
};

const LOGIN_FAILED: &str = "Login failed! Please check your email and password.";

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Post-login targets must stay on this site; anything that is not a
/// plain local path falls back to home. Backslashes are rejected too,
/// since browsers normalize them to forward slashes in redirects.
fn sanitize_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[instrument(skip(state, cookies, visitor))]
pub async fn register_page(
    State(state): State<AppState>,
    visitor: OptionalUser,
    cookies: Cookies,
) -> Response {
    if visitor.0.is_some() {
        return Redirect::to("/").into_response();
    }
    let flash = take_flash(&cookies, &state.cookie_key);
    pages::register(&empty_register(), &FieldErrors::default(), flash.as_ref()).into_response()
}

#[instrument(skip(state, cookies, visitor, form))]
pub async fn register(
    State(state): State<AppState>,
    visitor: OptionalUser,
    cookies: Cookies,
    Form(mut form): Form<RegisterForm>,
) -> Result<Response, (StatusCode, String)> {
    if visitor.0.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    form.email = normalize_email(&form.email);
    form.username = form.username.trim().to_string();

    let mut errors = form.validate();
    if errors.is_empty() {
        if User::find_by_username(&state.db, &form.username)
            .await
            .map_err(internal)?
            .is_some()
        {
            warn!(username = %form.username, "username already taken");
            errors.add("username", "That username is taken.");
        }
        if User::find_by_email(&state.db, &form.email)
            .await
            .map_err(internal)?
            .is_some()
        {
            warn!(email = %form.email, "email already registered");
            errors.add("email", "That email is already registered.");
        }
    }

    if !errors.is_empty() {
        return Ok(pages::register(&form, &errors, None).into_response());
    }

    let hash = hash_password(&form.password).map_err(internal)?;
    let user = User::create(&state.db, &form.username, &form.email, &hash)
        .await
        .map_err(internal)?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    set_flash(
        &cookies,
        &state.cookie_key,
        &Flash::success("Your account has been created, you may now log in!"),
    );
    Ok(Redirect::to("/login").into_response())
}

#[instrument(skip(state, cookies, visitor))]
pub async fn login_page(
    State(state): State<AppState>,
    visitor: OptionalUser,
    cookies: Cookies,
    Query(query): Query<NextQuery>,
) -> Response {
    if visitor.0.is_some() {
        return Redirect::to("/").into_response();
    }
    let flash = take_flash(&cookies, &state.cookie_key);
    pages::login(
        &empty_login(),
        sanitize_next(query.next.as_deref()),
        None,
        flash.as_ref(),
    )
    .into_response()
}

#[instrument(skip(state, cookies, visitor, form))]
pub async fn login(
    State(state): State<AppState>,
    visitor: OptionalUser,
    cookies: Cookies,
    Query(query): Query<NextQuery>,
    Form(mut form): Form<LoginForm>,
) -> Result<Response, (StatusCode, String)> {
    if visitor.0.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    form.email = normalize_email(&form.email);
    let next = sanitize_next(query.next.as_deref());

    let user = User::find_by_email(&state.db, &form.email)
        .await
        .map_err(internal)?;

    // One generic notice for both unknown email and wrong password.
    let user = match user {
        Some(user) => {
            let ok = verify_password(&form.password, &user.password_hash).map_err(internal)?;
            if !ok {
                warn!(user_id = %user.id, "login with wrong password");
                return Ok(pages::login(&form, next, Some(LOGIN_FAILED), None).into_response());
            }
            user
        }
        None => {
            warn!(email = %form.email, "login with unknown email");
            return Ok(pages::login(&form, next, Some(LOGIN_FAILED), None).into_response());
        }
    };

    start_session(&state, &cookies, user.id, form.remember())
        .await
        .map_err(internal)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Redirect::to(next.unwrap_or("/")).into_response())
}

#[instrument(skip(state, cookies))]
pub async fn logout(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Response, (StatusCode, String)> {
    end_session(&state, &cookies).await.map_err(internal)?;
    Ok(Redirect::to("/").into_response())
}

fn empty_register() -> RegisterForm {
    RegisterForm {
        username: String::new(),
        email: String::new(),
        password: String::new(),
        confirm_password: String::new(),
    }
}

fn empty_login() -> LoginForm {
    LoginForm {
        email: String::new(),
        password: String::new(),
        remember: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_targets_must_be_local_paths() {
        assert_eq!(sanitize_next(Some("/account")), Some("/account"));
        assert_eq!(sanitize_next(Some("https://evil.example")), None);
        assert_eq!(sanitize_next(Some("//evil.example")), None);
        assert_eq!(sanitize_next(Some("/\\evil.example")), None);
        assert_eq!(sanitize_next(Some("\\\\evil.example")), None);
        assert_eq!(sanitize_next(None), None);
    }
}
