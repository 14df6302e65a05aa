use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tower_cookies::Cookies;
use tracing::{error, info, instrument, warn};

use crate::{
    account::forms::UpdateAccountForm,
    auth::{
        forms::normalize_email,
        sessions::CurrentUser,
    },
    avatars::{save_avatar, AvatarError},
    flash::{set_flash, take_flash, Flash},
    pages,
    state::AppState,
    users::User,
};

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[instrument(skip(state, cookies, auth))]
pub async fn show(
    State(state): State<AppState>,
    auth: CurrentUser,
    cookies: Cookies,
) -> Response {
    let flash = take_flash(&cookies, &state.cookie_key);
    // Pre-fill the form from the stored profile.
    let values = UpdateAccountForm {
        username: auth.user.username.clone(),
        email: auth.user.email.clone(),
        picture: None,
    };
    pages::account(&auth.user, &values, &Default::default(), flash.as_ref()).into_response()
}

#[instrument(skip(state, cookies, auth, mp))]
pub async fn update(
    State(state): State<AppState>,
    auth: CurrentUser,
    cookies: Cookies,
    mp: Multipart,
) -> Result<Response, (StatusCode, String)> {
    let user = &auth.user;
    let mut form = UpdateAccountForm::from_multipart(mp)
        .await
        .map_err(internal)?;
    form.username = form.username.trim().to_string();
    form.email = normalize_email(&form.email);

    let mut errors = form.validate();
    if errors.is_empty() {
        // Uniqueness checks exclude the user's own current values.
        if form.username != user.username
            && User::find_by_username(&state.db, &form.username)
                .await
                .map_err(internal)?
                .is_some()
        {
            warn!(username = %form.username, "username already taken");
            errors.add("username", "That username is taken.");
        }
        if form.email != user.email
            && User::find_by_email(&state.db, &form.email)
                .await
                .map_err(internal)?
                .is_some()
        {
            warn!(email = %form.email, "email already registered");
            errors.add("email", "That email is already registered.");
        }
    }

    if !errors.is_empty() {
        return Ok(pages::account(user, &form, &errors, None).into_response());
    }

    // Nothing is written until the whole form has validated. Without a new
    // upload the existing avatar stays in place.
    let avatar_file = match form.picture.take() {
        Some(upload) => match save_avatar(&state, upload).await {
            Ok(filename) => filename,
            Err(e @ (AvatarError::UnsupportedType | AvatarError::InvalidImage(_))) => {
                warn!(error = %e, "rejected avatar upload");
                errors.add("picture", "Please upload a valid image file.");
                return Ok(pages::account(user, &form, &errors, None).into_response());
            }
            Err(AvatarError::Storage(e)) => return Err(internal(e)),
        },
        None => user.avatar_file.clone(),
    };

    let updated = User::update_profile(&state.db, user.id, &form.username, &form.email, &avatar_file)
        .await
        .map_err(internal)?;

    info!(user_id = %updated.id, "account updated");
    set_flash(
        &cookies,
        &state.cookie_key,
        &Flash::success("Account updated successfully!"),
    );
    Ok(Redirect::to("/account").into_response())
}
