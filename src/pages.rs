//! Minimal server-rendered views. Deliberately plain markup; the
//! interesting behavior lives in the handlers.

use maud::{html, Markup, DOCTYPE};

use crate::account::forms::UpdateAccountForm;
use crate::auth::forms::{FieldErrors, LoginForm, RegisterForm};
use crate::flash::{Flash, FlashKind};
use crate::users::User;

fn layout(title: &str, user: Option<&User>, flash: Option<&Flash>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { (title) " - Folio" }
            }
            body {
                nav {
                    a href="/" { "Home" }
                    " "
                    @if let Some(user) = user {
                        a href="/account" { (user.username) }
                        " "
                        a href="/logout" { "Logout" }
                    } @else {
                        a href="/login" { "Login" }
                        " "
                        a href="/register" { "Register" }
                    }
                }
                @if let Some(flash) = flash {
                    p class=(match flash.kind {
                        FlashKind::Success => "notice notice-success",
                        FlashKind::Danger => "notice notice-danger",
                    }) { (flash.message) }
                }
                main { (content) }
            }
        }
    }
}

fn field_error_list(errors: &FieldErrors, field: &str) -> Markup {
    html! {
        @for message in errors.for_field(field) {
            p class="field-error" { (message) }
        }
    }
}

pub fn home(user: Option<&User>, flash: Option<&Flash>) -> Markup {
    layout(
        "Home",
        user,
        flash,
        html! {
            h1 { "Welcome" }
            @if let Some(user) = user {
                p { "Signed in as " (user.username) "." }
            } @else {
                p { "A small personal portfolio. " a href="/register" { "Create an account" } "." }
            }
        },
    )
}

pub fn register(values: &RegisterForm, errors: &FieldErrors, flash: Option<&Flash>) -> Markup {
    layout(
        "Register",
        None,
        flash,
        html! {
            h1 { "Join today" }
            form method="post" action="/register" {
                label { "Username"
                    input type="text" name="username" value=(values.username);
                }
                (field_error_list(errors, "username"))
                label { "Email"
                    input type="email" name="email" value=(values.email);
                }
                (field_error_list(errors, "email"))
                label { "Password"
                    input type="password" name="password";
                }
                (field_error_list(errors, "password"))
                label { "Confirm password"
                    input type="password" name="confirm_password";
                }
                (field_error_list(errors, "confirm_password"))
                button type="submit" { "Sign up" }
            }
            p { "Already have an account? " a href="/login" { "Log in" } }
        },
    )
}

pub fn login(
    values: &LoginForm,
    next: Option<&str>,
    notice: Option<&str>,
    flash: Option<&Flash>,
) -> Markup {
    let action = match next {
        Some(next) => format!("/login?next={}", urlencoding::encode(next)),
        None => "/login".to_string(),
    };
    layout(
        "Login",
        None,
        flash,
        html! {
            h1 { "Log in" }
            @if let Some(notice) = notice {
                p class="notice notice-danger" { (notice) }
            }
            form method="post" action=(action) {
                label { "Email"
                    input type="email" name="email" value=(values.email);
                }
                label { "Password"
                    input type="password" name="password";
                }
                label {
                    input type="checkbox" name="remember" checked[values.remember()];
                    " Remember me"
                }
                button type="submit" { "Log in" }
            }
            p { "Need an account? " a href="/register" { "Register" } }
        },
    )
}

pub fn account(
    user: &User,
    values: &UpdateAccountForm,
    errors: &FieldErrors,
    flash: Option<&Flash>,
) -> Markup {
    layout(
        "Account",
        Some(user),
        flash,
        html! {
            h1 { "Your account" }
            img src=(user.avatar_url()) alt="Profile picture" width="125";
            form method="post" action="/account" enctype="multipart/form-data" {
                label { "Username"
                    input type="text" name="username" value=(values.username);
                }
                (field_error_list(errors, "username"))
                label { "Email"
                    input type="email" name="email" value=(values.email);
                }
                (field_error_list(errors, "email"))
                label { "Profile picture"
                    input type="file" name="picture" accept="image/*";
                }
                (field_error_list(errors, "picture"))
                button type="submit" { "Update" }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::forms::RegisterForm;

    #[test]
    fn register_page_refills_values_and_shows_field_errors() {
        let values = RegisterForm {
            username: "sasha".into(),
            email: "bad-email".into(),
            password: String::new(),
            confirm_password: String::new(),
        };
        let mut errors = FieldErrors::default();
        errors.add("email", "Enter a valid email address.");

        let markup = register(&values, &errors, None).into_string();
        assert!(markup.contains(r#"value="sasha""#));
        assert!(markup.contains("Enter a valid email address."));
        // Passwords are never echoed back into the form.
        assert!(!markup.contains(r#"name="password" value"#));
    }

    #[test]
    fn login_page_carries_next_target_and_generic_notice() {
        let values = LoginForm {
            email: "sasha@example.com".into(),
            password: String::new(),
            remember: None,
        };
        let markup = login(
            &values,
            Some("/account"),
            Some("Login failed! Please check your email and password."),
            None,
        )
        .into_string();
        assert!(markup.contains("/login?next=%2Faccount"));
        assert!(markup.contains("Login failed!"));
    }

    #[test]
    fn nav_switches_on_authentication() {
        let user = crate::users::User {
            id: uuid::Uuid::new_v4(),
            username: "sasha".into(),
            email: "sasha@example.com".into(),
            password_hash: "hash".into(),
            avatar_file: "default.png".into(),
            created_at: time::OffsetDateTime::UNIX_EPOCH,
        };
        let signed_in = home(Some(&user), None).into_string();
        assert!(signed_in.contains("/logout"));
        let anonymous = home(None, None).into_string();
        assert!(anonymous.contains("/login"));
    }
}
