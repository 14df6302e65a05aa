use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

pub const USERNAME_MIN: usize = 2;
pub const USERNAME_MAX: usize = 20;
pub const PASSWORD_MIN: usize = 8;

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Emails are compared case-insensitively everywhere, so they are folded
/// once at the boundary.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Field-level validation errors, rendered inline next to each input.
#[derive(Debug, Default, Clone)]
pub struct FieldErrors(Vec<(&'static str, String)>);

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push((field, message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn for_field(&self, field: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(f, _)| *f == field)
            .map(|(_, m)| m.as_str())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Shared username/email shape checks for registration and account update.
pub fn validate_identity(username: &str, email: &str) -> FieldErrors {
    let mut errors = FieldErrors::default();

    let username = username.trim();
    if username.is_empty() {
        errors.add("username", "Username is required.");
    } else if username.len() < USERNAME_MIN || username.len() > USERNAME_MAX {
        errors.add(
            "username",
            format!("Username must be between {USERNAME_MIN} and {USERNAME_MAX} characters."),
        );
    }

    let email = normalize_email(email);
    if email.is_empty() {
        errors.add("email", "Email is required.");
    } else if !is_valid_email(&email) {
        errors.add("email", "Enter a valid email address.");
    }

    errors
}

impl RegisterForm {
    /// Structural checks only; uniqueness runs in the handler against the
    /// store.
    pub fn validate(&self) -> FieldErrors {
        let mut errors = validate_identity(&self.username, &self.email);

        if self.password.is_empty() {
            errors.add("password", "Password is required.");
        } else if self.password.len() < PASSWORD_MIN {
            errors.add(
                "password",
                format!("Password must be at least {PASSWORD_MIN} characters."),
            );
        }

        if self.confirm_password != self.password {
            errors.add("confirm_password", "Passwords do not match.");
        }

        errors
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Checkboxes post "on" when ticked and nothing otherwise.
    #[serde(default)]
    pub remember: Option<String>,
}

impl LoginForm {
    pub fn remember(&self) -> bool {
        self.remember.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_register() -> RegisterForm {
        RegisterForm {
            username: "sasha".into(),
            email: "sasha@example.com".into(),
            password: "hunter2hunter2".into(),
            confirm_password: "hunter2hunter2".into(),
        }
    }

    #[test]
    fn accepts_a_well_formed_registration() {
        assert!(valid_register().validate().is_empty());
    }

    #[test]
    fn rejects_missing_fields_with_one_error_each() {
        let form = RegisterForm {
            username: "".into(),
            email: "".into(),
            password: "".into(),
            confirm_password: "".into(),
        };
        let errors = form.validate();
        assert_eq!(errors.for_field("username").len(), 1);
        assert_eq!(errors.for_field("email").len(), 1);
        assert_eq!(errors.for_field("password").len(), 1);
        // Empty confirm matches empty password, already reported above.
        assert!(errors.for_field("confirm_password").is_empty());
    }

    #[test]
    fn rejects_malformed_email() {
        let mut form = valid_register();
        form.email = "not-an-email".into();
        let errors = form.validate();
        assert_eq!(errors.for_field("email"), vec!["Enter a valid email address."]);
    }

    #[test]
    fn rejects_password_mismatch() {
        let mut form = valid_register();
        form.confirm_password = "something-else".into();
        let errors = form.validate();
        assert_eq!(errors.for_field("confirm_password").len(), 1);
    }

    #[test]
    fn rejects_short_password_and_long_username() {
        let mut form = valid_register();
        form.username = "x".repeat(USERNAME_MAX + 1);
        form.password = "short".into();
        form.confirm_password = "short".into();
        let errors = form.validate();
        assert_eq!(errors.for_field("username").len(), 1);
        assert_eq!(errors.for_field("password").len(), 1);
    }

    #[test]
    fn email_normalization_folds_case_and_whitespace() {
        assert_eq!(normalize_email("  Sasha@Example.COM "), "sasha@example.com");
    }

    #[test]
    fn remember_checkbox_parsing() {
        let ticked = LoginForm {
            email: "a@b.c".into(),
            password: "pw".into(),
            remember: Some("on".into()),
        };
        let unticked = LoginForm {
            email: "a@b.c".into(),
            password: "pw".into(),
            remember: None,
        };
        assert!(ticked.remember());
        assert!(!unticked.remember());
    }
}
