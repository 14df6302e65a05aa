use axum::extract::Multipart;
use bytes::Bytes;

use crate::auth::forms::{validate_identity, FieldErrors};
use crate::avatars::Upload;

/// Account update posted as multipart so the picture can ride along with
/// the text fields.
pub struct UpdateAccountForm {
    pub username: String,
    pub email: String,
    pub picture: Option<Upload>,
}

impl UpdateAccountForm {
    pub async fn from_multipart(mut mp: Multipart) -> anyhow::Result<Self> {
        let mut username = String::new();
        let mut email = String::new();
        let mut picture = None;

        while let Some(field) = mp.next_field().await? {
            match field.name() {
                Some("username") => username = field.text().await?,
                Some("email") => email = field.text().await?,
                Some("picture") => {
                    let filename = field.file_name().map(str::to_owned).unwrap_or_default();
                    let content_type = field.content_type().map(str::to_owned);
                    let body: Bytes = field.bytes().await?;
                    // A file input left empty still posts a nameless, empty part.
                    if !filename.is_empty() && !body.is_empty() {
                        picture = Some(Upload {
                            filename,
                            content_type,
                            body,
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            username,
            email,
            picture,
        })
    }

    pub fn validate(&self) -> FieldErrors {
        validate_identity(&self.username, &self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_flags_bad_identity_fields() {
        let form = UpdateAccountForm {
            username: String::new(),
            email: "nope".into(),
            picture: None,
        };
        let errors = form.validate();
        assert_eq!(errors.for_field("username").len(), 1);
        assert_eq!(errors.for_field("email").len(), 1);
    }

    #[test]
    fn validate_accepts_good_identity_fields() {
        let form = UpdateAccountForm {
            username: "sasha".into(),
            email: "sasha@example.com".into(),
            picture: None,
        };
        assert!(form.validate().is_empty());
    }
}
