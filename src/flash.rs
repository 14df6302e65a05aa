use serde::{Deserialize, Serialize};
use tower_cookies::{Cookie, Cookies, Key};

const FLASH_COOKIE: &str = "folio_flash";

/// One-shot notice carried across a redirect in the private cookie jar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Danger,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Danger,
            message: message.into(),
        }
    }
}

pub fn set_flash(cookies: &Cookies, key: &Key, flash: &Flash) {
    // Serialization of a two-field struct cannot fail.
    let payload = serde_json::to_string(flash).unwrap_or_default();
    let mut cookie = Cookie::new(FLASH_COOKIE, payload);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookies.private(key).add(cookie);
}

/// Read and clear the pending notice, if any.
pub fn take_flash(cookies: &Cookies, key: &Key) -> Option<Flash> {
    let jar = cookies.private(key);
    let cookie = jar.get(FLASH_COOKIE)?;
    let flash = serde_json::from_str(cookie.value()).ok();

    let mut removal = Cookie::new(FLASH_COOKIE, "");
    removal.set_path("/");
    jar.remove(removal);

    flash
}
