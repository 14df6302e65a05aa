use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Key material for the private cookie jar; at least 64 bytes.
    pub secret: Option<String>,
    pub ttl_hours: i64,
    pub remember_ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let upload_dir = std::env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("static/profile_pictures"));
        let session = SessionConfig {
            secret: std::env::var("SESSION_SECRET").ok(),
            ttl_hours: std::env::var("SESSION_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(12),
            remember_ttl_days: std::env::var("SESSION_REMEMBER_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(30),
        };
        Ok(Self {
            database_url,
            upload_dir,
            session,
        })
    }
}
