use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Placeholder shipped in the static directory; new accounts point at it.
pub const DEFAULT_AVATAR: &str = "default.png";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub avatar_file: String,
    pub created_at: OffsetDateTime,
}

impl User {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, avatar_file, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, avatar_file, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_username(db: &PgPool, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, avatar_file, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with hashed password and the placeholder avatar.
    pub async fn create(
        db: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, avatar_file, created_at
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Persist a profile edit. `avatar_file` is the full new value; callers
    /// pass the existing filename through when no upload happened.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        username: &str,
        email: &str,
        avatar_file: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = $2, email = $3, avatar_file = $4
            WHERE id = $1
            RETURNING id, username, email, password_hash, avatar_file, created_at
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(email)
        .bind(avatar_file)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub fn avatar_url(&self) -> String {
        format!("/static/profile_pictures/{}", self.avatar_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "sasha".into(),
            email: "sasha@example.com".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            avatar_file: DEFAULT_AVATAR.into(),
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn serialization_never_includes_password_hash() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(json.contains("sasha@example.com"));
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn avatar_url_points_at_static_dir() {
        let user = sample_user();
        assert_eq!(user.avatar_url(), "/static/profile_pictures/default.png");
    }
}
