use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub user_id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user as seen by another (possibly anonymous) user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub user_id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub is_subscribed: bool,
}

#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password_hash: &'a str,
}

/// Selects `Profile` rows; `$1` is the viewer's user id (or NULL for anonymous).
macro_rules! profile_select {
    () => {
        r"
        SELECT
            u.user_id,
            u.email,
            u.username,
            u.first_name,
            u.last_name,
            u.avatar,
            EXISTS (
                SELECT 1 FROM subscriptions s
                WHERE s.subscriber_id = $1 AND s.author_id = u.user_id
            ) AS is_subscribed
        FROM users u
        "
    };
}
pub(crate) use profile_select;

impl User {
    #[tracing::instrument(skip_all, fields(username = new_user.username), err)]
    pub async fn create(pool: &PgPool, new_user: &NewUser<'_>) -> Result<Self> {
        let user = sqlx::query_as::<_, User>(
            r"
            INSERT INTO users (email, username, first_name, last_name, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            ",
        )
        .bind(new_user.email)
        .bind(new_user.username)
        .bind(new_user.first_name)
        .bind(new_user.last_name)
        .bind(new_user.password_hash)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    pub async fn get_by_id(pool: &PgPool, user_id: i64) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    pub async fn get_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    pub async fn email_taken(pool: &PgPool, email: &str) -> Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))",
        )
        .bind(email)
        .fetch_one(pool)
        .await?;

        Ok(taken)
    }

    pub async fn username_taken(pool: &PgPool, username: &str) -> Result<bool> {
        let taken =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(pool)
                .await?;

        Ok(taken)
    }

    /// Replaces the avatar and returns the one it replaced, as stored at the time
    /// of the update, so the caller can remove the file.
    pub async fn set_avatar(&self, pool: &PgPool, avatar: Option<&str>) -> Result<Option<String>> {
        let previous = sqlx::query_scalar::<_, Option<String>>(
            "WITH previous AS (
                SELECT user_id, avatar FROM users WHERE user_id = $1 FOR UPDATE
            )
            UPDATE users
            SET avatar = $2, updated_at = NOW()
            FROM previous
            WHERE users.user_id = previous.user_id
            RETURNING previous.avatar",
        )
        .bind(self.user_id)
        .bind(avatar)
        .fetch_optional(pool)
        .await?;

        Ok(previous.flatten())
    }

    pub async fn set_password_hash(&self, pool: &PgPool, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE user_id = $1")
            .bind(self.user_id)
            .bind(password_hash)
            .execute(pool)
            .await?;

        Ok(())
    }
}

impl Profile {
    pub async fn get(pool: &PgPool, user_id: i64, viewer_id: Option<i64>) -> Result<Option<Self>> {
        let profile =
            sqlx::query_as::<_, Profile>(concat!(profile_select!(), "WHERE u.user_id = $2"))
                .bind(viewer_id)
                .bind(user_id)
                .fetch_optional(pool)
                .await?;

        Ok(profile)
    }

    pub async fn list(
        pool: &PgPool,
        viewer_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>> {
        let profiles = sqlx::query_as::<_, Profile>(concat!(
            profile_select!(),
            "ORDER BY u.username LIMIT $2 OFFSET $3"
        ))
        .bind(viewer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(profiles)
    }

    pub async fn count(pool: &PgPool) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
