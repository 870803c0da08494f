use chrono::{DateTime, Utc};
use color_eyre::Result;
use sqlx::PgPool;

use crate::users::User;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthToken {
    pub key: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

impl AuthToken {
    /// Returns the user's existing token, or stores `new_key` if they have none.
    pub async fn get_or_create(pool: &PgPool, user_id: i64, new_key: &str) -> Result<Self> {
        let token = sqlx::query_as::<_, AuthToken>(
            r"
            INSERT INTO auth_tokens (key, user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET key = auth_tokens.key
            RETURNING *
            ",
        )
        .bind(new_key)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(token)
    }

    pub async fn find_user(pool: &PgPool, key: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r"
            SELECT u.*
            FROM auth_tokens t
            JOIN users u ON u.user_id = t.user_id
            WHERE t.key = $1
            ",
        )
        .bind(key)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn delete_for_user(pool: &PgPool, user_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM auth_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::test_support::create_user;

    #[sqlx::test(migrations = "./migrations")]
    async fn test_get_or_create_reuses_existing_key(pool: PgPool) {
        let user = create_user(&pool, "alice").await;

        let first = AuthToken::get_or_create(&pool, user.user_id, "first-key")
            .await
            .unwrap();
        let second = AuthToken::get_or_create(&pool, user.user_id, "second-key")
            .await
            .unwrap();

        assert_eq!(first.key, "first-key");
        assert_eq!(second.key, "first-key");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_find_user_and_logout(pool: PgPool) {
        let user = create_user(&pool, "alice").await;
        AuthToken::get_or_create(&pool, user.user_id, "key")
            .await
            .unwrap();

        let found = AuthToken::find_user(&pool, "key").await.unwrap().unwrap();
        assert_eq!(found.user_id, user.user_id);

        AuthToken::delete_for_user(&pool, user.user_id)
            .await
            .unwrap();
        assert!(AuthToken::find_user(&pool, "key").await.unwrap().is_none());
    }
}
