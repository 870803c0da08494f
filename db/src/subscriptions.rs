use color_eyre::Result;
use sqlx::PgPool;

use crate::users::{profile_select, Profile};

pub struct Subscription;

impl Subscription {
    /// Makes `subscriber_id` follow `author_id`. Returns `false` if it already did.
    ///
    /// Self-subscription violates a check constraint and surfaces as an error.
    #[tracing::instrument(err)]
    pub async fn create(pool: &PgPool, subscriber_id: i64, author_id: i64) -> Result<bool> {
        let result = sqlx::query(
            r"
            INSERT INTO subscriptions (subscriber_id, author_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(subscriber_id)
        .bind(author_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(err)]
    pub async fn delete(pool: &PgPool, subscriber_id: i64, author_id: i64) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM subscriptions WHERE subscriber_id = $1 AND author_id = $2")
                .bind(subscriber_id)
                .bind(author_id)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Profiles of the authors `subscriber_id` follows, ordered by username.
    pub async fn list_authors(
        pool: &PgPool,
        subscriber_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Profile>> {
        let authors = sqlx::query_as::<_, Profile>(concat!(
            profile_select!(),
            r"
            JOIN subscriptions sub ON sub.author_id = u.user_id
            WHERE sub.subscriber_id = $1
            ORDER BY u.username
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(subscriber_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(authors)
    }

    pub async fn count_authors(pool: &PgPool, subscriber_id: i64) -> Result<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = $1")
                .bind(subscriber_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::test_support::create_user;

    #[sqlx::test(migrations = "./migrations")]
    async fn test_subscribe_is_unique(pool: PgPool) {
        let fan = create_user(&pool, "fan").await;
        let chef = create_user(&pool, "chef").await;

        assert!(Subscription::create(&pool, fan.user_id, chef.user_id)
            .await
            .unwrap());
        assert!(!Subscription::create(&pool, fan.user_id, chef.user_id)
            .await
            .unwrap());

        let profile = Profile::get(&pool, chef.user_id, Some(fan.user_id))
            .await
            .unwrap()
            .unwrap();
        assert!(profile.is_subscribed);

        let reverse = Profile::get(&pool, fan.user_id, Some(chef.user_id))
            .await
            .unwrap()
            .unwrap();
        assert!(!reverse.is_subscribed);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_self_subscription_is_rejected(pool: PgPool) {
        let user = create_user(&pool, "narcissus").await;

        assert!(Subscription::create(&pool, user.user_id, user.user_id)
            .await
            .is_err());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_list_authors(pool: PgPool) {
        let fan = create_user(&pool, "fan").await;
        let zed = create_user(&pool, "zed").await;
        let amy = create_user(&pool, "amy").await;
        create_user(&pool, "ignored").await;

        Subscription::create(&pool, fan.user_id, zed.user_id)
            .await
            .unwrap();
        Subscription::create(&pool, fan.user_id, amy.user_id)
            .await
            .unwrap();

        let authors = Subscription::list_authors(&pool, fan.user_id, 10, 0)
            .await
            .unwrap();
        let names: Vec<_> = authors.iter().map(|a| a.username.as_str()).collect();
        assert_eq!(names, vec!["amy", "zed"]);
        assert!(authors.iter().all(|a| a.is_subscribed));
        assert_eq!(
            Subscription::count_authors(&pool, fan.user_id).await.unwrap(),
            2
        );

        assert!(Subscription::delete(&pool, fan.user_id, zed.user_id)
            .await
            .unwrap());
        assert!(!Subscription::delete(&pool, fan.user_id, zed.user_id)
            .await
            .unwrap());
    }
}
