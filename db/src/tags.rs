use color_eyre::Result;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub tag_id: i64,
    pub name: String,
    pub slug: String,
}

/// A tag together with the recipe it is attached to.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecipeTag {
    pub recipe_id: i64,
    #[sqlx(flatten)]
    pub tag: Tag,
}

impl Tag {
    pub async fn get_by_id(pool: &PgPool, tag_id: i64) -> Result<Option<Self>> {
        let tag = sqlx::query_as::<_, Tag>("SELECT tag_id, name, slug FROM tags WHERE tag_id = $1")
            .bind(tag_id)
            .fetch_optional(pool)
            .await?;

        Ok(tag)
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>> {
        let tags = sqlx::query_as::<_, Tag>("SELECT tag_id, name, slug FROM tags ORDER BY tag_id")
            .fetch_all(pool)
            .await?;

        Ok(tags)
    }

    /// Of `tag_ids`, the ones that exist.
    pub async fn existing_ids(pool: &PgPool, tag_ids: &[i64]) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT tag_id FROM tags WHERE tag_id = ANY($1)")
            .bind(tag_ids)
            .fetch_all(pool)
            .await?;

        Ok(ids)
    }

    pub async fn upsert_by_slug(pool: &PgPool, name: &str, slug: &str) -> Result<Self> {
        let tag = sqlx::query_as::<_, Tag>(
            r"
            INSERT INTO tags (name, slug)
            VALUES ($1, $2)
            ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name
            RETURNING tag_id, name, slug
            ",
        )
        .bind(name)
        .bind(slug)
        .fetch_one(pool)
        .await?;

        Ok(tag)
    }
}

impl RecipeTag {
    pub async fn get_by_recipes(pool: &PgPool, recipe_ids: &[i64]) -> Result<Vec<Self>> {
        let tags = sqlx::query_as::<_, RecipeTag>(
            r"
            SELECT rt.recipe_id, t.tag_id, t.name, t.slug
            FROM recipe_tags rt
            JOIN tags t ON t.tag_id = rt.tag_id
            WHERE rt.recipe_id = ANY($1)
            ORDER BY t.tag_id
            ",
        )
        .bind(recipe_ids)
        .fetch_all(pool)
        .await?;

        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test(migrations = "./migrations")]
    async fn test_upsert_by_slug_updates_name(pool: PgPool) {
        let first = Tag::upsert_by_slug(&pool, "Breakfast", "breakfast")
            .await
            .unwrap();
        let second = Tag::upsert_by_slug(&pool, "Morning", "breakfast")
            .await
            .unwrap();

        assert_eq!(first.tag_id, second.tag_id);
        assert_eq!(second.name, "Morning");
        assert_eq!(Tag::list_all(&pool).await.unwrap().len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_existing_ids_filters_unknown(pool: PgPool) {
        let lunch = Tag::upsert_by_slug(&pool, "Lunch", "lunch").await.unwrap();

        let ids = Tag::existing_ids(&pool, &[lunch.tag_id, lunch.tag_id + 100])
            .await
            .unwrap();

        assert_eq!(ids, vec![lunch.tag_id]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_invalid_slug_is_rejected(pool: PgPool) {
        let result = Tag::upsert_by_slug(&pool, "Bad", "has space").await;

        assert!(result.is_err());
    }
}
