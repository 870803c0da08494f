use std::collections::HashMap;

use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::ingredients::RecipeIngredient;
use crate::tags::{RecipeTag, Tag};
use crate::users::Profile;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recipe {
    pub recipe_id: i64,
    pub author_id: i64,
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32, // minutes
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The short form used in favorites, shopping cart and subscription listings.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecipeSummary {
    pub recipe_id: i64,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub ingredient_id: i64,
    pub amount: i32,
}

#[derive(Debug, Clone)]
pub struct RecipeInput<'a> {
    pub name: &'a str,
    pub text: &'a str,
    pub cooking_time: i32,
    pub tag_ids: &'a [i64],
    pub ingredients: &'a [IngredientAmount],
}

/// Everything needed to render a recipe for a given viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeDetails {
    pub recipe: Recipe,
    pub author: Profile,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub author_id: Option<i64>,
    /// Matches recipes carrying any of these tag slugs.
    pub tag_slugs: Vec<String>,
    pub favorited_by: Option<i64>,
    pub in_shopping_cart_of: Option<i64>,
}

#[derive(sqlx::FromRow)]
struct RecipeRow {
    #[sqlx(flatten)]
    recipe: Recipe,
    #[sqlx(flatten)]
    author: Profile,
    is_favorited: bool,
    is_in_shopping_cart: bool,
}

impl RecipeFilter {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");

        if let Some(author_id) = self.author_id {
            qb.push(" AND r.author_id = ").push_bind(author_id);
        }

        if !self.tag_slugs.is_empty() {
            qb.push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt JOIN tags t ON t.tag_id = rt.tag_id \
                 WHERE rt.recipe_id = r.recipe_id AND t.slug = ANY(",
            )
            .push_bind(self.tag_slugs.clone())
            .push("))");
        }

        if let Some(user_id) = self.favorited_by {
            qb.push(
                " AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.recipe_id AND f.user_id = ",
            )
            .push_bind(user_id)
            .push(")");
        }

        if let Some(user_id) = self.in_shopping_cart_of {
            qb.push(
                " AND EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.recipe_id AND c.user_id = ",
            )
            .push_bind(user_id)
            .push(")");
        }
    }
}

fn select_rows(viewer_id: Option<i64>) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        r"
        SELECT
            r.recipe_id, r.author_id, r.name, r.text, r.image, r.cooking_time,
            r.created_at, r.updated_at,
            u.user_id, u.email, u.username, u.first_name, u.last_name, u.avatar,
            EXISTS (
                SELECT 1 FROM subscriptions s
                WHERE s.author_id = u.user_id AND s.subscriber_id = ",
    );
    qb.push_bind(viewer_id);
    qb.push(
        r"
            ) AS is_subscribed,
            EXISTS (
                SELECT 1 FROM favorites f
                WHERE f.recipe_id = r.recipe_id AND f.user_id = ",
    );
    qb.push_bind(viewer_id);
    qb.push(
        r"
            ) AS is_favorited,
            EXISTS (
                SELECT 1 FROM shopping_cart c
                WHERE c.recipe_id = r.recipe_id AND c.user_id = ",
    );
    qb.push_bind(viewer_id);
    qb.push(
        r"
            ) AS is_in_shopping_cart
        FROM recipes r
        JOIN users u ON u.user_id = r.author_id",
    );
    qb
}

async fn link_tags(conn: &mut PgConnection, recipe_id: i64, tag_ids: &[i64]) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO recipe_tags (recipe_id, tag_id)
        SELECT $1, tag_id FROM UNNEST($2::bigint[]) AS t (tag_id)
        ",
    )
    .bind(recipe_id)
    .bind(tag_ids)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn link_ingredients(
    conn: &mut PgConnection,
    recipe_id: i64,
    ingredients: &[IngredientAmount],
) -> Result<()> {
    let (ids, amounts): (Vec<i64>, Vec<i32>) = ingredients
        .iter()
        .map(|i| (i.ingredient_id, i.amount))
        .unzip();

    sqlx::query(
        r"
        INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount)
        SELECT $1, ingredient_id, amount
        FROM UNNEST($2::bigint[], $3::integer[]) AS t (ingredient_id, amount)
        ",
    )
    .bind(recipe_id)
    .bind(ids)
    .bind(amounts)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

impl Recipe {
    #[tracing::instrument(skip(pool, input), fields(name = input.name), err)]
    pub async fn create(
        pool: &PgPool,
        author_id: i64,
        input: &RecipeInput<'_>,
        image: &str,
    ) -> Result<Self> {
        let mut transaction = pool.begin().await?;

        let recipe = sqlx::query_as::<_, Recipe>(
            r"
            INSERT INTO recipes (author_id, name, text, image, cooking_time)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            ",
        )
        .bind(author_id)
        .bind(input.name)
        .bind(input.text)
        .bind(image)
        .bind(input.cooking_time)
        .fetch_one(&mut *transaction)
        .await?;

        link_tags(&mut transaction, recipe.recipe_id, input.tag_ids).await?;
        link_ingredients(&mut transaction, recipe.recipe_id, input.ingredients).await?;

        transaction.commit().await?;

        Ok(recipe)
    }

    /// Replaces the recipe's fields, tags and ingredient lines. `image` is kept when `None`.
    #[tracing::instrument(skip(self, pool, input), fields(recipe_id = self.recipe_id), err)]
    pub async fn update(
        &self,
        pool: &PgPool,
        input: &RecipeInput<'_>,
        image: Option<&str>,
    ) -> Result<Self> {
        let mut transaction = pool.begin().await?;

        let updated = sqlx::query_as::<_, Recipe>(
            r"
            UPDATE recipes
            SET name = $2,
                text = $3,
                image = COALESCE($4, image),
                cooking_time = $5,
                updated_at = NOW()
            WHERE recipe_id = $1
            RETURNING *
            ",
        )
        .bind(self.recipe_id)
        .bind(input.name)
        .bind(input.text)
        .bind(image)
        .bind(input.cooking_time)
        .fetch_one(&mut *transaction)
        .await?;

        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
            .bind(self.recipe_id)
            .execute(&mut *transaction)
            .await?;
        link_tags(&mut transaction, self.recipe_id, input.tag_ids).await?;

        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
            .bind(self.recipe_id)
            .execute(&mut *transaction)
            .await?;
        link_ingredients(&mut transaction, self.recipe_id, input.ingredients).await?;

        transaction.commit().await?;

        Ok(updated)
    }

    pub async fn delete(&self, pool: &PgPool) -> Result<()> {
        sqlx::query("DELETE FROM recipes WHERE recipe_id = $1")
            .bind(self.recipe_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn get_by_id(pool: &PgPool, recipe_id: i64) -> Result<Option<Self>> {
        let recipe = sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE recipe_id = $1")
            .bind(recipe_id)
            .fetch_optional(pool)
            .await?;

        Ok(recipe)
    }

    pub async fn count(pool: &PgPool, filter: &RecipeFilter) -> Result<i64> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM recipes r");
        filter.push_where(&mut qb);

        let count = qb.build_query_scalar::<i64>().fetch_one(pool).await?;

        Ok(count)
    }

    /// A page of recipes, newest first, rendered for `viewer_id`.
    pub async fn list(
        pool: &PgPool,
        filter: &RecipeFilter,
        viewer_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RecipeDetails>> {
        let mut qb = select_rows(viewer_id);
        filter.push_where(&mut qb);
        qb.push(" ORDER BY r.recipe_id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = qb.build_query_as::<RecipeRow>().fetch_all(pool).await?;

        hydrate(pool, rows).await
    }

    pub async fn details(
        pool: &PgPool,
        recipe_id: i64,
        viewer_id: Option<i64>,
    ) -> Result<Option<RecipeDetails>> {
        let mut qb = select_rows(viewer_id);
        qb.push(" WHERE r.recipe_id = ").push_bind(recipe_id);

        let row = qb.build_query_as::<RecipeRow>().fetch_optional(pool).await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(hydrate(pool, vec![row]).await?.pop())
    }
}

async fn hydrate(pool: &PgPool, rows: Vec<RecipeRow>) -> Result<Vec<RecipeDetails>> {
    let recipe_ids: Vec<i64> = rows.iter().map(|r| r.recipe.recipe_id).collect();

    let mut tags: HashMap<i64, Vec<Tag>> = HashMap::new();
    for RecipeTag { recipe_id, tag } in RecipeTag::get_by_recipes(pool, &recipe_ids).await? {
        tags.entry(recipe_id).or_default().push(tag);
    }

    let mut ingredients: HashMap<i64, Vec<RecipeIngredient>> = HashMap::new();
    for ingredient in RecipeIngredient::get_by_recipes(pool, &recipe_ids).await? {
        ingredients
            .entry(ingredient.recipe_id)
            .or_default()
            .push(ingredient);
    }

    let details = rows
        .into_iter()
        .map(|row| {
            let recipe_id = row.recipe.recipe_id;
            RecipeDetails {
                tags: tags.remove(&recipe_id).unwrap_or_default(),
                ingredients: ingredients.remove(&recipe_id).unwrap_or_default(),
                recipe: row.recipe,
                author: row.author,
                is_favorited: row.is_favorited,
                is_in_shopping_cart: row.is_in_shopping_cart,
            }
        })
        .collect();

    Ok(details)
}

impl RecipeSummary {
    pub async fn get(pool: &PgPool, recipe_id: i64) -> Result<Option<Self>> {
        let summary = sqlx::query_as::<_, RecipeSummary>(
            "SELECT recipe_id, name, image, cooking_time FROM recipes WHERE recipe_id = $1",
        )
        .bind(recipe_id)
        .fetch_optional(pool)
        .await?;

        Ok(summary)
    }

    /// The author's recipes, newest first, at most `limit` of them when given.
    pub async fn list_by_author(
        pool: &PgPool,
        author_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<Self>> {
        let summaries = sqlx::query_as::<_, RecipeSummary>(
            r"
            SELECT recipe_id, name, image, cooking_time
            FROM recipes
            WHERE author_id = $1
            ORDER BY recipe_id DESC
            LIMIT $2
            ",
        )
        .bind(author_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(summaries)
    }

    pub async fn count_by_author(pool: &PgPool, author_id: i64) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::ingredients::Ingredient;

    pub(crate) struct Fixtures {
        pub breakfast: Tag,
        pub dinner: Tag,
        pub eggs: Ingredient,
        pub milk: Ingredient,
    }

    pub(crate) async fn fixtures(pool: &PgPool) -> Fixtures {
        let breakfast = Tag::upsert_by_slug(pool, "Breakfast", "breakfast")
            .await
            .unwrap();
        let dinner = Tag::upsert_by_slug(pool, "Dinner", "dinner").await.unwrap();

        Ingredient::get_or_create(pool, "eggs", "pcs").await.unwrap();
        Ingredient::get_or_create(pool, "milk", "ml").await.unwrap();
        let all = Ingredient::search(pool, None).await.unwrap();
        let eggs = all.iter().find(|i| i.name == "eggs").unwrap().clone();
        let milk = all.iter().find(|i| i.name == "milk").unwrap().clone();

        Fixtures {
            breakfast,
            dinner,
            eggs,
            milk,
        }
    }

    pub(crate) async fn create_recipe(
        pool: &PgPool,
        author_id: i64,
        name: &str,
        tag_ids: &[i64],
        ingredients: &[IngredientAmount],
    ) -> Recipe {
        Recipe::create(
            pool,
            author_id,
            &RecipeInput {
                name,
                text: "Mix and cook.",
                cooking_time: 10,
                tag_ids,
                ingredients,
            },
            "recipes/images/test.png",
        )
        .await
        .unwrap()
    }
}
