//! Per-user recipe bookmarks. Favorites and the shopping cart share one shape: a
//! `(user_id, recipe_id)` pair that is unique per list.

use color_eyre::Result;
use sqlx::PgPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeList {
    Favorites,
    ShoppingCart,
}

impl RecipeList {
    fn table(self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "shopping_cart",
        }
    }

    /// Adds the recipe to the user's list. Returns `false` if it was already there.
    #[tracing::instrument(err)]
    pub async fn add(self, pool: &PgPool, user_id: i64, recipe_id: i64) -> Result<bool> {
        let result = sqlx::query(&format!(
            "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            self.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Removes the recipe from the user's list. Returns `false` if it was not there.
    #[tracing::instrument(err)]
    pub async fn remove(self, pool: &PgPool, user_id: i64, recipe_id: i64) -> Result<bool> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
            self.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::test_support::{create_recipe, fixtures};
    use crate::recipes::{IngredientAmount, Recipe};
    use crate::users::test_support::create_user;

    #[sqlx::test(migrations = "./migrations")]
    async fn test_lists_are_independent_and_unique(pool: PgPool) {
        let f = fixtures(&pool).await;
        let user = create_user(&pool, "alice").await;
        let recipe = create_recipe(
            &pool,
            user.user_id,
            "Omelette",
            &[f.breakfast.tag_id],
            &[IngredientAmount {
                ingredient_id: f.eggs.ingredient_id,
                amount: 2,
            }],
        )
        .await;

        assert!(RecipeList::Favorites
            .add(&pool, user.user_id, recipe.recipe_id)
            .await
            .unwrap());
        assert!(!RecipeList::Favorites
            .add(&pool, user.user_id, recipe.recipe_id)
            .await
            .unwrap());

        let details = Recipe::details(&pool, recipe.recipe_id, Some(user.user_id))
            .await
            .unwrap()
            .unwrap();
        assert!(details.is_favorited);
        assert!(!details.is_in_shopping_cart);

        assert!(RecipeList::Favorites
            .remove(&pool, user.user_id, recipe.recipe_id)
            .await
            .unwrap());
        assert!(!RecipeList::Favorites
            .remove(&pool, user.user_id, recipe.recipe_id)
            .await
            .unwrap());
    }
}
