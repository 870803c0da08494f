use color_eyre::Result;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ingredient {
    pub ingredient_id: i64,
    pub name: String,
    pub measurement_unit: String,
}

/// An ingredient line of a recipe.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecipeIngredient {
    pub recipe_id: i64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub ingredient: Ingredient,
    pub amount: i32,
}

/// Escapes LIKE wildcards so `prefix` only matches literally.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl Ingredient {
    pub async fn get_by_id(pool: &PgPool, ingredient_id: i64) -> Result<Option<Self>> {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            "SELECT ingredient_id, name, measurement_unit FROM ingredients WHERE ingredient_id = $1",
        )
        .bind(ingredient_id)
        .fetch_optional(pool)
        .await?;

        Ok(ingredient)
    }

    /// All ingredients, optionally only those whose name starts with `name_prefix`
    /// (case-insensitive).
    pub async fn search(pool: &PgPool, name_prefix: Option<&str>) -> Result<Vec<Self>> {
        let pattern = name_prefix.map(like_prefix);

        let ingredients = sqlx::query_as::<_, Ingredient>(
            r"
            SELECT ingredient_id, name, measurement_unit
            FROM ingredients
            WHERE $1::text IS NULL OR LOWER(name) LIKE LOWER($1)
            ORDER BY name, measurement_unit
            ",
        )
        .bind(pattern)
        .fetch_all(pool)
        .await?;

        Ok(ingredients)
    }

    pub async fn existing_ids(pool: &PgPool, ingredient_ids: &[i64]) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT ingredient_id FROM ingredients WHERE ingredient_id = ANY($1)",
        )
        .bind(ingredient_ids)
        .fetch_all(pool)
        .await?;

        Ok(ids)
    }

    /// Inserts the ingredient unless an identical one exists. Returns whether a row was added.
    pub async fn get_or_create(pool: &PgPool, name: &str, measurement_unit: &str) -> Result<bool> {
        let result = sqlx::query(
            r"
            INSERT INTO ingredients (name, measurement_unit)
            VALUES ($1, $2)
            ON CONFLICT ON CONSTRAINT ingredients_name_unit_unique DO NOTHING
            ",
        )
        .bind(name)
        .bind(measurement_unit)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

impl RecipeIngredient {
    pub async fn get_by_recipes(pool: &PgPool, recipe_ids: &[i64]) -> Result<Vec<Self>> {
        let ingredients = sqlx::query_as::<_, RecipeIngredient>(
            r"
            SELECT ri.recipe_id, i.ingredient_id, i.name, i.measurement_unit, ri.amount
            FROM recipe_ingredients ri
            JOIN ingredients i ON i.ingredient_id = ri.ingredient_id
            WHERE ri.recipe_id = ANY($1)
            ORDER BY i.name
            ",
        )
        .bind(recipe_ids)
        .fetch_all(pool)
        .await?;

        Ok(ingredients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_prefix_escapes_wildcards() {
        assert_eq!(like_prefix("sug"), "sug%");
        assert_eq!(like_prefix("50%_"), "50\\%\\_%");
        assert_eq!(like_prefix("a\\b"), "a\\\\b%");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_search_by_prefix_is_case_insensitive(pool: PgPool) {
        assert!(Ingredient::get_or_create(&pool, "Sugar", "g").await.unwrap());
        assert!(Ingredient::get_or_create(&pool, "salt", "g").await.unwrap());
        assert!(Ingredient::get_or_create(&pool, "brown sugar", "g")
            .await
            .unwrap());

        let found = Ingredient::search(&pool, Some("SU")).await.unwrap();
        let names: Vec<_> = found.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Sugar"]);

        let all = Ingredient::search(&pool, None).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_get_or_create_is_idempotent(pool: PgPool) {
        assert!(Ingredient::get_or_create(&pool, "milk", "ml").await.unwrap());
        assert!(!Ingredient::get_or_create(&pool, "milk", "ml").await.unwrap());
        assert!(Ingredient::get_or_create(&pool, "milk", "l").await.unwrap());

        assert_eq!(Ingredient::search(&pool, None).await.unwrap().len(), 2);
    }
}
