use color_eyre::Result;
use serde::Serialize;
use sqlx::PgPool;

/// One line of a shopping list: an ingredient summed over every recipe in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}

impl ShoppingListItem {
    #[tracing::instrument(skip(pool), err)]
    pub async fn for_user(pool: &PgPool, user_id: i64) -> Result<Vec<Self>> {
        let items = sqlx::query_as::<_, ShoppingListItem>(
            r"
            SELECT
                i.name,
                i.measurement_unit,
                SUM(ri.amount)::BIGINT AS total_amount
            FROM shopping_cart c
            JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
            JOIN ingredients i ON i.ingredient_id = ri.ingredient_id
            WHERE c.user_id = $1
            GROUP BY i.name, i.measurement_unit
            ORDER BY i.name, i.measurement_unit
            ",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(items)
    }
}
