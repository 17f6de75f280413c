use anyhow::Context;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct ShoppingLine {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

/// One row per (name, unit) across every recipe in the user's cart.
pub async fn totals_for(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<ShoppingLine>> {
    let rows = sqlx::query_as::<_, ShoppingLine>(
        r#"
        SELECT i.name, i.measurement_unit, SUM(ir.amount)::int8 AS total
          FROM ingredient_recipes ir
          JOIN ingredients i     ON i.id = ir.ingredient_id
          JOIN shopping_lists s  ON s.recipe_id = ir.recipe_id
         WHERE s.user_id = $1
         GROUP BY i.name, i.measurement_unit
         ORDER BY i.name, i.measurement_unit
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("aggregate shopping list")?;
    Ok(rows)
}
