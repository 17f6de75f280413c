use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::filters::RecipeFilter;
use super::repo_types::{RecipeIngredientRow, RecipeOwner, RecipeRow, RecipeShortRow, RecipeTagRow};

pub struct NewRecipe<'a> {
    pub author_id: Uuid,
    pub name: &'a str,
    pub text: &'a str,
    pub image: &'a str,
    pub cooking_time: i32,
}

#[derive(Debug, Default)]
pub struct RecipeChanges<'a> {
    pub name: Option<&'a str>,
    pub text: Option<&'a str>,
    pub image: Option<&'a str>,
    pub cooking_time: Option<i32>,
}

// ---- Reads ----

pub async fn list(
    db: &PgPool,
    filter: &RecipeFilter,
    viewer: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<RecipeRow>> {
    let rows = filter
        .select(viewer, limit, offset)
        .build_query_as::<RecipeRow>()
        .fetch_all(db)
        .await
        .context("list recipes")?;
    Ok(rows)
}

pub async fn count(db: &PgPool, filter: &RecipeFilter) -> anyhow::Result<i64> {
    let n: i64 = filter
        .count()
        .build_query_scalar::<i64>()
        .fetch_one(db)
        .await
        .context("count recipes")?;
    Ok(n)
}

pub async fn find(db: &PgPool, id: Uuid, viewer: Option<Uuid>) -> anyhow::Result<Option<RecipeRow>> {
    let row = RecipeFilter::by_id(id)
        .select(viewer, 1, 0)
        .build_query_as::<RecipeRow>()
        .fetch_optional(db)
        .await
        .context("find recipe")?;
    Ok(row)
}

pub async fn find_owner(db: &PgPool, id: Uuid) -> anyhow::Result<Option<RecipeOwner>> {
    let row = sqlx::query_as::<_, RecipeOwner>("SELECT id, author_id, image FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find recipe owner")?;
    Ok(row)
}

pub async fn find_short(db: &PgPool, id: Uuid) -> anyhow::Result<Option<RecipeShortRow>> {
    let row = sqlx::query_as::<_, RecipeShortRow>(
        "SELECT id, author_id, name, image, cooking_time FROM recipes WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find short recipe")?;
    Ok(row)
}

pub async fn tags_for(db: &PgPool, recipe_ids: &[Uuid]) -> anyhow::Result<Vec<RecipeTagRow>> {
    let rows = sqlx::query_as::<_, RecipeTagRow>(
        r#"
        SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
          FROM recipe_tags rt
          JOIN tags t ON t.id = rt.tag_id
         WHERE rt.recipe_id = ANY($1)
         ORDER BY t.name
        "#,
    )
    .bind(recipe_ids)
    .fetch_all(db)
    .await
    .context("tags for recipes")?;
    Ok(rows)
}

pub async fn ingredients_for(
    db: &PgPool,
    recipe_ids: &[Uuid],
) -> anyhow::Result<Vec<RecipeIngredientRow>> {
    let rows = sqlx::query_as::<_, RecipeIngredientRow>(
        r#"
        SELECT ir.recipe_id, i.id, i.name, i.measurement_unit, ir.amount
          FROM ingredient_recipes ir
          JOIN ingredients i ON i.id = ir.ingredient_id
         WHERE ir.recipe_id = ANY($1)
         ORDER BY i.name, i.measurement_unit
        "#,
    )
    .bind(recipe_ids)
    .fetch_all(db)
    .await
    .context("ingredients for recipes")?;
    Ok(rows)
}

// ---- Writes (inside a transaction) ----

pub async fn insert_recipe_tx(
    tx: &mut Transaction<'_, Postgres>,
    new: NewRecipe<'_>,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO recipes (author_id, name, text, image, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(new.author_id)
    .bind(new.name)
    .bind(new.text)
    .bind(new.image)
    .bind(new.cooking_time)
    .fetch_one(&mut **tx)
    .await
    .context("insert recipe")?;
    Ok(id)
}

pub async fn update_recipe_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    changes: RecipeChanges<'_>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE recipes
           SET name         = COALESCE($2, name),
               text         = COALESCE($3, text),
               image        = COALESCE($4, image),
               cooking_time = COALESCE($5, cooking_time)
         WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(changes.name)
    .bind(changes.text)
    .bind(changes.image)
    .bind(changes.cooking_time)
    .execute(&mut **tx)
    .await
    .context("update recipe")?;
    Ok(())
}

/// Replaces the recipe's tag set.
pub async fn set_tags_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    tag_ids: &[Uuid],
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await
        .context("clear recipe tags")?;
    sqlx::query(
        r#"
        INSERT INTO recipe_tags (recipe_id, tag_id)
        SELECT $1, tag_id FROM UNNEST($2::uuid[]) AS t(tag_id)
        "#,
    )
    .bind(recipe_id)
    .bind(tag_ids)
    .execute(&mut **tx)
    .await
    .context("insert recipe tags")?;
    Ok(())
}

/// Deletes every ingredient row of the recipe and bulk-inserts `items`.
pub async fn set_ingredients_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    items: &[(Uuid, i32)],
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM ingredient_recipes WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await
        .context("clear recipe ingredients")?;

    let (ids, amounts): (Vec<Uuid>, Vec<i32>) = items.iter().copied().unzip();
    sqlx::query(
        r#"
        INSERT INTO ingredient_recipes (recipe_id, ingredient_id, amount)
        SELECT $1, ingredient_id, amount
          FROM UNNEST($2::uuid[], $3::int4[]) AS i(ingredient_id, amount)
        "#,
    )
    .bind(recipe_id)
    .bind(&ids)
    .bind(&amounts)
    .execute(&mut **tx)
    .await
    .context("insert recipe ingredients")?;
    Ok(())
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let done = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete recipe")?;
    Ok(done.rows_affected() > 0)
}

// ---- Author summaries ----

/// Newest recipes per author, at most `per_author` each when given.
pub async fn short_by_authors(
    db: &PgPool,
    author_ids: &[Uuid],
    per_author: Option<i64>,
) -> anyhow::Result<Vec<RecipeShortRow>> {
    let rows = sqlx::query_as::<_, RecipeShortRow>(
        r#"
        SELECT id, author_id, name, image, cooking_time
          FROM (
              SELECT r.id, r.author_id, r.name, r.image, r.cooking_time, r.created_at,
                     ROW_NUMBER() OVER (PARTITION BY r.author_id ORDER BY r.created_at DESC, r.id) AS rn
                FROM recipes r
               WHERE r.author_id = ANY($1)
          ) ranked
         WHERE $2::int8 IS NULL OR rn <= $2
         ORDER BY author_id, rn
        "#,
    )
    .bind(author_ids)
    .bind(per_author)
    .fetch_all(db)
    .await
    .context("recipes by authors")?;
    Ok(rows)
}

pub async fn counts_by_authors(db: &PgPool, author_ids: &[Uuid]) -> anyhow::Result<Vec<(Uuid, i64)>> {
    let rows: Vec<(Uuid, i64)> = sqlx::query_as(
        r#"
        SELECT author_id, COUNT(*)
          FROM recipes
         WHERE author_id = ANY($1)
         GROUP BY author_id
        "#,
    )
    .bind(author_ids)
    .fetch_all(db)
    .await
    .context("recipe counts by authors")?;
    Ok(rows)
}
