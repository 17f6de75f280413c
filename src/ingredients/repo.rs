use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

/// Case-insensitive "contains" pattern for ILIKE, with LIKE metacharacters escaped.
pub fn contains_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

pub async fn list(db: &PgPool, name: Option<&str>) -> anyhow::Result<Vec<Ingredient>> {
    let pattern = name.map(str::trim).filter(|n| !n.is_empty()).map(contains_pattern);
    let rows = sqlx::query_as::<_, Ingredient>(
        r#"
        SELECT id, name, measurement_unit
          FROM ingredients
         WHERE $1::text IS NULL OR name ILIKE $1
         ORDER BY name, measurement_unit
        "#,
    )
    .bind(pattern)
    .fetch_all(db)
    .await
    .context("list ingredients")?;
    Ok(rows)
}

pub async fn get(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Ingredient>> {
    let row = sqlx::query_as::<_, Ingredient>(
        "SELECT id, name, measurement_unit FROM ingredients WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("get ingredient")?;
    Ok(row)
}

/// Ids from `ids` that have no ingredient row.
pub async fn missing_ids(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<Vec<Uuid>> {
    let rows: Vec<Uuid> = sqlx::query_scalar(
        r#"
        SELECT wanted.id
          FROM UNNEST($1::uuid[]) AS wanted(id)
         WHERE NOT EXISTS (SELECT 1 FROM ingredients i WHERE i.id = wanted.id)
        "#,
    )
    .bind(ids)
    .fetch_all(db)
    .await
    .context("check ingredient ids")?;
    Ok(rows)
}

pub async fn count(db: &PgPool) -> anyhow::Result<i64> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ingredients")
        .fetch_one(db)
        .await
        .context("count ingredients")?;
    Ok(n)
}

pub async fn insert_many(db: &PgPool, rows: &[(String, String)]) -> anyhow::Result<u64> {
    let (names, units): (Vec<&str>, Vec<&str>) =
        rows.iter().map(|(n, u)| (n.as_str(), u.as_str())).unzip();
    let done = sqlx::query(
        r#"
        INSERT INTO ingredients (name, measurement_unit)
        SELECT * FROM UNNEST($1::varchar[], $2::varchar[])
        "#,
    )
    .bind(&names)
    .bind(&units)
    .execute(db)
    .await
    .context("bulk insert ingredients")?;
    Ok(done.rows_affected())
}
