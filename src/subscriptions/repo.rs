use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use crate::users::repo_types::ProfileRow;

/// Returns false when the subscription already existed.
pub async fn insert(db: &PgPool, user_id: Uuid, author_id: Uuid) -> anyhow::Result<bool> {
    let done = sqlx::query(
        r#"
        INSERT INTO subscriptions (user_id, author_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, author_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(author_id)
    .execute(db)
    .await
    .context("insert subscription")?;
    Ok(done.rows_affected() > 0)
}

pub async fn delete(db: &PgPool, user_id: Uuid, author_id: Uuid) -> anyhow::Result<bool> {
    let done = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(db)
        .await
        .context("delete subscription")?;
    Ok(done.rows_affected() > 0)
}

pub async fn count_followed(db: &PgPool, user_id: Uuid) -> anyhow::Result<i64> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(db)
        .await
        .context("count subscriptions")?;
    Ok(n)
}

/// Authors `user_id` follows, most recently followed first.
pub async fn list_followed(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<ProfileRow>> {
    let rows = sqlx::query_as::<_, ProfileRow>(
        r#"
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
               TRUE AS is_subscribed
          FROM subscriptions s
          JOIN users u ON u.id = s.author_id
         WHERE s.user_id = $1
         ORDER BY s.created_at DESC, u.id
         LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list subscriptions")?;
    Ok(rows)
}
