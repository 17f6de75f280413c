use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{ProfileRow, User};

const USER_COLUMNS: &str =
    "id, email, username, first_name, last_name, password_hash, is_staff, created_at";

/// Profile columns plus `is_subscribed` relative to the viewer bound as `$1`.
const PROFILE_SELECT: &str = r#"
    SELECT u.id, u.email, u.username, u.first_name, u.last_name,
           EXISTS (
               SELECT 1 FROM subscriptions s
                WHERE s.user_id = $1 AND s.author_id = u.id
           ) AS is_subscribed
      FROM users u
"#;

pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password_hash: &'a str,
}

#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    pub async fn exists(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let found: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(db)
            .await
            .context("user exists")?;
        Ok(found)
    }

    /// Returns which of `email`/`username` are already taken by someone other than `except`.
    pub async fn taken_fields(
        db: &PgPool,
        email: Option<&str>,
        username: Option<&str>,
        except: Option<Uuid>,
    ) -> anyhow::Result<(bool, bool)> {
        let row: (bool, bool) = sqlx::query_as(
            r#"
            SELECT
                EXISTS (SELECT 1 FROM users WHERE email = $1 AND id IS DISTINCT FROM $3),
                EXISTS (SELECT 1 FROM users WHERE username = $2 AND id IS DISTINCT FROM $3)
            "#,
        )
        .bind(email)
        .bind(username)
        .bind(except)
        .fetch_one(db)
        .await
        .context("check taken email/username")?;
        Ok(row)
    }

    /// Create a new user with hashed password.
    pub async fn create(db: &PgPool, new: NewUser<'_>) -> Result<User, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, username, first_name, last_name, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(new.email)
        .bind(new.username)
        .bind(new.first_name)
        .bind(new.last_name)
        .bind(new.password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<User, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET email      = COALESCE($2, email),
                   username   = COALESCE($3, username),
                   first_name = COALESCE($4, first_name),
                   last_name  = COALESCE($5, last_name)
             WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(id)
        .bind(changes.email)
        .bind(changes.username)
        .bind(changes.first_name)
        .bind(changes.last_name)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn set_password_hash(db: &PgPool, id: Uuid, hash: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(hash)
            .execute(db)
            .await
            .context("update password hash")?;
        Ok(())
    }
}

// ---- Profiles ----

pub async fn count_users(db: &PgPool) -> anyhow::Result<i64> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(db)
        .await
        .context("count users")?;
    Ok(n)
}

pub async fn list_profiles(
    db: &PgPool,
    viewer: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<ProfileRow>> {
    let rows = sqlx::query_as::<_, ProfileRow>(&format!(
        "{} ORDER BY u.created_at DESC, u.id LIMIT $2 OFFSET $3",
        PROFILE_SELECT
    ))
    .bind(viewer)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list profiles")?;
    Ok(rows)
}

pub async fn get_profile(
    db: &PgPool,
    viewer: Option<Uuid>,
    id: Uuid,
) -> anyhow::Result<Option<ProfileRow>> {
    let row = sqlx::query_as::<_, ProfileRow>(&format!("{} WHERE u.id = $2", PROFILE_SELECT))
        .bind(viewer)
        .bind(id)
        .fetch_optional(db)
        .await
        .context("get profile")?;
    Ok(row)
}

pub async fn profiles_by_ids(
    db: &PgPool,
    viewer: Option<Uuid>,
    ids: &[Uuid],
) -> anyhow::Result<Vec<ProfileRow>> {
    let rows = sqlx::query_as::<_, ProfileRow>(&format!(
        "{} WHERE u.id = ANY($2)",
        PROFILE_SELECT
    ))
    .bind(viewer)
    .bind(ids)
    .fetch_all(db)
    .await
    .context("profiles by ids")?;
    Ok(rows)
}
