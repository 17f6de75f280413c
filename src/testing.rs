//! Fixtures for tests that need a real Postgres. They run only when
//! `DATABASE_URL` is set; otherwise `state()` returns `None` and the test
//! returns early.

use anyhow::Context;
use uuid::Uuid;

use crate::{
    recipes::repo::{self as recipes_repo, NewRecipe},
    state::AppState,
    users::{repo::NewUser, repo_types::User},
};

pub async fn state() -> Option<AppState> {
    dotenvy::dotenv().ok();
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping database test");
        return None;
    };
    let db = sqlx::postgres::PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("connect to test database");
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("run migrations");
    Some(AppState::fake_with_pool(db))
}

/// Unique per call, so tests can share one database.
pub fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

pub async fn user(st: &AppState) -> anyhow::Result<User> {
    let name = unique("cook");
    let user = User::create(
        &st.db,
        NewUser {
            email: &format!("{}@example.com", name),
            username: &name,
            first_name: "Test",
            last_name: "Cook",
            password_hash: "not-a-real-hash",
        },
    )
    .await?;
    Ok(user)
}

pub async fn ingredient(st: &AppState, name: &str, unit: &str) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(unit)
    .fetch_one(&st.db)
    .await
    .context("insert test ingredient")?;
    Ok(id)
}

/// Id of a tag seeded by the migrations.
pub async fn seeded_tag(st: &AppState) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query_scalar("SELECT id FROM tags WHERE slug = 'breakfast'")
        .fetch_one(&st.db)
        .await
        .context("seeded tag")?;
    Ok(id)
}

pub async fn recipe(st: &AppState, author_id: Uuid, items: &[(Uuid, i32)]) -> anyhow::Result<Uuid> {
    let tag = seeded_tag(st).await?;
    let mut tx = st.db.begin().await?;
    let id = recipes_repo::insert_recipe_tx(
        &mut tx,
        NewRecipe {
            author_id,
            name: "Тестовый рецепт",
            text: "Смешать.",
            image: "recipes/test/image.png",
            cooking_time: 10,
        },
    )
    .await?;
    recipes_repo::set_tags_tx(&mut tx, id, &[tag]).await?;
    recipes_repo::set_ingredients_tx(&mut tx, id, items).await?;
    tx.commit().await?;
    Ok(id)
}
