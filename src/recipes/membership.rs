use anyhow::Context;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::dto::RecipeShort;
use super::repo;
use super::services;
use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

/// Per-user recipe lists sharing the `(user_id, recipe_id)` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Favorite,
    ShoppingCart,
}

impl Membership {
    fn table(self) -> &'static str {
        match self {
            Membership::Favorite => "favorites",
            Membership::ShoppingCart => "shopping_lists",
        }
    }

    fn insert_sql(self) -> String {
        format!(
            "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, recipe_id) DO NOTHING",
            self.table()
        )
    }

    fn delete_sql(self) -> String {
        format!(
            "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
            self.table()
        )
    }

    /// Returns false when the pair already existed.
    async fn insert(self, db: &PgPool, user_id: Uuid, recipe_id: Uuid) -> anyhow::Result<bool> {
        let done = sqlx::query(&self.insert_sql())
            .bind(user_id)
            .bind(recipe_id)
            .execute(db)
            .await
            .with_context(|| format!("insert into {}", self.table()))?;
        Ok(done.rows_affected() > 0)
    }

    async fn delete(self, db: &PgPool, user_id: Uuid, recipe_id: Uuid) -> anyhow::Result<bool> {
        let done = sqlx::query(&self.delete_sql())
            .bind(user_id)
            .bind(recipe_id)
            .execute(db)
            .await
            .with_context(|| format!("delete from {}", self.table()))?;
        Ok(done.rows_affected() > 0)
    }

    pub async fn add(self, st: &AppState, user_id: Uuid, recipe_id: Uuid) -> AppResult<RecipeShort> {
        let recipe = repo::find_short(&st.db, recipe_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Recipe not found.".into()))?;
        if !self.insert(&st.db, user_id, recipe_id).await? {
            return Err(AppError::Conflict("Recipe is already added.".into()));
        }
        info!(list = self.table(), user_id = %user_id, recipe_id = %recipe_id, "recipe added");
        Ok(services::short(st, recipe).await?)
    }

    pub async fn remove(self, st: &AppState, user_id: Uuid, recipe_id: Uuid) -> AppResult<()> {
        if repo::find_owner(&st.db, recipe_id).await?.is_none() {
            return Err(AppError::NotFound("Recipe not found.".into()));
        }
        if !self.delete(&st.db, user_id, recipe_id).await? {
            return Err(AppError::Conflict("Recipe is already removed.".into()));
        }
        info!(list = self.table(), user_id = %user_id, recipe_id = %recipe_id, "recipe removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn each_list_targets_its_own_table() {
        assert!(Membership::Favorite.insert_sql().starts_with("INSERT INTO favorites "));
        assert!(Membership::ShoppingCart
            .delete_sql()
            .starts_with("DELETE FROM shopping_lists "));
    }

    #[tokio::test]
    async fn second_favorite_conflicts() {
        let Some(st) = testing::state().await else { return };
        let author = testing::user(&st).await.unwrap();
        let fan = testing::user(&st).await.unwrap();
        let salt = testing::ingredient(&st, &testing::unique("соль"), "г").await.unwrap();
        let recipe = testing::recipe(&st, author.id, &[(salt, 5)]).await.unwrap();

        let short = Membership::Favorite.add(&st, fan.id, recipe).await.unwrap();
        assert_eq!(short.id, recipe);
        let again = Membership::Favorite.add(&st, fan.id, recipe).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));

        // the cart is a separate list
        assert!(Membership::ShoppingCart.add(&st, fan.id, recipe).await.is_ok());
    }

    #[tokio::test]
    async fn removing_absent_membership_conflicts() {
        let Some(st) = testing::state().await else { return };
        let author = testing::user(&st).await.unwrap();
        let fan = testing::user(&st).await.unwrap();
        let salt = testing::ingredient(&st, &testing::unique("соль"), "г").await.unwrap();
        let recipe = testing::recipe(&st, author.id, &[(salt, 5)]).await.unwrap();

        let never = Membership::Favorite.remove(&st, fan.id, recipe).await;
        assert!(matches!(never, Err(AppError::Conflict(_))));

        Membership::Favorite.add(&st, fan.id, recipe).await.unwrap();
        Membership::Favorite.remove(&st, fan.id, recipe).await.unwrap();
        let twice = Membership::Favorite.remove(&st, fan.id, recipe).await;
        assert!(matches!(twice, Err(AppError::Conflict(_))));

        let missing = Membership::Favorite.remove(&st, fan.id, Uuid::new_v4()).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[test]
    fn duplicate_insert_is_a_no_op() {
        let sql = Membership::ShoppingCart.insert_sql();
        assert!(sql.ends_with("ON CONFLICT (user_id, recipe_id) DO NOTHING"));
    }
}
