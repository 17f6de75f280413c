use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use super::repo::{self, Ingredient};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct IngredientQuery {
    pub name: Option<String>,
}

pub fn ingredient_routes() -> Router<AppState> {
    Router::new()
        .route("/ingredients", get(list_ingredients))
        .route("/ingredients/:id", get(get_ingredient))
}

#[instrument(skip(state))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    Query(q): Query<IngredientQuery>,
) -> AppResult<Json<Vec<Ingredient>>> {
    Ok(Json(repo::list(&state.db, q.name.as_deref()).await?))
}

#[instrument(skip(state))]
pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Ingredient>> {
    repo::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Ingredient not found.".into()))
}
