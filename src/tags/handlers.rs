use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::repo::{self, Tag};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

pub fn tag_routes() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list_tags))
        .route("/tags/:id", get(get_tag))
}

#[instrument(skip(state))]
pub async fn list_tags(State(state): State<AppState>) -> AppResult<Json<Vec<Tag>>> {
    Ok(Json(repo::list(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn get_tag(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Tag>> {
    repo::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Tag not found.".into()))
}
