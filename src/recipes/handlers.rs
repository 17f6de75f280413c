use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::Query;
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{RecipePayload, RecipeQuery, RecipeRead, RecipeShort},
    filters::RecipeFilter,
    membership::Membership,
    services,
};
use crate::{
    auth::extractors::{AuthUser, MaybeUser},
    error::AppResult,
    pagination::Page,
    shopping_list,
    state::AppState,
};

pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route("/recipes/download_shopping_cart", get(download_shopping_cart))
        .route(
            "/recipes/:id",
            get(get_recipe).patch(update_recipe).delete(delete_recipe),
        )
        .route("/recipes/:id/favorite", post(add_favorite).delete(remove_favorite))
        .route(
            "/recipes/:id/shopping_cart",
            post(add_to_cart).delete(remove_from_cart),
        )
}

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Query(q): Query<RecipeQuery>,
) -> AppResult<Json<Page<RecipeRead>>> {
    let filter = RecipeFilter::from_query(&q, viewer);
    let page = services::list_recipes(&state, viewer, &filter, q.page_params()).await?;
    Ok(Json(page))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RecipeRead>> {
    Ok(Json(services::get_recipe(&state, viewer, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<RecipePayload>,
) -> AppResult<(StatusCode, Json<RecipeRead>)> {
    let recipe = services::create_recipe(&state, user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

#[instrument(skip(state, payload))]
pub async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecipePayload>,
) -> AppResult<Json<RecipeRead>> {
    Ok(Json(services::update_recipe(&state, user_id, id, payload).await?))
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::delete_recipe(&state, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn add_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<RecipeShort>)> {
    let short = Membership::Favorite.add(&state, user_id, id).await?;
    Ok((StatusCode::CREATED, Json(short)))
}

#[instrument(skip(state))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    Membership::Favorite.remove(&state, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<RecipeShort>)> {
    let short = Membership::ShoppingCart.add(&state, user_id, id).await?;
    Ok((StatusCode::CREATED, Json(short)))
}

#[instrument(skip(state))]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    Membership::ShoppingCart.remove(&state, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn download_shopping_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Response> {
    shopping_list::services::download(&state, user_id).await
}
