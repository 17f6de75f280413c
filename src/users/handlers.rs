use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CreatedUser, RegisterRequest, SetPasswordRequest, UpdateProfileRequest, UserProfile},
    repo,
    repo_types::User,
    services,
};
use crate::{
    auth::extractors::{AuthUser, MaybeUser},
    error::{AppError, AppResult},
    pagination::{Page, PageParams},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(register))
        .route("/users/me", get(get_me).patch(patch_me))
        .route("/users/set_password", post(set_password))
        .route("/users/:id", get(get_user))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Query(p): Query<PageParams>,
) -> AppResult<Json<Page<UserProfile>>> {
    let count = repo::count_users(&state.db).await?;
    let rows = repo::list_profiles(&state.db, viewer, p.limit(), p.offset()).await?;
    let results = rows.into_iter().map(UserProfile::from).collect();
    Ok(Json(Page::new("/api/users", p, count, results)))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<CreatedUser>)> {
    let user = services::register(&state.db, payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserProfile>> {
    let profile = repo::get_profile(&state.db, viewer, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".into()))?;
    Ok(Json(profile.into()))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<UserProfile>> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    Ok(Json(UserProfile::own(user)))
}

#[instrument(skip(state, payload))]
pub async fn patch_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<UserProfile>> {
    let user = services::update_profile(&state.db, user_id, payload).await?;
    Ok(Json(UserProfile::own(user)))
}

#[instrument(skip(state, payload))]
pub async fn set_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<SetPasswordRequest>,
) -> AppResult<StatusCode> {
    services::set_password(&state.db, user_id, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}
