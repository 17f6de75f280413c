use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{SubscribeQuery, SubscriptionView, SubscriptionsQuery},
    services,
};
use crate::{auth::extractors::AuthUser, error::AppResult, pagination::Page, state::AppState};

pub fn subscription_routes() -> Router<AppState> {
    Router::new()
        .route("/users/subscriptions", get(list_subscriptions))
        .route("/users/:id/subscribe", post(subscribe).delete(unsubscribe))
}

#[instrument(skip(state))]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<SubscriptionsQuery>,
) -> AppResult<Json<Page<SubscriptionView>>> {
    let recipes_limit = services::parse_recipes_limit(q.recipes_limit.as_deref())?;
    let page = services::list_subscriptions(&state, user_id, q.page_params(), recipes_limit).await?;
    Ok(Json(page))
}

#[instrument(skip(state))]
pub async fn subscribe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(author_id): Path<Uuid>,
    Query(q): Query<SubscribeQuery>,
) -> AppResult<(StatusCode, Json<SubscriptionView>)> {
    let recipes_limit = services::parse_recipes_limit(q.recipes_limit.as_deref())?;
    let view = services::subscribe(&state, user_id, author_id, recipes_limit).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[instrument(skip(state))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(author_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::unsubscribe(&state, user_id, author_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
