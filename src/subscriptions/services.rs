use std::collections::HashMap;

use tracing::info;
use uuid::Uuid;

use super::dto::SubscriptionView;
use super::repo;
use crate::{
    error::{AppError, AppResult},
    pagination::{Page, PageParams},
    recipes::{self, dto::RecipeShort},
    state::AppState,
    users::{dto::UserProfile, repo_types::User},
};

/// `None` means no cap. Anything but a non-negative integer is rejected.
pub fn parse_recipes_limit(raw: Option<&str>) -> AppResult<Option<i64>> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };
    match raw.parse::<i64>() {
        Ok(n) if n >= 0 => Ok(Some(n)),
        _ => Err(AppError::field(
            "recipes_limit",
            "A valid non-negative integer is required.",
        )),
    }
}

/// Attaches capped recipe lists and counts to each author profile.
async fn project(
    st: &AppState,
    authors: Vec<UserProfile>,
    recipes_limit: Option<i64>,
) -> AppResult<Vec<SubscriptionView>> {
    let ids: Vec<Uuid> = authors.iter().map(|a| a.id).collect();
    let rows = recipes::repo::short_by_authors(&st.db, &ids, recipes_limit).await?;
    let counts: HashMap<Uuid, i64> = recipes::repo::counts_by_authors(&st.db, &ids)
        .await?
        .into_iter()
        .collect();

    let mut by_author: HashMap<Uuid, Vec<RecipeShort>> = HashMap::new();
    for row in rows {
        let author_id = row.author_id;
        let short = recipes::services::short(st, row).await?;
        by_author.entry(author_id).or_default().push(short);
    }

    Ok(authors
        .into_iter()
        .map(|author| SubscriptionView {
            recipes: by_author.remove(&author.id).unwrap_or_default(),
            recipes_count: counts.get(&author.id).copied().unwrap_or(0),
            author,
        })
        .collect())
}

pub async fn list_subscriptions(
    st: &AppState,
    user_id: Uuid,
    page: PageParams,
    recipes_limit: Option<i64>,
) -> AppResult<Page<SubscriptionView>> {
    let count = repo::count_followed(&st.db, user_id).await?;
    let authors = repo::list_followed(&st.db, user_id, page.limit(), page.offset())
        .await?
        .into_iter()
        .map(UserProfile::from)
        .collect();
    let results = project(st, authors, recipes_limit).await?;
    Ok(Page::new("/api/users/subscriptions", page, count, results))
}

async fn load_author(st: &AppState, author_id: Uuid) -> AppResult<User> {
    User::find_by_id(&st.db, author_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".into()))
}

pub async fn subscribe(
    st: &AppState,
    user_id: Uuid,
    author_id: Uuid,
    recipes_limit: Option<i64>,
) -> AppResult<SubscriptionView> {
    let author = load_author(st, author_id).await?;
    if author.id == user_id {
        return Err(AppError::field(
            "non_field_errors",
            "You cannot subscribe to yourself.",
        ));
    }
    if !repo::insert(&st.db, user_id, author_id).await? {
        return Err(AppError::field(
            "non_field_errors",
            "You are already subscribed to this author.",
        ));
    }
    info!(user_id = %user_id, author_id = %author_id, "subscribed");

    let mut profile = UserProfile::own(author);
    profile.is_subscribed = true;
    project(st, vec![profile], recipes_limit)
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound("User not found.".into()))
}

pub async fn unsubscribe(st: &AppState, user_id: Uuid, author_id: Uuid) -> AppResult<()> {
    load_author(st, author_id).await?;
    if !repo::delete(&st.db, user_id, author_id).await? {
        return Err(AppError::BadRequest("There is no active subscription.".into()));
    }
    info!(user_id = %user_id, author_id = %author_id, "unsubscribed");
    Ok(())
}
