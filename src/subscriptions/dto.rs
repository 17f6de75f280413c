use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{pagination::PageParams, recipes::dto::RecipeShort, users::dto::UserProfile};

/// Query for `GET /users/subscriptions`. `recipes_limit` stays raw so a
/// malformed value becomes a field error instead of a query rejection.
#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub recipes_limit: Option<String>,
}

impl SubscriptionsQuery {
    pub fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscribeQuery {
    pub recipes_limit: Option<String>,
}

/// Author profile with their newest recipes.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub author: UserProfile,
    pub recipes: Vec<RecipeShort>,
    pub recipes_count: i64,
}
