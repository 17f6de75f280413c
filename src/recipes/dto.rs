use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{pagination::PageParams, tags::repo::Tag, users::dto::UserProfile};

/// `GET /recipes` query string; `tags` may repeat.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub author: Option<Uuid>,
    pub is_favorited: Option<String>,
    pub is_in_shopping_cart: Option<String>,
}

impl RecipeQuery {
    pub fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }
}

/// Write payload for create and update. Every field is optional here so that
/// missing values surface as field errors instead of a body rejection.
#[derive(Debug, Default, Deserialize)]
pub struct RecipePayload {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
    pub image: Option<String>,
    pub tags: Option<Vec<Uuid>>,
    pub ingredients: Option<Vec<IngredientAmountPayload>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientAmountPayload {
    pub id: Option<Uuid>,
    pub amount: Option<i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Read model shared by list, detail, create and update responses.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeRead {
    pub id: Uuid,
    pub tags: Vec<Tag>,
    pub author: UserProfile,
    pub ingredients: Vec<IngredientAmount>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RecipeShort {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}
