use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Recipe row with the viewer's favorite/cart flags already resolved.
#[derive(Debug, Clone, FromRow)]
pub struct RecipeRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub text: String,
    pub image: String, // object-store key
    pub cooking_time: i32,
    pub created_at: OffsetDateTime,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct RecipeTagRow {
    pub recipe_id: Uuid,
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct RecipeIngredientRow {
    pub recipe_id: Uuid,
    pub id: Uuid, // ingredient id
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct RecipeShortRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

/// Columns needed for permission checks and image cleanup.
#[derive(Debug, Clone, FromRow)]
pub struct RecipeOwner {
    pub id: Uuid,
    pub author_id: Uuid,
    pub image: String,
}
