use std::collections::HashMap;

use anyhow::Context;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{IngredientAmount, RecipePayload, RecipeRead, RecipeShort};
use super::filters::RecipeFilter;
use super::repo::{self, NewRecipe, RecipeChanges};
use super::repo_types::{RecipeIngredientRow, RecipeOwner, RecipeRow, RecipeShortRow, RecipeTagRow};
use super::validation::{self, Mode, RecipeDraft};
use crate::{
    error::{AppError, AppResult, FieldErrors},
    images::services as images,
    ingredients, tags,
    pagination::{Page, PageParams},
    state::AppState,
    tags::repo::Tag,
    users::{self, dto::UserProfile, repo_types::User},
};

// ---- Read-model projection ----

/// Joins recipe rows with their tags, ingredients, author profiles and image
/// URLs. Rows whose author profile is missing are dropped.
pub fn assemble(
    rows: Vec<RecipeRow>,
    tag_rows: Vec<RecipeTagRow>,
    ingredient_rows: Vec<RecipeIngredientRow>,
    authors: Vec<UserProfile>,
    image_urls: Vec<String>,
) -> Vec<RecipeRead> {
    let mut tags_by_recipe: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    for t in tag_rows {
        tags_by_recipe.entry(t.recipe_id).or_default().push(Tag {
            id: t.id,
            name: t.name,
            color: t.color,
            slug: t.slug,
        });
    }

    let mut ingredients_by_recipe: HashMap<Uuid, Vec<IngredientAmount>> = HashMap::new();
    for i in ingredient_rows {
        ingredients_by_recipe
            .entry(i.recipe_id)
            .or_default()
            .push(IngredientAmount {
                id: i.id,
                name: i.name,
                measurement_unit: i.measurement_unit,
                amount: i.amount,
            });
    }

    let authors: HashMap<Uuid, UserProfile> = authors.into_iter().map(|a| (a.id, a)).collect();

    rows.into_iter()
        .zip(image_urls)
        .filter_map(|(r, image)| {
            let author = authors.get(&r.author_id)?.clone();
            Some(RecipeRead {
                id: r.id,
                tags: tags_by_recipe.remove(&r.id).unwrap_or_default(),
                author,
                ingredients: ingredients_by_recipe.remove(&r.id).unwrap_or_default(),
                is_favorited: r.is_favorited,
                is_in_shopping_cart: r.is_in_shopping_cart,
                name: r.name,
                image,
                text: r.text,
                cooking_time: r.cooking_time,
            })
        })
        .collect()
}

/// Read-model projection used after every write and by list/detail.
pub async fn project_recipes(
    st: &AppState,
    viewer: Option<Uuid>,
    rows: Vec<RecipeRow>,
) -> anyhow::Result<Vec<RecipeRead>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let mut author_ids: Vec<Uuid> = rows.iter().map(|r| r.author_id).collect();
    author_ids.sort();
    author_ids.dedup();
    let keys: Vec<String> = rows.iter().map(|r| r.image.clone()).collect();

    let tag_rows = repo::tags_for(&st.db, &ids).await?;
    let ingredient_rows = repo::ingredients_for(&st.db, &ids).await?;
    let authors = users::repo::profiles_by_ids(&st.db, viewer, &author_ids)
        .await?
        .into_iter()
        .map(UserProfile::from)
        .collect();
    let urls = images::presign_many(st, &keys).await?;

    Ok(assemble(rows, tag_rows, ingredient_rows, authors, urls))
}

pub async fn short(st: &AppState, row: RecipeShortRow) -> anyhow::Result<RecipeShort> {
    Ok(RecipeShort {
        id: row.id,
        name: row.name,
        image: images::image_url(st, &row.image).await?,
        cooking_time: row.cooking_time,
    })
}

/// Every `tags` slug in a listing query must name an existing tag.
pub fn reject_unknown_tags(missing: &[String]) -> AppResult<()> {
    let mut errs = FieldErrors::new();
    for slug in missing {
        errs.add(
            "tags",
            format!("Select a valid choice. {} is not one of the available choices.", slug),
        );
    }
    errs.into_result()
}

pub async fn list_recipes(
    st: &AppState,
    viewer: Option<Uuid>,
    filter: &RecipeFilter,
    page: PageParams,
) -> AppResult<Page<RecipeRead>> {
    if !filter.tags.is_empty() {
        let missing = tags::repo::missing_slugs(&st.db, &filter.tags).await?;
        reject_unknown_tags(&missing)?;
    }
    let count = repo::count(&st.db, filter).await?;
    let rows = repo::list(&st.db, filter, viewer, page.limit(), page.offset()).await?;
    let results = project_recipes(st, viewer, rows).await?;
    Ok(Page::new("/api/recipes", page, count, results))
}

pub async fn get_recipe(st: &AppState, viewer: Option<Uuid>, id: Uuid) -> AppResult<RecipeRead> {
    let row = repo::find(&st.db, id, viewer)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe not found.".into()))?;
    project_recipes(st, viewer, vec![row])
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound("Recipe not found.".into()))
}

// ---- Writes ----

/// Tag and ingredient ids must reference existing rows.
async fn ensure_references(db: &PgPool, draft: &RecipeDraft) -> AppResult<()> {
    let mut errs = FieldErrors::new();
    for id in tags::repo::missing_ids(db, &draft.tags).await? {
        errs.add("tags", format!("Invalid pk \"{}\" - object does not exist.", id));
    }
    let ingredient_ids: Vec<Uuid> = draft.ingredients.iter().map(|(id, _)| *id).collect();
    for id in ingredients::repo::missing_ids(db, &ingredient_ids).await? {
        errs.add("ingredients", format!("Invalid pk \"{}\" - object does not exist.", id));
    }
    errs.into_result()
}

/// Only the author or a staff user may change a recipe.
pub async fn ensure_can_modify(db: &PgPool, user_id: Uuid, owner: &RecipeOwner) -> AppResult<()> {
    if owner.author_id == user_id {
        return Ok(());
    }
    let is_staff = User::find_by_id(db, user_id)
        .await?
        .map(|u| u.is_staff)
        .unwrap_or(false);
    if is_staff {
        return Ok(());
    }
    warn!(user_id = %user_id, recipe_id = %owner.id, "recipe change by non-author");
    Err(AppError::Forbidden(
        "You do not have permission to perform this action.".into(),
    ))
}

async fn load_owner(db: &PgPool, id: Uuid) -> AppResult<RecipeOwner> {
    repo::find_owner(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe not found.".into()))
}

pub async fn create_recipe(
    st: &AppState,
    author_id: Uuid,
    payload: RecipePayload,
) -> AppResult<RecipeRead> {
    let mut draft = validation::validate(payload, Mode::Create)?;
    ensure_references(&st.db, &draft).await?;

    let image = draft
        .image
        .take()
        .ok_or_else(|| AppError::field("image", "This field is required."))?;
    let key = images::upload_recipe_image(st, author_id, image).await?;

    let stored = async {
        let mut tx = st.db.begin().await.context("begin tx")?;
        let id = repo::insert_recipe_tx(
            &mut tx,
            NewRecipe {
                author_id,
                name: draft.name.as_deref().unwrap_or_default(),
                text: draft.text.as_deref().unwrap_or_default(),
                image: &key,
                cooking_time: draft.cooking_time.unwrap_or(1),
            },
        )
        .await?;
        repo::set_tags_tx(&mut tx, id, &draft.tags).await?;
        repo::set_ingredients_tx(&mut tx, id, &draft.ingredients).await?;
        tx.commit().await.context("commit tx")?;
        anyhow::Ok(id)
    }
    .await;

    let id = match stored {
        Ok(id) => id,
        Err(e) => {
            images::discard(st, &key).await;
            return Err(e.into());
        }
    };

    info!(recipe_id = %id, author_id = %author_id, "recipe created");
    get_recipe(st, Some(author_id), id).await
}

pub async fn update_recipe(
    st: &AppState,
    user_id: Uuid,
    id: Uuid,
    payload: RecipePayload,
) -> AppResult<RecipeRead> {
    let owner = load_owner(&st.db, id).await?;
    ensure_can_modify(&st.db, user_id, &owner).await?;

    let mut draft = validation::validate(payload, Mode::Update)?;
    ensure_references(&st.db, &draft).await?;

    let new_key = match draft.image.take() {
        Some(img) => Some(images::upload_recipe_image(st, owner.author_id, img).await?),
        None => None,
    };

    let stored = async {
        let mut tx = st.db.begin().await.context("begin tx")?;
        repo::update_recipe_tx(
            &mut tx,
            id,
            RecipeChanges {
                name: draft.name.as_deref(),
                text: draft.text.as_deref(),
                image: new_key.as_deref(),
                cooking_time: draft.cooking_time,
            },
        )
        .await?;
        repo::set_tags_tx(&mut tx, id, &draft.tags).await?;
        repo::set_ingredients_tx(&mut tx, id, &draft.ingredients).await?;
        tx.commit().await.context("commit tx")?;
        anyhow::Ok(())
    }
    .await;

    match (stored, new_key) {
        (Ok(()), Some(_)) => images::discard(st, &owner.image).await,
        (Ok(()), None) => {}
        (Err(e), key) => {
            if let Some(key) = key {
                images::discard(st, &key).await;
            }
            return Err(e.into());
        }
    }

    info!(recipe_id = %id, user_id = %user_id, "recipe updated");
    get_recipe(st, Some(user_id), id).await
}

pub async fn delete_recipe(st: &AppState, user_id: Uuid, id: Uuid) -> AppResult<()> {
    let owner = load_owner(&st.db, id).await?;
    ensure_can_modify(&st.db, user_id, &owner).await?;

    if !repo::delete(&st.db, id).await? {
        return Err(AppError::NotFound("Recipe not found.".into()));
    }
    images::discard(st, &owner.image).await;
    info!(recipe_id = %id, user_id = %user_id, "recipe deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use time::OffsetDateTime;

    fn row(id: Uuid, author_id: Uuid, fav: bool) -> RecipeRow {
        RecipeRow {
            id,
            author_id,
            name: "Омлет".into(),
            text: "Взбить и пожарить".into(),
            image: format!("recipes/{}/img.jpg", author_id),
            cooking_time: 10,
            created_at: OffsetDateTime::now_utc(),
            is_favorited: fav,
            is_in_shopping_cart: false,
        }
    }

    fn profile(id: Uuid) -> UserProfile {
        UserProfile {
            email: "chef@example.com".into(),
            id,
            username: "chef".into(),
            first_name: "Chef".into(),
            last_name: "Cook".into(),
            is_subscribed: true,
        }
    }

    #[test]
    fn assemble_groups_children_per_recipe() {
        let author = Uuid::new_v4();
        let (r1, r2) = (Uuid::new_v4(), Uuid::new_v4());
        let egg = Uuid::new_v4();
        let tag_rows = vec![RecipeTagRow {
            recipe_id: r1,
            id: Uuid::new_v4(),
            name: "Завтрак".into(),
            color: "#ff0000".into(),
            slug: "breakfast".into(),
        }];
        let ingredient_rows = vec![
            RecipeIngredientRow {
                recipe_id: r2,
                id: egg,
                name: "яйцо".into(),
                measurement_unit: "шт".into(),
                amount: 3,
            },
            RecipeIngredientRow {
                recipe_id: r1,
                id: egg,
                name: "яйцо".into(),
                measurement_unit: "шт".into(),
                amount: 2,
            },
        ];

        let out = assemble(
            vec![row(r1, author, true), row(r2, author, false)],
            tag_rows,
            ingredient_rows,
            vec![profile(author)],
            vec!["https://img/1".into(), "https://img/2".into()],
        );

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, r1);
        assert_eq!(out[0].tags.len(), 1);
        assert_eq!(out[0].ingredients[0].amount, 2);
        assert_eq!(out[0].image, "https://img/1");
        assert!(out[0].is_favorited);
        assert!(out[1].tags.is_empty());
        assert_eq!(out[1].ingredients[0].amount, 3);
        assert!(out[1].author.is_subscribed);
    }

    #[test]
    fn read_model_has_expected_shape() {
        let author = Uuid::new_v4();
        let out = assemble(
            vec![row(Uuid::new_v4(), author, false)],
            vec![],
            vec![],
            vec![profile(author)],
            vec!["https://img".into()],
        );
        let json = serde_json::to_value(&out[0]).unwrap();
        for key in [
            "id",
            "tags",
            "author",
            "ingredients",
            "is_favorited",
            "is_in_shopping_cart",
            "name",
            "image",
            "text",
            "cooking_time",
        ] {
            assert!(json.get(key).is_some(), "{}", key);
        }
        assert_eq!(json["author"]["username"], "chef");
    }

    #[test]
    fn unknown_slugs_are_field_errors() {
        assert!(reject_unknown_tags(&[]).is_ok());
        match reject_unknown_tags(&["brunch".to_string()]) {
            Err(AppError::Validation(f)) => assert_eq!(f.get("tags").unwrap().len(), 1),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn listing_by_unknown_slug_is_rejected() {
        let Some(st) = testing::state().await else { return };
        let filter = RecipeFilter {
            tags: vec!["breakfast".into(), testing::unique("no-such-tag")],
            ..Default::default()
        };
        let result = list_recipes(&st, None, &filter, PageParams::default()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let known = RecipeFilter {
            tags: vec!["breakfast".into()],
            ..Default::default()
        };
        assert!(list_recipes(&st, None, &known, PageParams::default()).await.is_ok());
    }

    #[tokio::test]
    async fn update_replaces_the_whole_ingredient_set() {
        use crate::recipes::dto::IngredientAmountPayload;

        let Some(st) = testing::state().await else { return };
        let author = testing::user(&st).await.unwrap();
        let flour = testing::ingredient(&st, &testing::unique("мука"), "г").await.unwrap();
        let sugar = testing::ingredient(&st, &testing::unique("сахар"), "г").await.unwrap();
        let egg = testing::ingredient(&st, &testing::unique("яйцо"), "шт").await.unwrap();
        let tag = testing::seeded_tag(&st).await.unwrap();
        let id = testing::recipe(&st, author.id, &[(flour, 200), (sugar, 50)])
            .await
            .unwrap();

        let payload = RecipePayload {
            tags: Some(vec![tag]),
            ingredients: Some(vec![IngredientAmountPayload {
                id: Some(egg),
                amount: Some(3),
            }]),
            ..Default::default()
        };
        let updated = update_recipe(&st, author.id, id, payload).await.unwrap();

        let got: Vec<(Uuid, i32)> = updated.ingredients.iter().map(|i| (i.id, i.amount)).collect();
        assert_eq!(got, vec![(egg, 3)]);
        assert_eq!(updated.name, "Тестовый рецепт");
        assert_eq!(updated.tags.len(), 1);

        let stored = repo::ingredients_for(&st.db, &[id]).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn only_author_or_staff_may_update() {
        let Some(st) = testing::state().await else { return };
        let author = testing::user(&st).await.unwrap();
        let stranger = testing::user(&st).await.unwrap();
        let salt = testing::ingredient(&st, &testing::unique("соль"), "г").await.unwrap();
        let id = testing::recipe(&st, author.id, &[(salt, 1)]).await.unwrap();

        let result = delete_recipe(&st, stranger.id, id).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
        assert!(delete_recipe(&st, author.id, id).await.is_ok());
        assert!(matches!(
            get_recipe(&st, None, id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn author_may_modify_without_staff_lookup() {
        // The lazy pool would fail if this touched the database.
        let state = AppState::fake();
        let author = Uuid::new_v4();
        let owner = RecipeOwner {
            id: Uuid::new_v4(),
            author_id: author,
            image: "k".into(),
        };
        assert!(ensure_can_modify(&state.db, author, &owner).await.is_ok());
    }
}
