use std::collections::HashSet;

use uuid::Uuid;

use super::dto::RecipePayload;
use crate::error::{AppResult, FieldErrors};
use crate::images::services::{decode_data_uri, DecodedImage};

pub const NAME_MAX_LEN: usize = 200;
pub const COOKING_TIME_MAX: i64 = 32767;
pub const AMOUNT_MAX: i64 = i32::MAX as i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Update,
}

/// A validated write. On update, `None` scalar fields keep their stored values.
#[derive(Debug)]
pub struct RecipeDraft {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<DecodedImage>,
    pub tags: Vec<Uuid>,
    pub ingredients: Vec<(Uuid, i32)>,
}

pub fn validate(payload: RecipePayload, mode: Mode) -> AppResult<RecipeDraft> {
    let mut errs = FieldErrors::new();
    let required = mode == Mode::Create;

    let name = match payload.name.map(|n| n.trim().to_string()) {
        Some(n) if n.is_empty() => {
            errs.add("name", "This field may not be blank.");
            None
        }
        Some(n) if n.chars().count() > NAME_MAX_LEN => {
            errs.add(
                "name",
                format!("Ensure this field has no more than {} characters.", NAME_MAX_LEN),
            );
            None
        }
        Some(n) => Some(n),
        None => {
            if required {
                errs.add("name", "This field is required.");
            }
            None
        }
    };

    let text = match payload.text {
        Some(t) if t.trim().is_empty() => {
            errs.add("text", "This field may not be blank.");
            None
        }
        Some(t) => Some(t),
        None => {
            if required {
                errs.add("text", "This field is required.");
            }
            None
        }
    };

    let cooking_time = match payload.cooking_time {
        Some(t) if t < 1 => {
            errs.add("cooking_time", "Minimum cooking time is 1 minute.");
            None
        }
        Some(t) if t > COOKING_TIME_MAX => {
            errs.add(
                "cooking_time",
                format!("Cooking time must not exceed {} minutes.", COOKING_TIME_MAX),
            );
            None
        }
        Some(t) => Some(t as i32),
        None => {
            if required {
                errs.add("cooking_time", "This field is required.");
            }
            None
        }
    };

    let image = match payload.image.as_deref() {
        Some(raw) => match decode_data_uri(raw) {
            Ok(img) => Some(img),
            Err(e) => {
                errs.add("image", e.to_string());
                None
            }
        },
        None => {
            if required {
                errs.add("image", "This field is required.");
            }
            None
        }
    };

    let tags = payload.tags.unwrap_or_default();
    if tags.is_empty() {
        errs.add("tags", "Choose at least one tag.");
    } else if has_duplicates(tags.iter()) {
        errs.add("tags", "Tags are not unique.");
    }

    let mut ingredients = Vec::new();
    let raw_ingredients = payload.ingredients.unwrap_or_default();
    if raw_ingredients.is_empty() {
        errs.add("ingredients", "Choose at least one ingredient.");
    }
    let mut seen = HashSet::new();
    for item in raw_ingredients {
        let Some(id) = item.id else {
            errs.add("ingredients", "Every ingredient needs an id.");
            continue;
        };
        if !seen.insert(id) {
            errs.add("ingredients", "Ingredients are not unique.");
            continue;
        }
        match item.amount {
            None | Some(0) => errs.add("ingredients", "Amount must be at least 1."),
            Some(a) if a < 1 => errs.add("ingredients", "Amount must be at least 1."),
            Some(a) if a > AMOUNT_MAX => errs.add("ingredients", "Amount is too large."),
            Some(a) => ingredients.push((id, a as i32)),
        }
    }

    errs.into_result()?;
    Ok(RecipeDraft {
        name,
        text,
        cooking_time,
        image,
        tags,
        ingredients,
    })
}

fn has_duplicates<'a>(ids: impl Iterator<Item = &'a Uuid>) -> bool {
    let mut seen = HashSet::new();
    ids.into_iter().any(|id| !seen.insert(*id))
}
