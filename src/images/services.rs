use anyhow::Context;
use base64ct::{Base64, Encoding};
use bytes::Bytes;
use uuid::Uuid;

use crate::state::AppState;

/// Image decoded from a `data:image/<type>;base64,<payload>` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub body: Bytes,
    pub content_type: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("Expected a base64 data URI like data:image/png;base64,...")]
    NotDataUri,
    #[error("Unsupported image type {0}")]
    UnsupportedType(String),
    #[error("Image payload is not valid base64")]
    BadBase64,
    #[error("Image payload is empty")]
    Empty,
}

pub fn decode_data_uri(raw: &str) -> Result<DecodedImage, ImageError> {
    let rest = raw.trim().strip_prefix("data:").ok_or(ImageError::NotDataUri)?;
    let (meta, payload) = rest.split_once(";base64,").ok_or(ImageError::NotDataUri)?;
    let content_type = meta.to_ascii_lowercase();
    if !content_type.starts_with("image/") {
        return Err(ImageError::NotDataUri);
    }
    if ext_from_mime(&content_type).is_none() {
        return Err(ImageError::UnsupportedType(content_type));
    }

    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let body = Base64::decode_vec(&compact).map_err(|_| ImageError::BadBase64)?;
    if body.is_empty() {
        return Err(ImageError::Empty);
    }
    Ok(DecodedImage {
        body: Bytes::from(body),
        content_type,
    })
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Uploads a recipe image and returns its object key.
pub async fn upload_recipe_image(
    st: &AppState,
    author_id: Uuid,
    image: DecodedImage,
) -> anyhow::Result<String> {
    let ext = ext_from_mime(&image.content_type).unwrap_or("bin");
    let key = format!("recipes/{}/{}.{}", author_id, Uuid::new_v4(), ext);
    st.storage
        .put_object(&key, image.body, &image.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(key)
}

/// Best-effort removal; a dangling object is only logged.
pub async fn discard(st: &AppState, key: &str) {
    if let Err(e) = st.storage.delete_object(key).await {
        tracing::warn!(error = %e, key, "failed to delete recipe image");
    }
}

pub async fn image_url(st: &AppState, key: &str) -> anyhow::Result<String> {
    st.storage
        .presign_get(key, st.config.storage.url_ttl_secs)
        .await
        .with_context(|| format!("presign url for {}", key))
}

pub async fn presign_many(st: &AppState, keys: &[String]) -> anyhow::Result<Vec<String>> {
    let mut out = Vec::with_capacity(keys.len());
    for k in keys {
        out.push(image_url(st, k).await?);
    }
    Ok(out)
}
