use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Field name -> list of messages, rendered as the body of a 400.
#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(|v| v.as_slice())
    }

    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "{}: {}", field, messages.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Internal(anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errs = FieldErrors::new();
        errs.add(field, message);
        AppError::Validation(errs)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) | AppError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Client-visible database outcomes; everything else stays internal.
fn classify_sqlx(err: &sqlx::Error) -> Option<AppError> {
    match err {
        sqlx::Error::RowNotFound => Some(AppError::NotFound("Not found.".into())),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Some(AppError::Conflict(db.message().to_string()))
        }
        _ => None,
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match classify_sqlx(&err) {
            Some(mapped) => mapped,
            None => AppError::Internal(anyhow::Error::new(err).context("database")),
        }
    }
}

/// Repositories wrap sqlx errors with `.context(..)`; look through it.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        let mapped = err.downcast_ref::<sqlx::Error>().and_then(classify_sqlx);
        match mapped {
            Some(mapped) => mapped,
            None => AppError::Internal(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::Validation(fields) => json!(fields),
            AppError::BadRequest(msg) | AppError::Conflict(msg) => json!({ "errors": msg }),
            AppError::NotFound(msg) | AppError::Unauthorized(msg) | AppError::Forbidden(msg) => {
                json!({ "detail": msg })
            }
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                json!({ "detail": "internal server error" })
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_renders_field_map() {
        let mut errs = FieldErrors::new();
        errs.add("tags", "Choose at least one tag.");
        errs.add("tags", "Tags are not unique.");
        errs.add("cooking_time", "Minimum cooking time is 1 minute.");
        let resp = AppError::Validation(errs).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["tags"].as_array().unwrap().len(), 2);
        assert_eq!(body["cooking_time"][0], "Minimum cooking time is 1 minute.");
    }

    #[tokio::test]
    async fn conflict_is_a_client_error_with_errors_key() {
        let resp = AppError::Conflict("Recipe is already added.".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["errors"], "Recipe is already added.");
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let resp = AppError::Internal(anyhow::anyhow!("pool timed out")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body["detail"], "internal server error");
    }

    #[test]
    fn row_not_found_maps_to_404() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn contextual_sqlx_errors_keep_their_mapping() {
        use anyhow::Context;

        let missing: Result<(), sqlx::Error> = Err(sqlx::Error::RowNotFound);
        let err: AppError = missing.context("find recipe").unwrap_err().into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let closed: Result<(), sqlx::Error> = Err(sqlx::Error::PoolClosed);
        let err: AppError = closed.context("list recipes").unwrap_err().into();
        assert!(matches!(err, AppError::Internal(_)));

        let plain: AppError = anyhow::anyhow!("storage down").into();
        assert_eq!(plain.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn empty_field_errors_pass() {
        assert!(FieldErrors::new().into_result().is_ok());
        let mut errs = FieldErrors::new();
        errs.add("name", "required");
        assert!(matches!(errs.into_result(), Err(AppError::Validation(_))));
    }
}
