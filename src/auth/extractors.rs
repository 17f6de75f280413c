use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::services::{JwtKeys, TokenKind};
use crate::error::AppError;

/// Authenticated requester. Rejects with 401 when no valid access token is sent.
pub struct AuthUser(pub Uuid);

/// Requester that may be anonymous. A malformed or expired token is still a 401.
pub struct MaybeUser(pub Option<Uuid>);

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(header) = parts.headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("Token "))
        .map(Some)
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".into()))
}

fn user_from_token(keys: &JwtKeys, token: &str) -> Result<Uuid, AppError> {
    let claims = keys.verify(token).map_err(|_| {
        warn!("invalid or expired token");
        AppError::Unauthorized("Invalid or expired token".into())
    })?;

    if claims.kind != TokenKind::Access {
        return Err(AppError::Unauthorized("Access token required".into()));
    }
    Ok(claims.sub)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or_else(|| {
            AppError::Unauthorized("Authentication credentials were not provided.".into())
        })?;
        let keys = JwtKeys::from_ref(state);
        Ok(AuthUser(user_from_token(&keys, token)?))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            None => Ok(MaybeUser(None)),
            Some(token) => {
                let keys = JwtKeys::from_ref(state);
                Ok(MaybeUser(Some(user_from_token(&keys, token)?)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::http::{header::AUTHORIZATION, Request, StatusCode};

    fn parts_with(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/recipes");
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn missing_header_is_anonymous_for_maybe_user() {
        let state = AppState::fake();
        let mut parts = parts_with(None);
        let MaybeUser(user) = MaybeUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn missing_header_rejects_auth_user() {
        let state = AppState::fake();
        let mut parts = parts_with(None);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .unwrap();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn accepts_bearer_and_token_schemes() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let user_id = Uuid::new_v4();
        let token = keys.sign_access(user_id).unwrap();

        for scheme in ["Bearer", "Token"] {
            let mut parts = parts_with(Some(&format!("{} {}", scheme, token)));
            let AuthUser(id) = AuthUser::from_request_parts(&mut parts, &state)
                .await
                .unwrap();
            assert_eq!(id, user_id);
        }
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_token() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign_refresh(Uuid::new_v4()).unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {}", token)));
        let err = MaybeUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .unwrap();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_scheme_is_rejected() {
        let state = AppState::fake();
        let mut parts = parts_with(Some("Basic dXNlcjpwYXNz"));
        assert!(AuthUser::from_request_parts(&mut parts, &state).await.is_err());
    }
}
