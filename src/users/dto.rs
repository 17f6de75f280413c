use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::{ProfileRow, User};

/// Request body for `POST /users`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

/// Request body for `PATCH /users/me`; absent fields stay unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub new_password: Option<String>,
    pub current_password: Option<String>,
}

/// Returned once, right after registration.
#[derive(Debug, Serialize)]
pub struct CreatedUser {
    pub email: String,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for CreatedUser {
    fn from(u: User) -> Self {
        Self {
            email: u.email,
            id: u.id,
            username: u.username,
            first_name: u.first_name,
            last_name: u.last_name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub email: String,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl From<ProfileRow> for UserProfile {
    fn from(r: ProfileRow) -> Self {
        Self {
            email: r.email,
            id: r.id,
            username: r.username,
            first_name: r.first_name,
            last_name: r.last_name,
            is_subscribed: r.is_subscribed,
        }
    }
}

impl UserProfile {
    /// Profile of the requester themselves; nobody subscribes to themselves.
    pub fn own(u: User) -> Self {
        Self {
            email: u.email,
            id: u.id,
            username: u.username,
            first_name: u.first_name,
            last_name: u.last_name,
            is_subscribed: false,
        }
    }
}
