use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{RegisterRequest, SetPasswordRequest, UpdateProfileRequest};
use super::repo::{NewUser, ProfileChanges};
use super::repo_types::User;
use crate::auth::services::{
    hash_password, is_valid_email, is_valid_username, verify_password, MIN_PASSWORD_LEN,
};
use crate::error::{AppError, AppResult, FieldErrors};

const NAME_MAX_LEN: usize = 150;
const REQUIRED: &str = "This field is required.";

#[derive(Debug, PartialEq, Eq)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

fn check_email(errs: &mut FieldErrors, email: &str) {
    if !is_valid_email(email) {
        errs.add("email", "Enter a valid email address.");
    }
}

fn check_username(errs: &mut FieldErrors, username: &str) {
    if !is_valid_username(username) {
        errs.add("username", "Enter a valid username.");
    }
}

fn check_name(errs: &mut FieldErrors, field: &str, value: &str) {
    if value.chars().count() > NAME_MAX_LEN {
        errs.add(field, format!("Ensure this field has no more than {} characters.", NAME_MAX_LEN));
    }
}

fn check_password(errs: &mut FieldErrors, field: &str, password: &str) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errs.add(
            field,
            format!("This password is too short. It must contain at least {} characters.", MIN_PASSWORD_LEN),
        );
    }
}

fn required(errs: &mut FieldErrors, field: &str, value: Option<String>) -> String {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => v,
        _ => {
            errs.add(field, REQUIRED);
            String::new()
        }
    }
}

/// All registration fields are required; email is lowercased.
pub fn validate_registration(req: RegisterRequest) -> AppResult<Registration> {
    let mut errs = FieldErrors::new();

    let email = required(&mut errs, "email", req.email).to_lowercase();
    let username = required(&mut errs, "username", req.username);
    let first_name = required(&mut errs, "first_name", req.first_name);
    let last_name = required(&mut errs, "last_name", req.last_name);
    let password = match req.password {
        Some(p) if !p.is_empty() => p,
        _ => {
            errs.add("password", REQUIRED);
            String::new()
        }
    };

    if !email.is_empty() {
        check_email(&mut errs, &email);
    }
    if !username.is_empty() {
        check_username(&mut errs, &username);
    }
    check_name(&mut errs, "first_name", &first_name);
    check_name(&mut errs, "last_name", &last_name);
    if !password.is_empty() {
        check_password(&mut errs, "password", &password);
    }

    errs.into_result()?;
    Ok(Registration {
        email,
        username,
        first_name,
        last_name,
        password,
    })
}

pub fn validate_profile_changes(req: UpdateProfileRequest) -> AppResult<ProfileChanges> {
    let mut errs = FieldErrors::new();

    let email = req.email.map(|e| e.trim().to_lowercase());
    let username = req.username.map(|u| u.trim().to_string());
    if let Some(email) = &email {
        check_email(&mut errs, email);
    }
    if let Some(username) = &username {
        check_username(&mut errs, username);
    }
    if let Some(v) = &req.first_name {
        check_name(&mut errs, "first_name", v);
    }
    if let Some(v) = &req.last_name {
        check_name(&mut errs, "last_name", v);
    }

    errs.into_result()?;
    Ok(ProfileChanges {
        email,
        username,
        first_name: req.first_name,
        last_name: req.last_name,
    })
}

async fn ensure_unique(
    db: &PgPool,
    email: Option<&str>,
    username: Option<&str>,
    except: Option<Uuid>,
) -> AppResult<()> {
    let (email_taken, username_taken) = User::taken_fields(db, email, username, except).await?;
    let mut errs = FieldErrors::new();
    if email_taken {
        errs.add("email", "A user with that email already exists.");
    }
    if username_taken {
        errs.add("username", "A user with that username already exists.");
    }
    if !errs.is_empty() {
        warn!(?email, ?username, "email or username already taken");
    }
    errs.into_result()
}

pub async fn register(db: &PgPool, req: RegisterRequest) -> AppResult<User> {
    let reg = validate_registration(req)?;
    ensure_unique(db, Some(&reg.email), Some(&reg.username), None).await?;

    let hash = hash_password(&reg.password)?;
    let user = User::create(
        db,
        NewUser {
            email: &reg.email,
            username: &reg.username,
            first_name: &reg.first_name,
            last_name: &reg.last_name,
            password_hash: &hash,
        },
    )
    .await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

pub async fn update_profile(db: &PgPool, user_id: Uuid, req: UpdateProfileRequest) -> AppResult<User> {
    let changes = validate_profile_changes(req)?;
    ensure_unique(db, changes.email.as_deref(), changes.username.as_deref(), Some(user_id)).await?;
    let user = User::update_profile(db, user_id, changes).await?;
    info!(user_id = %user.id, "profile updated");
    Ok(user)
}

pub async fn set_password(db: &PgPool, user_id: Uuid, req: SetPasswordRequest) -> AppResult<()> {
    let mut errs = FieldErrors::new();
    let current = req.current_password.unwrap_or_default();
    let new = req.new_password.unwrap_or_default();
    if current.is_empty() {
        errs.add("current_password", REQUIRED);
    }
    if new.is_empty() {
        errs.add("new_password", REQUIRED);
    } else {
        check_password(&mut errs, "new_password", &new);
    }
    errs.into_result()?;

    let user = User::find_by_id(db, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    if !verify_password(&current, &user.password_hash)? {
        warn!(user_id = %user_id, "set_password with wrong current password");
        return Err(AppError::field("current_password", "Current password is incorrect."));
    }

    let hash = hash_password(&new)?;
    User::set_password_hash(db, user_id, &hash).await?;
    info!(user_id = %user_id, "password changed");
    Ok(())
}
