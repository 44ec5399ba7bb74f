use crate::db::User;
use crate::error::AppError;

pub mod admin;
pub mod competition;
pub mod competitions;
pub mod entry;
pub mod not_found;

fn require_user(user: &Option<User>) -> Result<&User, AppError> {
    user.as_ref().ok_or(AppError::NotLoggedIn)
}

fn require_admin(user: &Option<User>) -> Result<&User, AppError> {
    let user = require_user(user)?;
    if !user.admin {
        return Err(AppError::NotAdmin);
    }
    Ok(user)
}
