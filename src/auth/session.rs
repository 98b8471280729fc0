use actix_session::Session;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

const USER_ID: &str = "user_id";
const USERNAME: &str = "username";

/// The signed-in user as remembered by the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
}

pub fn get_user_id(session: &Session) -> Option<i64> {
    session.get::<i64>(USER_ID).unwrap_or(None)
}

pub fn current_user(session: &Session) -> Option<SessionUser> {
    let id = get_user_id(session)?;
    let username = session.get::<String>(USERNAME).unwrap_or(None)?;
    Some(SessionUser { id, username })
}

/// The signed-in user, or `Unauthorized`.
pub fn require_user(session: &Session) -> Result<SessionUser, AppError> {
    current_user(session).ok_or(AppError::Unauthorized)
}

pub fn login(session: &Session, id: i64, username: &str) -> Result<(), AppError> {
    session.renew();
    session.insert(USER_ID, id)?;
    session.insert(USERNAME, username)?;
    Ok(())
}

pub fn logout(session: &Session) {
    session.purge();
}

pub fn take_flash(session: &Session) -> Option<String> {
    let flash = session.get::<String>("flash").unwrap_or(None);
    if flash.is_some() {
        session.remove("flash");
    }
    flash
}

pub fn set_flash(session: &Session, message: &str) {
    if let Err(e) = session.insert("flash", message) {
        log::warn!("Could not store flash message: {e}");
    }
}
