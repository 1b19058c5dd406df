use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::store::StateContainer;

/// Storage key of the persisted session.
pub const SESSION_KEY: &str = "user-storage";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSession {
    pub user: Option<User>,
    pub is_authenticated: bool,
}

impl UserSession {
    pub fn signed_in(user: User) -> Self {
        Self {
            user: Some(user),
            is_authenticated: true,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        if !self.is_authenticated {
            return None;
        }
        self.user.as_ref().map(|user| user.id.as_str())
    }
}

pub type SessionStore = StateContainer<UserSession>;
