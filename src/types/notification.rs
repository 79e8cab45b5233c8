//! Outbound messages to users

use super::user::UserId;

/// A direct message queued by the engine for delivery to a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub user_id: UserId,
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(user_id: impl Into<UserId>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Notification {
            user_id: user_id.into(),
            title: title.into(),
            body: body.into(),
        }
    }
}
