//! Administrative order comments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storekeep_core::{CommentId, UserId};

use crate::registry::StatusId;

/// A note left on an order, tagged with the status at the time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderComment {
    /// Assigned on save.
    pub id: Option<CommentId>,
    /// Author; anonymous for system comments.
    pub user_id: UserId,
    pub message: String,
    pub status_id: StatusId,
    /// Whether the customer was notified.
    pub notified: bool,
    pub created_at: DateTime<Utc>,
}

impl OrderComment {
    #[must_use]
    pub fn new(user_id: UserId, message: impl Into<String>, status_id: StatusId) -> Self {
        Self {
            id: None,
            user_id,
            message: message.into(),
            status_id,
            notified: false,
            created_at: Utc::now(),
        }
    }
}
