//! Player entity - a participant holding a bearer token

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{PlayerId, SessionId};

/// A player seated in a session
///
/// Simple data struct: the token is opaque and the `has_acted` flag is owned by
/// the round cycle, so there is no invalid combination to guard against here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub session_id: SessionId,
    pub name: String,
    /// Bearer credential, unique across all sessions
    pub token: String,
    pub has_acted: bool,
    pub joined_at: DateTime<Utc>,
}

impl Player {
    pub fn new(
        session_id: SessionId,
        name: impl Into<String>,
        token: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PlayerId::new(),
            session_id,
            name: name.into(),
            token: token.into(),
            has_acted: false,
            joined_at: now,
        }
    }
}
