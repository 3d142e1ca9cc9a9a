//! Message entity - one entry in the session transcript

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{MessageId, PlayerId, SessionId};
use crate::value_objects::DiceRoll;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable transcript entry
///
/// Assistant messages carry narrative text only; the raw state-update payload
/// (if any) is kept separately in `state_updates` for audit and replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub session_id: SessionId,
    /// `None` for narrator-authored messages
    pub player_id: Option<PlayerId>,
    pub role: MessageRole,
    pub author_name: String,
    pub content: String,
    pub dice_roll: Option<DiceRoll>,
    pub state_updates: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// A player's action for the current round.
    pub fn from_player(
        session_id: SessionId,
        player_id: PlayerId,
        author_name: impl Into<String>,
        content: impl Into<String>,
        dice_roll: Option<DiceRoll>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            session_id,
            player_id: Some(player_id),
            role: MessageRole::User,
            author_name: author_name.into(),
            content: content.into(),
            dice_roll,
            state_updates: None,
            created_at: now,
        }
    }

    /// A narration produced by the generator (or a fallback).
    pub fn from_narrator(
        session_id: SessionId,
        content: impl Into<String>,
        state_updates: Option<serde_json::Value>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            session_id,
            player_id: None,
            role: MessageRole::Assistant,
            author_name: NARRATOR_NAME.to_string(),
            content: content.into(),
            dice_roll: None,
            state_updates,
            created_at: now,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }
}

/// Display name used for narrator messages
pub const NARRATOR_NAME: &str = "Narrator";
