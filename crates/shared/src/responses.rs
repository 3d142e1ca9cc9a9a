//! Response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use talebound_domain::{
    Ability, DiceRoll, MessageRole, ResourcePool, StatusEffect, TurnPhase,
};
use uuid::Uuid;

// =============================================================================
// Errors
// =============================================================================

/// Error classification code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    SessionFull,
    InternalError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

// =============================================================================
// Resources
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub generator_configured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub id: Uuid,
    pub join_code: String,
    pub turn: i64,
    pub phase: TurnPhase,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

/// A player as other players see it (never carries the token)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDto {
    pub id: Uuid,
    pub session_id: Uuid,
    pub name: String,
    pub has_acted: bool,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSessionResponse {
    pub session: SessionDto,
    pub player: PlayerDto,
    /// Bearer token for all later requests by this player
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterDto {
    pub id: Uuid,
    pub player_id: Uuid,
    pub session_id: Uuid,
    pub name: String,
    pub race: String,
    pub class: String,
    pub level: i32,
    pub xp: i32,
    pub xp_to_next_level: i32,
    pub hp: ResourcePool,
    pub mp: ResourcePool,
    pub attributes: BTreeMap<String, i32>,
    pub inventory: Vec<String>,
    pub status_effects: Vec<StatusEffect>,
    pub abilities: Vec<Ability>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: Uuid,
    pub session_id: Uuid,
    pub player_id: Option<Uuid>,
    pub role: MessageRole,
    pub author_name: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dice_roll: Option<DiceRoll>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_updates: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterCreatedResponse {
    pub character: CharacterDto,
    /// Present when this character completed the party and the opening was narrated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening: Option<MessageDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStateResponse {
    pub session: SessionDto,
    pub players: Vec<PlayerDto>,
    pub characters: Vec<CharacterDto>,
    pub messages: Vec<MessageDto>,
}

/// What happened after a player acted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ActionOutcomeResponse {
    /// Recorded; other players still need to act
    #[serde(rename_all = "camelCase")]
    Waiting { turn: i64, waiting_for: Vec<String> },
    /// This action completed the round and the narrator replied
    #[serde(rename_all = "camelCase")]
    Narrated {
        turn: i64,
        message: MessageDto,
        fallback: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waiting_outcome_is_tagged() {
        let json = serde_json::to_value(ActionOutcomeResponse::Waiting {
            turn: 3,
            waiting_for: vec!["Brin".into()],
        })
        .unwrap();
        assert_eq!(json["status"], "waiting");
        assert_eq!(json["waitingFor"][0], "Brin");
    }

    #[test]
    fn error_codes_are_screaming_snake() {
        let json = serde_json::to_value(ErrorResponse {
            code: ErrorCode::SessionFull,
            message: "full".into(),
        })
        .unwrap();
        assert_eq!(json["code"], "SESSION_FULL");
    }
}
