//! GameSession aggregate - one two-player game instance
//!
//! The session owns the round counter and the turn phase. The phase is
//! `Narrating` only while a narrator call is in flight; storage adapters move it
//! with a conditional update so that a single request claims each round.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::entities::Player;
use crate::error::DomainError;
use crate::ids::SessionId;
use crate::value_objects::JoinCode;

/// Maximum number of players in a session
pub const MAX_PLAYERS: usize = 2;

/// Where a session is in its round cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TurnPhase {
    AwaitingActions,
    Narrating,
}

impl TurnPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingActions => "awaiting-actions",
            Self::Narrating => "narrating",
        }
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TurnPhase {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awaiting-actions" => Ok(Self::AwaitingActions),
            "narrating" => Ok(Self::Narrating),
            other => Err(DomainError::parse(format!("Unknown turn phase: {}", other))),
        }
    }
}

/// A game session
///
/// # Invariants
///
/// - `turn` starts at 1 and only ever increases
/// - `phase` returns to `AwaitingActions` after every narrator call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    id: SessionId,
    join_code: JoinCode,
    turn: i64,
    phase: TurnPhase,
    created_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
}

impl GameSession {
    pub fn new(join_code: JoinCode, now: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            join_code,
            turn: 1,
            phase: TurnPhase::AwaitingActions,
            created_at: now,
            last_activity_at: now,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn join_code(&self) -> &JoinCode {
        &self.join_code
    }

    pub fn turn(&self) -> i64 {
        self.turn
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn is_narrating(&self) -> bool {
        self.phase == TurnPhase::Narrating
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_activity_at
    }

    // =========================================================================
    // Builder methods (for hydrating from storage)
    // =========================================================================

    pub fn with_id(mut self, id: SessionId) -> Self {
        self.id = id;
        self
    }

    pub fn with_turn(mut self, turn: i64) -> Self {
        self.turn = turn;
        self
    }

    pub fn with_phase(mut self, phase: TurnPhase) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_last_activity_at(mut self, last_activity_at: DateTime<Utc>) -> Self {
        self.last_activity_at = last_activity_at;
        self
    }

    // =========================================================================
    // Round rules
    // =========================================================================

    /// A round is complete once the session is full and every player has acted.
    pub fn round_complete(players: &[Player]) -> bool {
        players.len() == MAX_PLAYERS && players.iter().all(|p| p.has_acted)
    }
}
