//! Repository port traits for the game store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use talebound_domain::{
    Character, CharacterId, CharacterPatch, GameSession, JoinCode, Message, Player, PlayerId,
    SessionId,
};

use super::error::RepoError;

// =============================================================================
// Database Ports (one per entity type)
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepo: Send + Sync {
    async fn create(&self, session: &GameSession) -> Result<(), RepoError>;
    async fn get(&self, id: SessionId) -> Result<Option<GameSession>, RepoError>;
    async fn get_by_code(&self, code: &JoinCode) -> Result<Option<GameSession>, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlayerRepo: Send + Sync {
    /// Seat a player unless the session already holds `max_players`.
    ///
    /// Returns `false` when the session is full. The count check and the insert
    /// are one statement.
    async fn insert_if_room(&self, player: &Player, max_players: usize) -> Result<bool, RepoError>;
    async fn get_by_token(&self, token: &str) -> Result<Option<Player>, RepoError>;
    async fn list_for_session(&self, session_id: SessionId) -> Result<Vec<Player>, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CharacterRepo: Send + Sync {
    /// Fails with `RepoError::ConstraintViolation` if the player already has one.
    async fn create(&self, character: &Character) -> Result<(), RepoError>;
    async fn get(&self, id: CharacterId) -> Result<Option<Character>, RepoError>;
    async fn get_for_player(&self, player_id: PlayerId) -> Result<Option<Character>, RepoError>;
    async fn list_for_session(&self, session_id: SessionId) -> Result<Vec<Character>, RepoError>;
    /// Write only the `Some` fields of the patch.
    async fn update(
        &self,
        id: CharacterId,
        patch: &CharacterPatch,
        now: DateTime<Utc>,
    ) -> Result<(), RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepo: Send + Sync {
    /// Transcript in creation order, ties broken by insertion order.
    async fn list_for_session(&self, session_id: SessionId) -> Result<Vec<Message>, RepoError>;
    async fn count_for_session(&self, session_id: SessionId) -> Result<u64, RepoError>;
}

// =============================================================================
// Round Cycle
// =============================================================================

/// Result of trying to record a player's action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionRecord {
    Recorded,
    /// The player's flag was already raised this round
    AlreadyActed,
    /// The session is narrating; nothing was written
    SessionBusy,
}

/// Proof that a caller holds a session's narrating phase.
///
/// Commits and releases only take effect while the stored claim still
/// matches, so a holder whose claim was taken over cannot write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NarrationClaim {
    pub session_id: SessionId,
    pub turn: i64,
    pub claimed_at: DateTime<Utc>,
}

/// Everything one narration writes, committed together.
#[derive(Debug, Clone)]
pub struct RoundCommit {
    pub claim: NarrationClaim,
    pub message: Message,
    pub character_updates: Vec<(CharacterId, CharacterPatch)>,
    /// Clear acted flags and bump the turn counter (false for the opening scene)
    pub advance_turn: bool,
    pub now: DateTime<Utc>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TurnRepo: Send + Sync {
    /// Store a player's action and raise their acted flag.
    ///
    /// Writes nothing unless the flag was down and the session is awaiting actions.
    async fn record_action(
        &self,
        player_id: PlayerId,
        message: &Message,
    ) -> Result<ActionRecord, RepoError>;

    /// Move the session to narrating, provided the turn counter still reads
    /// `turn`.
    ///
    /// The session must be awaiting actions, or narrating under a claim taken
    /// before `stale_before` (its holder is presumed gone). Returns the claim
    /// only for the caller whose update won.
    async fn claim_narrating(
        &self,
        session_id: SessionId,
        turn: i64,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> Result<Option<NarrationClaim>, RepoError>;

    /// Return the session to awaiting-actions if `claim` is still current.
    ///
    /// Acted flags are left as they are, so a complete round stays complete
    /// and can be claimed again.
    async fn release_narrating(&self, claim: &NarrationClaim) -> Result<(), RepoError>;

    /// Persist a narration and release the phase in one transaction.
    ///
    /// Fails with `RepoError::ConstraintViolation` and writes nothing when the
    /// claim is no longer current.
    async fn commit_round(&self, commit: RoundCommit) -> Result<(), RepoError>;
}
