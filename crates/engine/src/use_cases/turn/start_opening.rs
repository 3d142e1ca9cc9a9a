//! Narrate the opening scene of a session.
//!
//! Runs automatically once both players have characters, or on request.
//! Only produced while the transcript is still empty.

use std::sync::Arc;

use talebound_domain::{SessionId, MAX_PLAYERS};

use super::TurnError;
use crate::infrastructure::ports::{CharacterRepo, MessageRepo, PlayerRepo, SessionRepo};
use crate::use_cases::narration::{NarrateRound, NarrationOutcome, RoundKind};
use crate::use_cases::session::Authenticate;

#[derive(Debug, Clone)]
pub enum OpeningResult {
    Produced(NarrationOutcome),
    /// The transcript already has messages
    AlreadyProduced,
    /// Another narration holds the session
    Busy,
}

pub struct StartOpening {
    sessions: Arc<dyn SessionRepo>,
    players: Arc<dyn PlayerRepo>,
    characters: Arc<dyn CharacterRepo>,
    messages: Arc<dyn MessageRepo>,
    narrate: Arc<NarrateRound>,
}

impl StartOpening {
    pub fn new(
        sessions: Arc<dyn SessionRepo>,
        players: Arc<dyn PlayerRepo>,
        characters: Arc<dyn CharacterRepo>,
        messages: Arc<dyn MessageRepo>,
        narrate: Arc<NarrateRound>,
    ) -> Self {
        Self {
            sessions,
            players,
            characters,
            messages,
            narrate,
        }
    }

    /// Whether the automatic opening should run: two players, each with a
    /// character, and no messages yet.
    pub async fn is_due(&self, session_id: SessionId) -> Result<bool, TurnError> {
        let players = self.players.list_for_session(session_id).await?;
        if players.len() < MAX_PLAYERS {
            return Ok(false);
        }
        let characters = self.characters.list_for_session(session_id).await?;
        let all_ready = players
            .iter()
            .all(|p| characters.iter().any(|c| c.player_id == p.id));
        if !all_ready {
            return Ok(false);
        }
        Ok(self.messages.count_for_session(session_id).await? == 0)
    }

    /// Produce the opening scene unless one exists or a narration is running.
    ///
    /// An opening whose narration was abandoned can be produced again once
    /// its claim has lapsed.
    pub async fn execute(&self, session_id: SessionId) -> Result<OpeningResult, TurnError> {
        let session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or(TurnError::SessionNotFound)?;

        if self.messages.count_for_session(session_id).await? > 0 {
            return Ok(OpeningResult::AlreadyProduced);
        }

        let Some(claim) = self.narrate.claim(session_id, session.turn()).await? else {
            return Ok(OpeningResult::Busy);
        };

        // An opening may have been committed between the count and the claim
        if self.messages.count_for_session(session_id).await? > 0 {
            self.narrate.release(&claim).await?;
            return Ok(OpeningResult::AlreadyProduced);
        }

        tracing::info!(session_id = %session_id, "Narrating opening scene");
        let outcome = Arc::clone(&self.narrate)
            .execute(claim, RoundKind::Opening)
            .await?;
        Ok(OpeningResult::Produced(outcome))
    }
}

/// Manual start of the opening scene, bypassing the two-player gate.
pub struct ForceOpening {
    authenticate: Arc<Authenticate>,
    start_opening: Arc<StartOpening>,
}

impl ForceOpening {
    pub fn new(authenticate: Arc<Authenticate>, start_opening: Arc<StartOpening>) -> Self {
        Self {
            authenticate,
            start_opening,
        }
    }

    pub async fn execute(
        &self,
        session_id: SessionId,
        token: Option<&str>,
    ) -> Result<NarrationOutcome, TurnError> {
        let player = self.authenticate.execute(token, session_id).await?;
        tracing::info!(
            session_id = %session_id,
            player_id = %player.id,
            "Opening scene forced"
        );

        match self.start_opening.execute(session_id).await? {
            OpeningResult::Produced(outcome) => Ok(outcome),
            OpeningResult::AlreadyProduced => Err(TurnError::OpeningExists),
            OpeningResult::Busy => Err(TurnError::Busy),
        }
    }
}
