//! Submit a player's action for the current round.
//!
//! The last player to act in a round also runs the narration, so the
//! response either says who is still to act or carries the new narration.

use std::sync::Arc;

use talebound_domain::{DiceRoll, GameSession, Message, SessionId};

use super::TurnError;
use crate::infrastructure::ports::{
    ActionRecord, CharacterRepo, ClockPort, PlayerRepo, SessionRepo, TurnRepo,
};
use crate::use_cases::narration::{NarrateRound, RoundKind};
use crate::use_cases::session::Authenticate;

pub const MAX_ACTION_LENGTH: usize = 2000;

#[derive(Debug, Clone)]
pub enum ActionOutcome {
    /// Recorded; the round resolves once the listed players act
    Waiting { turn: i64, waiting_for: Vec<String> },
    /// This action completed the round
    Narrated {
        turn: i64,
        message: Message,
        fallback: bool,
    },
}

pub struct SubmitAction {
    authenticate: Arc<Authenticate>,
    sessions: Arc<dyn SessionRepo>,
    players: Arc<dyn PlayerRepo>,
    characters: Arc<dyn CharacterRepo>,
    turns: Arc<dyn TurnRepo>,
    narrate: Arc<NarrateRound>,
    clock: Arc<dyn ClockPort>,
}

impl SubmitAction {
    pub fn new(
        authenticate: Arc<Authenticate>,
        sessions: Arc<dyn SessionRepo>,
        players: Arc<dyn PlayerRepo>,
        characters: Arc<dyn CharacterRepo>,
        turns: Arc<dyn TurnRepo>,
        narrate: Arc<NarrateRound>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            authenticate,
            sessions,
            players,
            characters,
            turns,
            narrate,
            clock,
        }
    }

    pub async fn execute(
        &self,
        session_id: SessionId,
        token: Option<&str>,
        content: &str,
        dice_roll: Option<DiceRoll>,
    ) -> Result<ActionOutcome, TurnError> {
        let player = self.authenticate.execute(token, session_id).await?;

        let content = content.trim();
        if content.is_empty() {
            return Err(TurnError::Validation("Action cannot be empty".to_string()));
        }
        if content.chars().count() > MAX_ACTION_LENGTH {
            return Err(TurnError::Validation(format!(
                "Action cannot exceed {} characters",
                MAX_ACTION_LENGTH
            )));
        }
        if let Some(roll) = &dice_roll {
            roll.verify()
                .map_err(|e| TurnError::Validation(e.to_string()))?;
        }

        let character = self
            .characters
            .get_for_player(player.id)
            .await?
            .ok_or_else(|| {
                TurnError::Validation("Create a character before acting".to_string())
            })?;

        let message = Message::from_player(
            session_id,
            player.id,
            &character.name,
            content,
            dice_roll,
            self.clock.now(),
        );
        let rejection = match self.turns.record_action(player.id, &message).await? {
            ActionRecord::Recorded => None,
            ActionRecord::AlreadyActed => Some(TurnError::AlreadyActed),
            ActionRecord::SessionBusy => Some(TurnError::Busy),
        };
        if rejection.is_none() {
            tracing::info!(
                session_id = %session_id,
                player_id = %player.id,
                has_dice = message.dice_roll.is_some(),
                "Action recorded"
            );
        }

        // A refused action may still unstick a complete round whose narration
        // failed or whose holder went away
        match (self.resolve_round(session_id).await?, rejection) {
            (outcome @ ActionOutcome::Narrated { .. }, Some(_)) => {
                tracing::warn!(
                    session_id = %session_id,
                    player_id = %player.id,
                    "Resumed a stalled round"
                );
                Ok(outcome)
            }
            (_, Some(err)) => Err(err),
            (outcome, None) => Ok(outcome),
        }
    }

    /// Narrate the current round if every player has acted and the claim is
    /// free (or abandoned); otherwise report who the round is waiting for.
    async fn resolve_round(&self, session_id: SessionId) -> Result<ActionOutcome, TurnError> {
        // Read the turn before the flags so a claim never targets a round
        // that has already been narrated
        let session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or(TurnError::SessionNotFound)?;
        let players = self.players.list_for_session(session_id).await?;

        if !GameSession::round_complete(&players) {
            let waiting_for = players
                .iter()
                .filter(|p| !p.has_acted)
                .map(|p| p.name.clone())
                .collect();
            return Ok(ActionOutcome::Waiting {
                turn: session.turn(),
                waiting_for,
            });
        }

        let Some(claim) = self.narrate.claim(session_id, session.turn()).await? else {
            tracing::debug!(session_id = %session_id, "Round claimed by another request");
            return Ok(ActionOutcome::Waiting {
                turn: session.turn(),
                waiting_for: Vec::new(),
            });
        };

        let outcome = Arc::clone(&self.narrate)
            .execute(claim, RoundKind::Turn)
            .await?;
        Ok(ActionOutcome::Narrated {
            turn: claim.turn + 1,
            message: outcome.message,
            fallback: outcome.used_fallback,
        })
    }
}
