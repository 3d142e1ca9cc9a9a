//! Create the calling player's character.

use std::sync::Arc;

use talebound_domain::{Character, CharacterSetup, Message, SessionId};

use super::CharacterError;
use crate::infrastructure::ports::{CharacterRepo, ClockPort};
use crate::use_cases::session::Authenticate;
use crate::use_cases::turn::{OpeningResult, StartOpening};

#[derive(Debug, Clone)]
pub struct CharacterCreated {
    pub character: Character,
    /// Present when this character completed the party and the opening ran
    pub opening: Option<Message>,
}

pub struct CreateCharacter {
    authenticate: Arc<Authenticate>,
    characters: Arc<dyn CharacterRepo>,
    start_opening: Arc<StartOpening>,
    clock: Arc<dyn ClockPort>,
}

impl CreateCharacter {
    pub fn new(
        authenticate: Arc<Authenticate>,
        characters: Arc<dyn CharacterRepo>,
        start_opening: Arc<StartOpening>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            authenticate,
            characters,
            start_opening,
            clock,
        }
    }

    pub async fn execute(
        &self,
        session_id: SessionId,
        token: Option<&str>,
        setup: CharacterSetup,
    ) -> Result<CharacterCreated, CharacterError> {
        let player = self.authenticate.execute(token, session_id).await?;

        let character = Character::create(player.id, session_id, setup, self.clock.now())
            .map_err(|e| CharacterError::Validation(e.to_string()))?;

        self.characters.create(&character).await.map_err(|e| {
            if e.is_constraint() {
                CharacterError::AlreadyExists
            } else {
                CharacterError::Repo(e)
            }
        })?;
        tracing::info!(
            session_id = %session_id,
            character_id = %character.id,
            name = %character.name,
            "Character created"
        );

        let opening = self.maybe_open(session_id).await;
        Ok(CharacterCreated { character, opening })
    }

    /// The character is stored whatever happens here.
    async fn maybe_open(&self, session_id: SessionId) -> Option<Message> {
        let result = match self.start_opening.is_due(session_id).await {
            Ok(true) => self.start_opening.execute(session_id).await,
            Ok(false) => return None,
            Err(e) => Err(e),
        };

        match result {
            Ok(OpeningResult::Produced(outcome)) => Some(outcome.message),
            Ok(OpeningResult::AlreadyProduced | OpeningResult::Busy) => None,
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Opening scene failed");
                None
            }
        }
    }
}
