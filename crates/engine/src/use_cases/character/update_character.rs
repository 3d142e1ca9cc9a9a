//! Administrative partial update of a character.

use std::sync::Arc;

use talebound_domain::{Character, CharacterId, CharacterPatch, ResourcePool};

use super::CharacterError;
use crate::infrastructure::ports::{CharacterRepo, ClockPort};
use crate::use_cases::session::Authenticate;

pub struct UpdateCharacter {
    authenticate: Arc<Authenticate>,
    characters: Arc<dyn CharacterRepo>,
    clock: Arc<dyn ClockPort>,
}

impl UpdateCharacter {
    pub fn new(
        authenticate: Arc<Authenticate>,
        characters: Arc<dyn CharacterRepo>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            authenticate,
            characters,
            clock,
        }
    }

    /// Any player of the character's session may patch it.
    pub async fn execute(
        &self,
        character_id: CharacterId,
        token: Option<&str>,
        mut patch: CharacterPatch,
    ) -> Result<Character, CharacterError> {
        let mut character = self
            .characters
            .get(character_id)
            .await?
            .ok_or(CharacterError::NotFound)?;

        self.authenticate
            .execute(token, character.session_id)
            .await?;

        patch
            .validate()
            .map_err(|e| CharacterError::Validation(e.to_string()))?;
        patch.hp = patch.hp.map(ResourcePool::clamped);
        patch.mp = patch.mp.map(ResourcePool::clamped);

        if patch.is_empty() {
            return Ok(character);
        }

        let now = self.clock.now();
        self.characters.update(character_id, &patch, now).await?;
        character.apply_patch(&patch, now);

        tracing::info!(character_id = %character_id, "Character patched");
        Ok(character)
    }
}
