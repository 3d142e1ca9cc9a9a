//! Character use cases.
//!
//! Character setup (which may start the opening scene) and the
//! administrative patch path.

use std::sync::Arc;

mod create_character;
mod update_character;

pub use create_character::{CharacterCreated, CreateCharacter};
pub use update_character::UpdateCharacter;

use crate::infrastructure::ports::RepoError;
use crate::use_cases::session::AuthError;

#[derive(Debug, thiserror::Error)]
pub enum CharacterError {
    #[error("Invalid character: {0}")]
    Validation(String),
    #[error("Character not found")]
    NotFound,
    #[error("This player already has a character")]
    AlreadyExists,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

/// Container for character use cases.
pub struct CharacterUseCases {
    pub create: Arc<CreateCharacter>,
    pub update: Arc<UpdateCharacter>,
}

impl CharacterUseCases {
    pub fn new(create: Arc<CreateCharacter>, update: Arc<UpdateCharacter>) -> Self {
        Self { create, update }
    }
}
