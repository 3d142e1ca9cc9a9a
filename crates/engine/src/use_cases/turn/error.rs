//! Errors for the round cycle.

use crate::infrastructure::ports::RepoError;
use crate::use_cases::narration::NarrationError;
use crate::use_cases::session::AuthError;

#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Session not found")]
    SessionNotFound,
    #[error("You have already acted this round")]
    AlreadyActed,
    #[error("The narrator is busy, try again shortly")]
    Busy,
    #[error("The opening scene has already been narrated")]
    OpeningExists,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Narration failed: {0}")]
    Narration(#[from] NarrationError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}
