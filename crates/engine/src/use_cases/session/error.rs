//! Errors shared by the session use cases.

use crate::infrastructure::ports::RepoError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Session not found")]
    NotFound,
    #[error("Session is full")]
    SessionFull,
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}
