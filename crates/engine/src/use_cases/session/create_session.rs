//! Create a new game session with a fresh join code.

use std::sync::Arc;

use talebound_domain::{GameSession, JoinCode};

use super::SessionError;
use crate::infrastructure::ports::{ClockPort, SessionRepo};

/// Attempts before giving up on finding an unused join code
const MAX_CODE_ATTEMPTS: usize = 5;

pub struct CreateSession {
    sessions: Arc<dyn SessionRepo>,
    clock: Arc<dyn ClockPort>,
}

impl CreateSession {
    pub fn new(sessions: Arc<dyn SessionRepo>, clock: Arc<dyn ClockPort>) -> Self {
        Self { sessions, clock }
    }

    pub async fn execute(&self) -> Result<GameSession, SessionError> {
        let mut attempt = 1;
        loop {
            let session = GameSession::new(JoinCode::generate(), self.clock.now());
            match self.sessions.create(&session).await {
                Ok(()) => {
                    tracing::info!(
                        session_id = %session.id(),
                        join_code = %session.join_code().as_str(),
                        "Session created"
                    );
                    return Ok(session);
                }
                Err(e) if e.is_constraint() && attempt < MAX_CODE_ATTEMPTS => {
                    tracing::debug!(attempt, "Join code collision, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
