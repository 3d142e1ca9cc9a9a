//! Session lookups: by join code and full state snapshot.

use std::sync::Arc;

use talebound_domain::{Character, GameSession, JoinCode, Message, Player, SessionId};

use super::SessionError;
use crate::infrastructure::ports::{CharacterRepo, MessageRepo, PlayerRepo, SessionRepo};

pub struct GetSessionByCode {
    sessions: Arc<dyn SessionRepo>,
}

impl GetSessionByCode {
    pub fn new(sessions: Arc<dyn SessionRepo>) -> Self {
        Self { sessions }
    }

    pub async fn execute(&self, code: &str) -> Result<GameSession, SessionError> {
        // A code that cannot exist is reported the same as an unused one
        let code = JoinCode::new(code).map_err(|_| SessionError::NotFound)?;
        self.sessions
            .get_by_code(&code)
            .await?
            .ok_or(SessionError::NotFound)
    }
}

/// Everything a client needs to render a session.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session: GameSession,
    pub players: Vec<Player>,
    pub characters: Vec<Character>,
    pub messages: Vec<Message>,
}

pub struct GetSessionState {
    sessions: Arc<dyn SessionRepo>,
    players: Arc<dyn PlayerRepo>,
    characters: Arc<dyn CharacterRepo>,
    messages: Arc<dyn MessageRepo>,
}

impl GetSessionState {
    pub fn new(
        sessions: Arc<dyn SessionRepo>,
        players: Arc<dyn PlayerRepo>,
        characters: Arc<dyn CharacterRepo>,
        messages: Arc<dyn MessageRepo>,
    ) -> Self {
        Self {
            sessions,
            players,
            characters,
            messages,
        }
    }

    pub async fn execute(&self, session_id: SessionId) -> Result<SessionState, SessionError> {
        let session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or(SessionError::NotFound)?;

        let players = self.players.list_for_session(session_id).await?;
        let characters = self.characters.list_for_session(session_id).await?;
        let messages = self.messages.list_for_session(session_id).await?;

        Ok(SessionState {
            session,
            players,
            characters,
            messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::MockSessionRepo;

    #[tokio::test]
    async fn malformed_code_is_not_found_without_lookup() {
        let lookup = GetSessionByCode::new(Arc::new(MockSessionRepo::new()));
        let err = lookup.execute("no").await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound));
    }

    #[tokio::test]
    async fn code_lookup_is_case_insensitive() {
        let mut sessions = MockSessionRepo::new();
        sessions
            .expect_get_by_code()
            .withf(|code| code.as_str() == "ABC234")
            .times(1)
            .returning(|code| {
                Ok(Some(GameSession::new(code.clone(), chrono::Utc::now())))
            });

        let session = GetSessionByCode::new(Arc::new(sessions))
            .execute(" abc234 ")
            .await
            .unwrap();
        assert_eq!(session.join_code().as_str(), "ABC234");
    }
}
