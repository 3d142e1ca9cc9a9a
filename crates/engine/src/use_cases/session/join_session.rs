//! Join a session by its code and receive a bearer token.

use std::sync::Arc;

use talebound_domain::{generate_player_token, GameSession, Player, MAX_PLAYERS};

use super::{GetSessionByCode, SessionError};
use crate::infrastructure::ports::{ClockPort, PlayerRepo};

pub const MAX_PLAYER_NAME_LENGTH: usize = 60;

/// A seated player. The token is only ever returned here.
#[derive(Debug, Clone)]
pub struct JoinedSession {
    pub session: GameSession,
    pub player: Player,
}

pub struct JoinSession {
    lookup: Arc<GetSessionByCode>,
    players: Arc<dyn PlayerRepo>,
    clock: Arc<dyn ClockPort>,
}

impl JoinSession {
    pub fn new(
        lookup: Arc<GetSessionByCode>,
        players: Arc<dyn PlayerRepo>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            lookup,
            players,
            clock,
        }
    }

    pub async fn execute(&self, code: &str, name: &str) -> Result<JoinedSession, SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::Validation("Name cannot be empty".to_string()));
        }
        if name.chars().count() > MAX_PLAYER_NAME_LENGTH {
            return Err(SessionError::Validation(format!(
                "Name cannot exceed {} characters",
                MAX_PLAYER_NAME_LENGTH
            )));
        }

        let session = self.lookup.execute(code).await?;
        let player = Player::new(session.id(), name, generate_player_token(), self.clock.now());

        if !self.players.insert_if_room(&player, MAX_PLAYERS).await? {
            tracing::info!(session_id = %session.id(), "Join refused, session full");
            return Err(SessionError::SessionFull);
        }

        tracing::info!(
            session_id = %session.id(),
            player_id = %player.id,
            "Player joined session"
        );
        Ok(JoinedSession { session, player })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::ports::{MockPlayerRepo, MockSessionRepo};
    use chrono::Utc;
    use talebound_domain::JoinCode;

    fn join(players: MockPlayerRepo) -> JoinSession {
        let mut sessions = MockSessionRepo::new();
        sessions
            .expect_get_by_code()
            .returning(|code| Ok(Some(GameSession::new(code.clone(), Utc::now()))));
        JoinSession::new(
            Arc::new(GetSessionByCode::new(Arc::new(sessions))),
            Arc::new(players),
            Arc::new(FixedClock(Utc::now())),
        )
    }

    #[tokio::test]
    async fn trims_name_and_issues_token() {
        let mut players = MockPlayerRepo::new();
        players
            .expect_insert_if_room()
            .withf(|p, max| p.name == "Ash" && *max == MAX_PLAYERS)
            .returning(|_, _| Ok(true));

        let joined = join(players)
            .execute(JoinCode::generate().as_str(), "  Ash ")
            .await
            .unwrap();
        assert_eq!(joined.player.name, "Ash");
        assert_eq!(joined.player.token.len(), talebound_domain::TOKEN_LENGTH);
        assert_eq!(joined.player.session_id, joined.session.id());
    }

    #[tokio::test]
    async fn full_session_is_refused() {
        let mut players = MockPlayerRepo::new();
        players.expect_insert_if_room().returning(|_, _| Ok(false));

        let err = join(players).execute("ABC234", "Cato").await.unwrap_err();
        assert!(matches!(err, SessionError::SessionFull));
    }

    #[tokio::test]
    async fn blank_name_is_invalid() {
        let err = join(MockPlayerRepo::new())
            .execute("ABC234", "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));
    }
}
