//! Bearer-token authentication for session-scoped operations.

use std::sync::Arc;

use talebound_domain::{Player, SessionId};

use crate::infrastructure::ports::{PlayerRepo, RepoError};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,
    #[error("Unknown bearer token")]
    InvalidToken,
    #[error("Token does not belong to this session")]
    WrongSession,
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

pub struct Authenticate {
    players: Arc<dyn PlayerRepo>,
}

impl Authenticate {
    pub fn new(players: Arc<dyn PlayerRepo>) -> Self {
        Self { players }
    }

    /// Resolve the player behind `token` and check it belongs to `session_id`.
    pub async fn execute(
        &self,
        token: Option<&str>,
        session_id: SessionId,
    ) -> Result<Player, AuthError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let player = self
            .players
            .get_by_token(token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if player.session_id != session_id {
            tracing::debug!(
                session_id = %session_id,
                player_id = %player.id,
                "Token used against another session"
            );
            return Err(AuthError::WrongSession);
        }

        Ok(player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::MockPlayerRepo;
    use chrono::Utc;

    fn authenticate(player: Option<Player>) -> Authenticate {
        let mut players = MockPlayerRepo::new();
        players
            .expect_get_by_token()
            .returning(move |_| Ok(player.clone()));
        Authenticate::new(Arc::new(players))
    }

    #[tokio::test]
    async fn missing_token_is_rejected_before_lookup() {
        let auth = Authenticate::new(Arc::new(MockPlayerRepo::new()));
        let err = auth.execute(Some("  "), SessionId::new()).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let err = authenticate(None)
            .execute(Some("nope"), SessionId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn token_for_another_session_is_forbidden() {
        let player = Player::new(SessionId::new(), "Ash", "tok", Utc::now());
        let err = authenticate(Some(player))
            .execute(Some("tok"), SessionId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WrongSession));
    }

    #[tokio::test]
    async fn matching_token_returns_player() {
        let session_id = SessionId::new();
        let player = Player::new(session_id, "Ash", "tok", Utc::now());
        let found = authenticate(Some(player.clone()))
            .execute(Some("tok"), session_id)
            .await
            .unwrap();
        assert_eq!(found.id, player.id);
    }
}
