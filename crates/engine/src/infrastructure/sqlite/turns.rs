use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use talebound_domain::{Message, PlayerId, SessionId, TurnPhase};

use super::characters::apply_patch;
use super::messages::insert_message;
use super::rows::ts;
use crate::infrastructure::ports::{
    ActionRecord, NarrationClaim, RepoError, RoundCommit, TurnRepo,
};

/// Round-cycle writes: acted flags, the narrating claim and the round commit.
pub struct SqliteTurnRepo {
    pool: SqlitePool,
}

impl SqliteTurnRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TurnRepo for SqliteTurnRepo {
    async fn record_action(
        &self,
        player_id: PlayerId,
        message: &Message,
    ) -> Result<ActionRecord, RepoError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::database("record_action", e))?;

        let flagged = sqlx::query(
            r#"
            UPDATE players SET has_acted = 1
            WHERE id = ? AND has_acted = 0
              AND EXISTS (
                  SELECT 1 FROM sessions
                  WHERE sessions.id = players.session_id AND sessions.phase = ?
              )
            "#,
        )
        .bind(player_id.to_string())
        .bind(TurnPhase::AwaitingActions.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::database("record_action", e))?;

        if flagged.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| RepoError::database("record_action", e))?;

            let has_acted: Option<bool> =
                sqlx::query_scalar("SELECT has_acted FROM players WHERE id = ?")
                    .bind(player_id.to_string())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| RepoError::database("record_action", e))?;

            return match has_acted {
                None => Err(RepoError::not_found("Player", player_id)),
                Some(true) => Ok(ActionRecord::AlreadyActed),
                Some(false) => Ok(ActionRecord::SessionBusy),
            };
        }

        insert_message(&mut tx, message).await?;

        sqlx::query("UPDATE sessions SET last_activity_at = ? WHERE id = ?")
            .bind(ts(message.created_at))
            .bind(message.session_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepoError::database("record_action", e))?;

        tx.commit()
            .await
            .map_err(|e| RepoError::database("record_action", e))?;
        Ok(ActionRecord::Recorded)
    }

    async fn claim_narrating(
        &self,
        session_id: SessionId,
        turn: i64,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> Result<Option<NarrationClaim>, RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET phase = ?, narration_claimed_at = ?, last_activity_at = ?
            WHERE id = ? AND turn = ?
              AND (
                  phase = ?
                  OR (phase = ? AND (narration_claimed_at IS NULL OR narration_claimed_at < ?))
              )
            "#,
        )
        .bind(TurnPhase::Narrating.as_str())
        .bind(ts(now))
        .bind(ts(now))
        .bind(session_id.to_string())
        .bind(turn)
        .bind(TurnPhase::AwaitingActions.as_str())
        .bind(TurnPhase::Narrating.as_str())
        .bind(ts(stale_before))
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("claim_narrating", e))?;

        Ok((result.rows_affected() == 1).then_some(NarrationClaim {
            session_id,
            turn,
            claimed_at: now,
        }))
    }

    async fn release_narrating(&self, claim: &NarrationClaim) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions SET phase = ?, narration_claimed_at = NULL
            WHERE id = ? AND phase = ? AND narration_claimed_at = ?
            "#,
        )
        .bind(TurnPhase::AwaitingActions.as_str())
        .bind(claim.session_id.to_string())
        .bind(TurnPhase::Narrating.as_str())
        .bind(ts(claim.claimed_at))
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("release_narrating", e))?;

        if result.rows_affected() == 0 {
            tracing::debug!(session_id = %claim.session_id, "Narrating claim already gone");
        }
        Ok(())
    }

    async fn commit_round(&self, commit: RoundCommit) -> Result<(), RepoError> {
        let claim = commit.claim;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::database("commit_round", e))?;

        let released = sqlx::query(
            r#"
            UPDATE sessions
            SET turn = turn + ?, phase = ?, narration_claimed_at = NULL, last_activity_at = ?
            WHERE id = ? AND phase = ? AND narration_claimed_at = ?
            "#,
        )
        .bind(i64::from(commit.advance_turn))
        .bind(TurnPhase::AwaitingActions.as_str())
        .bind(ts(commit.now))
        .bind(claim.session_id.to_string())
        .bind(TurnPhase::Narrating.as_str())
        .bind(ts(claim.claimed_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::database("commit_round", e))?;

        if released.rows_affected() == 0 {
            return Err(RepoError::constraint(format!(
                "narrating claim on session {} is no longer held",
                claim.session_id
            )));
        }

        insert_message(&mut tx, &commit.message).await?;

        for (character_id, patch) in &commit.character_updates {
            apply_patch(&mut tx, *character_id, patch, commit.now).await?;
        }

        if commit.advance_turn {
            sqlx::query("UPDATE players SET has_acted = 0 WHERE session_id = ?")
                .bind(claim.session_id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(|e| RepoError::database("commit_round", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepoError::database("commit_round", e))?;
        Ok(())
    }
}
