use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::SqlitePool;
use talebound_domain::{GameSession, JoinCode, SessionId, TurnPhase};

use super::rows::{col, parse_ts, parse_uuid, ts, write_err};
use crate::infrastructure::ports::{RepoError, SessionRepo};

const SELECT_SESSION: &str =
    "SELECT id, join_code, turn, phase, created_at, last_activity_at FROM sessions";

pub struct SqliteSessionRepo {
    pool: SqlitePool,
}

impl SqliteSessionRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_session(row: &SqliteRow) -> Result<GameSession, RepoError> {
    let id: String = col(row, "id")?;
    let code: String = col(row, "join_code")?;
    let phase: String = col(row, "phase")?;
    let created_at: String = col(row, "created_at")?;
    let last_activity_at: String = col(row, "last_activity_at")?;

    let join_code = JoinCode::new(code).map_err(RepoError::serialization)?;
    let phase: TurnPhase = phase.parse().map_err(RepoError::serialization)?;
    let created_at = parse_ts(&created_at)?;

    Ok(GameSession::new(join_code, created_at)
        .with_id(SessionId::from_uuid(parse_uuid(&id)?))
        .with_turn(col(row, "turn")?)
        .with_phase(phase)
        .with_last_activity_at(parse_ts(&last_activity_at)?))
}

#[async_trait]
impl SessionRepo for SqliteSessionRepo {
    async fn create(&self, session: &GameSession) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, join_code, turn, phase, created_at, last_activity_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(session.id().to_string())
        .bind(session.join_code().as_str())
        .bind(session.turn())
        .bind(session.phase().as_str())
        .bind(ts(session.created_at()))
        .bind(ts(session.last_activity_at()))
        .execute(&self.pool)
        .await
        .map_err(|e| write_err("create_session", e))?;
        Ok(())
    }

    async fn get(&self, id: SessionId) -> Result<Option<GameSession>, RepoError> {
        let row = sqlx::query(&format!("{SELECT_SESSION} WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("get_session", e))?;
        row.as_ref().map(row_to_session).transpose()
    }

    async fn get_by_code(&self, code: &JoinCode) -> Result<Option<GameSession>, RepoError> {
        let row = sqlx::query(&format!("{SELECT_SESSION} WHERE join_code = ?"))
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("get_session_by_code", e))?;
        row.as_ref().map(row_to_session).transpose()
    }
}
