use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::SqlitePool;
use talebound_domain::{Player, PlayerId, SessionId};

use super::rows::{col, parse_ts, parse_uuid, ts, write_err};
use crate::infrastructure::ports::{PlayerRepo, RepoError};

const SELECT_PLAYER: &str = "SELECT id, session_id, name, token, has_acted, joined_at FROM players";

pub struct SqlitePlayerRepo {
    pool: SqlitePool,
}

impl SqlitePlayerRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

pub(super) fn row_to_player(row: &SqliteRow) -> Result<Player, RepoError> {
    let id: String = col(row, "id")?;
    let session_id: String = col(row, "session_id")?;
    let joined_at: String = col(row, "joined_at")?;
    Ok(Player {
        id: PlayerId::from_uuid(parse_uuid(&id)?),
        session_id: SessionId::from_uuid(parse_uuid(&session_id)?),
        name: col(row, "name")?,
        token: col(row, "token")?,
        has_acted: col(row, "has_acted")?,
        joined_at: parse_ts(&joined_at)?,
    })
}

#[async_trait]
impl PlayerRepo for SqlitePlayerRepo {
    async fn insert_if_room(&self, player: &Player, max_players: usize) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"
            INSERT INTO players (id, session_id, name, token, has_acted, joined_at)
            SELECT ?, ?, ?, ?, 0, ?
            WHERE (SELECT COUNT(*) FROM players WHERE session_id = ?) < ?
            "#,
        )
        .bind(player.id.to_string())
        .bind(player.session_id.to_string())
        .bind(&player.name)
        .bind(&player.token)
        .bind(ts(player.joined_at))
        .bind(player.session_id.to_string())
        .bind(max_players as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| write_err("insert_player", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<Player>, RepoError> {
        let row = sqlx::query(&format!("{SELECT_PLAYER} WHERE token = ?"))
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("get_player_by_token", e))?;
        row.as_ref().map(row_to_player).transpose()
    }

    async fn list_for_session(&self, session_id: SessionId) -> Result<Vec<Player>, RepoError> {
        let rows = sqlx::query(&format!(
            "{SELECT_PLAYER} WHERE session_id = ? ORDER BY joined_at ASC, rowid ASC"
        ))
        .bind(session_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("list_players", e))?;
        rows.iter().map(row_to_player).collect()
    }
}
