use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{SqliteConnection, SqlitePool};
use talebound_domain::{DiceRoll, Message, MessageId, MessageRole, PlayerId, SessionId};

use super::rows::{col, from_json, parse_ts, parse_uuid, to_json, ts, write_err};
use crate::infrastructure::ports::{MessageRepo, RepoError};

pub struct SqliteMessageRepo {
    pool: SqlitePool,
}

impl SqliteMessageRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_message(row: &SqliteRow) -> Result<Message, RepoError> {
    let id: String = col(row, "id")?;
    let session_id: String = col(row, "session_id")?;
    let player_id: Option<String> = col(row, "player_id")?;
    let role: String = col(row, "role")?;
    let dice_roll: Option<String> = col(row, "dice_roll_json")?;
    let state_updates: Option<String> = col(row, "state_updates_json")?;
    let created_at: String = col(row, "created_at")?;

    Ok(Message {
        id: MessageId::from_uuid(parse_uuid(&id)?),
        session_id: SessionId::from_uuid(parse_uuid(&session_id)?),
        player_id: player_id
            .as_deref()
            .map(parse_uuid)
            .transpose()?
            .map(PlayerId::from_uuid),
        role: MessageRole::parse(&role)
            .ok_or_else(|| RepoError::serialization(format!("unknown message role '{}'", role)))?,
        author_name: col(row, "author_name")?,
        content: col(row, "content")?,
        dice_roll: dice_roll.as_deref().map(from_json::<DiceRoll>).transpose()?,
        state_updates: state_updates
            .as_deref()
            .map(from_json::<serde_json::Value>)
            .transpose()?,
        created_at: parse_ts(&created_at)?,
    })
}

pub(super) async fn insert_message(
    conn: &mut SqliteConnection,
    message: &Message,
) -> Result<(), RepoError> {
    sqlx::query(
        r#"
        INSERT INTO messages (
            id, session_id, player_id, role, author_name, content,
            dice_roll_json, state_updates_json, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(message.id.to_string())
    .bind(message.session_id.to_string())
    .bind(message.player_id.map(|id| id.to_string()))
    .bind(message.role.as_str())
    .bind(&message.author_name)
    .bind(&message.content)
    .bind(message.dice_roll.as_ref().map(to_json).transpose()?)
    .bind(message.state_updates.as_ref().map(to_json).transpose()?)
    .bind(ts(message.created_at))
    .execute(&mut *conn)
    .await
    .map_err(|e| write_err("insert_message", e))?;
    Ok(())
}

#[async_trait]
impl MessageRepo for SqliteMessageRepo {
    async fn list_for_session(&self, session_id: SessionId) -> Result<Vec<Message>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT id, session_id, player_id, role, author_name, content,
                   dice_roll_json, state_updates_json, created_at
            FROM messages
            WHERE session_id = ?
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(session_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("list_messages", e))?;
        rows.iter().map(row_to_message).collect()
    }

    async fn count_for_session(&self, session_id: SessionId) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE session_id = ?")
            .bind(session_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::database("count_messages", e))?;
        Ok(count.max(0) as u64)
    }
}
