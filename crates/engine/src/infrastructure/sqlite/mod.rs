//! SQLite game store.
//!
//! One pool shared by a repository struct per port. Sessions own players,
//! characters and messages through `ON DELETE CASCADE`.

mod characters;
mod messages;
mod players;
mod rows;
mod sessions;
mod turns;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::infrastructure::ports::RepoError;

pub use characters::SqliteCharacterRepo;
pub use messages::SqliteMessageRepo;
pub use players::SqlitePlayerRepo;
pub use sessions::SqliteSessionRepo;
pub use turns::SqliteTurnRepo;

const SCHEMA: [&str; 6] = [
    r#"
    CREATE TABLE IF NOT EXISTS sessions (
        id TEXT PRIMARY KEY,
        join_code TEXT NOT NULL UNIQUE,
        turn INTEGER NOT NULL DEFAULT 1,
        phase TEXT NOT NULL DEFAULT 'awaiting-actions',
        narration_claimed_at TEXT,
        created_at TEXT NOT NULL,
        last_activity_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS players (
        id TEXT PRIMARY KEY,
        session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        token TEXT NOT NULL UNIQUE,
        has_acted INTEGER NOT NULL DEFAULT 0,
        joined_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS characters (
        id TEXT PRIMARY KEY,
        player_id TEXT NOT NULL UNIQUE REFERENCES players(id) ON DELETE CASCADE,
        session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        race TEXT NOT NULL,
        class TEXT NOT NULL,
        level INTEGER NOT NULL,
        xp INTEGER NOT NULL,
        xp_to_next_level INTEGER NOT NULL,
        hp_current INTEGER NOT NULL,
        hp_max INTEGER NOT NULL,
        mp_current INTEGER NOT NULL,
        mp_max INTEGER NOT NULL,
        attributes_json TEXT NOT NULL,
        inventory_json TEXT NOT NULL,
        status_effects_json TEXT NOT NULL,
        abilities_json TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS messages (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
        player_id TEXT REFERENCES players(id) ON DELETE SET NULL,
        role TEXT NOT NULL,
        author_name TEXT NOT NULL,
        content TEXT NOT NULL,
        dice_roll_json TEXT,
        state_updates_json TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_players_session ON players(session_id)",
    "CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id, created_at, seq)",
];

/// All SQLite repositories over one pool.
#[derive(Clone)]
pub struct SqliteRepositories {
    pub pool: SqlitePool,
    pub session: Arc<SqliteSessionRepo>,
    pub player: Arc<SqlitePlayerRepo>,
    pub character: Arc<SqliteCharacterRepo>,
    pub message: Arc<SqliteMessageRepo>,
    pub turn: Arc<SqliteTurnRepo>,
}

impl SqliteRepositories {
    /// Connect (creating the database file if needed) and ensure the schema.
    pub async fn connect(database_url: &str) -> Result<Self, RepoError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| RepoError::database("connect", e))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| RepoError::database("connect", e))?;

        ensure_schema(&pool).await?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            session: Arc::new(SqliteSessionRepo::new(pool.clone())),
            player: Arc::new(SqlitePlayerRepo::new(pool.clone())),
            character: Arc::new(SqliteCharacterRepo::new(pool.clone())),
            message: Arc::new(SqliteMessageRepo::new(pool.clone())),
            turn: Arc::new(SqliteTurnRepo::new(pool.clone())),
            pool,
        }
    }
}

pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), RepoError> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| RepoError::database("schema", e))?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::SqliteRepositories;
    use tempfile::TempDir;

    /// A fresh store in a temp directory; keep the `TempDir` alive for the test.
    pub async fn temp_store() -> (SqliteRepositories, TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("talebound.db").display());
        let repos = SqliteRepositories::connect(&url).await.expect("connect");
        (repos, dir)
    }
}
