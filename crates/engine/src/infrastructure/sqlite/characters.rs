use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{SqliteConnection, SqlitePool};
use talebound_domain::{
    Character, CharacterId, CharacterPatch, PlayerId, ResourcePool, SessionId,
};

use super::rows::{col, from_json, parse_ts, parse_uuid, to_json, ts, write_err};
use crate::infrastructure::ports::{CharacterRepo, RepoError};

const SELECT_CHARACTER: &str = r#"
    SELECT id, player_id, session_id, name, race, class, level, xp, xp_to_next_level,
           hp_current, hp_max, mp_current, mp_max,
           attributes_json, inventory_json, status_effects_json, abilities_json,
           created_at, updated_at
    FROM characters
"#;

pub struct SqliteCharacterRepo {
    pool: SqlitePool,
}

impl SqliteCharacterRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(
        &self,
        operation: &'static str,
        clause: &str,
        key: String,
    ) -> Result<Option<Character>, RepoError> {
        let row = sqlx::query(&format!("{SELECT_CHARACTER} WHERE {clause}"))
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database(operation, e))?;
        row.as_ref().map(row_to_character).transpose()
    }
}

fn row_to_character(row: &SqliteRow) -> Result<Character, RepoError> {
    let id: String = col(row, "id")?;
    let player_id: String = col(row, "player_id")?;
    let session_id: String = col(row, "session_id")?;
    let attributes: String = col(row, "attributes_json")?;
    let inventory: String = col(row, "inventory_json")?;
    let status_effects: String = col(row, "status_effects_json")?;
    let abilities: String = col(row, "abilities_json")?;
    let created_at: String = col(row, "created_at")?;
    let updated_at: String = col(row, "updated_at")?;

    Ok(Character {
        id: CharacterId::from_uuid(parse_uuid(&id)?),
        player_id: PlayerId::from_uuid(parse_uuid(&player_id)?),
        session_id: SessionId::from_uuid(parse_uuid(&session_id)?),
        name: col(row, "name")?,
        race: col(row, "race")?,
        class: col(row, "class")?,
        level: col(row, "level")?,
        xp: col(row, "xp")?,
        xp_to_next_level: col(row, "xp_to_next_level")?,
        hp: ResourcePool::new(col(row, "hp_current")?, col(row, "hp_max")?),
        mp: ResourcePool::new(col(row, "mp_current")?, col(row, "mp_max")?),
        attributes: from_json(&attributes)?,
        inventory: from_json(&inventory)?,
        status_effects: from_json(&status_effects)?,
        abilities: from_json(&abilities)?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

fn opt_json<T: serde::Serialize>(value: &Option<T>) -> Result<Option<String>, RepoError> {
    value.as_ref().map(to_json).transpose()
}

/// Write the `Some` fields of a patch in a single statement.
pub(super) async fn apply_patch(
    conn: &mut SqliteConnection,
    id: CharacterId,
    patch: &CharacterPatch,
    now: DateTime<Utc>,
) -> Result<(), RepoError> {
    let result = sqlx::query(
        r#"
        UPDATE characters SET
            name = COALESCE(?, name),
            race = COALESCE(?, race),
            class = COALESCE(?, class),
            level = COALESCE(?, level),
            xp = COALESCE(?, xp),
            xp_to_next_level = COALESCE(?, xp_to_next_level),
            hp_current = COALESCE(?, hp_current),
            hp_max = COALESCE(?, hp_max),
            mp_current = COALESCE(?, mp_current),
            mp_max = COALESCE(?, mp_max),
            attributes_json = COALESCE(?, attributes_json),
            inventory_json = COALESCE(?, inventory_json),
            status_effects_json = COALESCE(?, status_effects_json),
            abilities_json = COALESCE(?, abilities_json),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(patch.name.as_deref())
    .bind(patch.race.as_deref())
    .bind(patch.class.as_deref())
    .bind(patch.level)
    .bind(patch.xp)
    .bind(patch.xp_to_next_level)
    .bind(patch.hp.map(|p| p.current))
    .bind(patch.hp.map(|p| p.max))
    .bind(patch.mp.map(|p| p.current))
    .bind(patch.mp.map(|p| p.max))
    .bind(opt_json(&patch.attributes)?)
    .bind(opt_json(&patch.inventory)?)
    .bind(opt_json(&patch.status_effects)?)
    .bind(opt_json(&patch.abilities)?)
    .bind(ts(now))
    .bind(id.to_string())
    .execute(&mut *conn)
    .await
    .map_err(|e| RepoError::database("update_character", e))?;

    if result.rows_affected() == 0 {
        return Err(RepoError::not_found("Character", id));
    }
    Ok(())
}

#[async_trait]
impl CharacterRepo for SqliteCharacterRepo {
    async fn create(&self, character: &Character) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO characters (
                id, player_id, session_id, name, race, class, level, xp, xp_to_next_level,
                hp_current, hp_max, mp_current, mp_max,
                attributes_json, inventory_json, status_effects_json, abilities_json,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(character.id.to_string())
        .bind(character.player_id.to_string())
        .bind(character.session_id.to_string())
        .bind(&character.name)
        .bind(&character.race)
        .bind(&character.class)
        .bind(character.level)
        .bind(character.xp)
        .bind(character.xp_to_next_level)
        .bind(character.hp.current)
        .bind(character.hp.max)
        .bind(character.mp.current)
        .bind(character.mp.max)
        .bind(to_json(&character.attributes)?)
        .bind(to_json(&character.inventory)?)
        .bind(to_json(&character.status_effects)?)
        .bind(to_json(&character.abilities)?)
        .bind(ts(character.created_at))
        .bind(ts(character.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| write_err("create_character", e))?;
        Ok(())
    }

    async fn get(&self, id: CharacterId) -> Result<Option<Character>, RepoError> {
        self.fetch_one_where("get_character", "id = ?", id.to_string())
            .await
    }

    async fn get_for_player(&self, player_id: PlayerId) -> Result<Option<Character>, RepoError> {
        self.fetch_one_where("get_character_for_player", "player_id = ?", player_id.to_string())
            .await
    }

    async fn list_for_session(&self, session_id: SessionId) -> Result<Vec<Character>, RepoError> {
        let rows = sqlx::query(&format!(
            "{SELECT_CHARACTER} WHERE session_id = ? ORDER BY created_at ASC, rowid ASC"
        ))
        .bind(session_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("list_characters", e))?;
        rows.iter().map(row_to_character).collect()
    }

    async fn update(
        &self,
        id: CharacterId,
        patch: &CharacterPatch,
        now: DateTime<Utc>,
    ) -> Result<(), RepoError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| RepoError::database("update_character", e))?;
        apply_patch(&mut conn, id, patch, now).await
    }
}
