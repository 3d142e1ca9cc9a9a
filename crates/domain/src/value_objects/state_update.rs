//! Machine-directed character state updates emitted by the narrator.
//!
//! The narrator embeds a JSON object keyed by character name. Each character entry
//! is decoded field by field into [`FieldChange`] variants; a field with an
//! unexpected shape is recorded in [`StateUpdateSet::skipped`] and otherwise
//! ignored, so one bad field never discards the rest of the block.

use serde_json::{Map, Value};

use super::character_state::{Ability, StatusEffect};
use crate::error::DomainError;

/// A replacement for a current/max resource pair.
///
/// `max` may be omitted by the narrator, in which case the stored maximum is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceChange {
    pub current: i32,
    pub max: Option<i32>,
}

/// One validated change to a character's state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChange {
    SetHp(ResourceChange),
    SetMp(ResourceChange),
    SetXp(i32),
    SetLevel(i32),
    SetXpToNextLevel(i32),
    AddInventory(Vec<String>),
    RemoveInventory(Vec<String>),
    AddStatusEffect(StatusEffect),
    RemoveStatusEffect(String),
    AddAbility(Ability),
    UseAbility(String),
}

/// All changes addressed to one character key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterStateUpdate {
    /// The key exactly as the narrator wrote it
    pub character_key: String,
    pub changes: Vec<FieldChange>,
}

/// A field that was present but could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedField {
    pub character_key: String,
    pub field: String,
    pub reason: String,
}

/// A decoded state-update block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateUpdateSet {
    pub updates: Vec<CharacterStateUpdate>,
    pub skipped: Vec<SkippedField>,
}

impl StateUpdateSet {
    /// Decode a state-update payload.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Parse` only when the payload is not a JSON object.
    /// Character entries that are not objects, and individual malformed fields,
    /// are reported through `skipped`.
    pub fn from_json(payload: &Value) -> Result<Self, DomainError> {
        let root = payload
            .as_object()
            .ok_or_else(|| DomainError::parse("State update payload must be a JSON object"))?;

        let mut set = StateUpdateSet::default();
        for (key, entry) in root {
            let Some(fields) = entry.as_object() else {
                set.skipped.push(SkippedField {
                    character_key: key.clone(),
                    field: "*".to_string(),
                    reason: "character entry is not an object".to_string(),
                });
                continue;
            };

            let mut changes = Vec::new();
            for (field, value) in fields {
                match decode_field(field, value) {
                    Ok(mut decoded) => changes.append(&mut decoded),
                    Err(reason) => set.skipped.push(SkippedField {
                        character_key: key.clone(),
                        field: field.clone(),
                        reason,
                    }),
                }
            }

            set.updates.push(CharacterStateUpdate {
                character_key: key.clone(),
                changes,
            });
        }

        Ok(set)
    }

    pub fn is_empty(&self) -> bool {
        self.updates.iter().all(|u| u.changes.is_empty())
    }

    /// Find the update addressed to `name`, ignoring case.
    pub fn for_character(&self, name: &str) -> Option<&CharacterStateUpdate> {
        let wanted = name.trim().to_lowercase();
        self.updates
            .iter()
            .find(|u| u.character_key.trim().to_lowercase() == wanted)
    }
}

fn decode_field(field: &str, value: &Value) -> Result<Vec<FieldChange>, String> {
    let change = match field {
        "hp" => FieldChange::SetHp(resource(value)?),
        "mp" => FieldChange::SetMp(resource(value)?),
        "xp" => FieldChange::SetXp(non_negative(value)?),
        "xpToNextLevel" => FieldChange::SetXpToNextLevel(non_negative(value)?),
        "level" => {
            let level = integer(value)?;
            if level < 1 {
                return Err(format!("level must be at least 1, got {level}"));
            }
            FieldChange::SetLevel(level)
        }
        "addInventory" => FieldChange::AddInventory(names(value)?),
        "removeInventory" => FieldChange::RemoveInventory(names(value)?),
        "removeStatusEffect" => FieldChange::RemoveStatusEffect(name(value)?),
        "useAbility" => FieldChange::UseAbility(name(value)?),
        "addStatusEffect" => {
            return one_or_many(value, status_effect)
                .map(|effects| effects.into_iter().map(FieldChange::AddStatusEffect).collect())
        }
        "addAbility" => {
            return one_or_many(value, ability)
                .map(|abilities| abilities.into_iter().map(FieldChange::AddAbility).collect())
        }
        other => return Err(format!("unknown field '{other}'")),
    };
    Ok(vec![change])
}

fn integer(value: &Value) -> Result<i32, String> {
    let n = value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.round() as i64))
        .ok_or_else(|| format!("expected a number, got {value}"))?;
    i32::try_from(n).map_err(|_| format!("number {n} out of range"))
}

fn non_negative(value: &Value) -> Result<i32, String> {
    let n = integer(value)?;
    if n < 0 {
        return Err(format!("expected a non-negative number, got {n}"));
    }
    Ok(n)
}

fn resource(value: &Value) -> Result<ResourceChange, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| format!("expected {{current, max}}, got {value}"))?;
    let current = obj
        .get("current")
        .ok_or_else(|| "missing 'current'".to_string())
        .and_then(integer)?;
    let max = obj.get("max").map(integer).transpose()?;
    Ok(ResourceChange { current, max })
}

fn name(value: &Value) -> Result<String, String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| format!("expected a non-empty name, got {value}"))
}

/// A single name or a list of names. Non-string list entries are dropped.
fn names(value: &Value) -> Result<Vec<String>, String> {
    match value {
        Value::String(_) => Ok(vec![name(value)?]),
        Value::Array(items) => Ok(items.iter().filter_map(|v| name(v).ok()).collect()),
        other => Err(format!("expected a name or list of names, got {other}")),
    }
}

fn one_or_many<T>(value: &Value, decode: fn(&Value) -> Result<T, String>) -> Result<Vec<T>, String> {
    match value {
        Value::Array(items) => Ok(items.iter().filter_map(|v| decode(v).ok()).collect()),
        single => Ok(vec![decode(single)?]),
    }
}

fn object_with_name(value: &Value) -> Result<Map<String, Value>, String> {
    match value {
        Value::String(_) => {
            let mut map = Map::new();
            map.insert("name".to_string(), Value::String(name(value)?));
            Ok(map)
        }
        Value::Object(obj) => {
            let mut obj = obj.clone();
            let trimmed = obj.get("name").map(name).transpose()?.ok_or("missing 'name'")?;
            obj.insert("name".to_string(), Value::String(trimmed));
            Ok(obj)
        }
        other => Err(format!("expected an object with a name, got {other}")),
    }
}

fn status_effect(value: &Value) -> Result<StatusEffect, String> {
    let obj = object_with_name(value)?;
    let name = obj.get("name").and_then(Value::as_str).unwrap_or_default().to_string();

    Ok(StatusEffect {
        name,
        description: obj.get("description").and_then(Value::as_str).map(str::to_string),
        duration: obj.get("duration").and_then(|v| integer(v).ok()),
        severity: obj.get("severity").and_then(Value::as_str).map(str::to_string),
    })
}

fn ability(value: &Value) -> Result<Ability, String> {
    let obj = object_with_name(value)?;
    let name = obj.get("name").and_then(Value::as_str).unwrap_or_default();
    let description = obj.get("description").and_then(Value::as_str).unwrap_or_default();
    let cooldown = obj
        .get("cooldown")
        .and_then(|v| integer(v).ok())
        .unwrap_or(0)
        .max(0);

    let mut ability = Ability::new(name, description, cooldown);
    ability.current_cooldown = obj
        .get("currentCooldown")
        .and_then(|v| integer(v).ok())
        .unwrap_or(0)
        .max(0);
    ability.power = obj.get("power").and_then(Value::as_str).map(str::to_string);
    ability.ability_type = obj.get("type").and_then(Value::as_str).map(str::to_string);
    Ok(ability)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_every_recognized_field() {
        let payload = json!({
            "Mira": {
                "hp": {"current": 8, "max": 12},
                "mp": {"current": 3},
                "xp": 25,
                "level": 2,
                "xpToNextLevel": 200,
                "addInventory": ["Iron Sword", "Rope"],
                "removeInventory": "Torch",
                "addStatusEffect": {"name": "Poisoned", "duration": 2, "severity": "minor"},
                "removeStatusEffect": "Blessed",
                "addAbility": {"name": "Cleave", "description": "Wide swing", "cooldown": 3},
                "useAbility": "Second Wind"
            }
        });

        let set = StateUpdateSet::from_json(&payload).unwrap();
        assert!(set.skipped.is_empty());
        let mira = set.for_character("mira").unwrap();
        assert_eq!(mira.changes.len(), 11);
        assert!(mira.changes.contains(&FieldChange::SetMp(ResourceChange {
            current: 3,
            max: None
        })));
        assert!(mira
            .changes
            .contains(&FieldChange::RemoveInventory(vec!["Torch".to_string()])));
        assert!(mira.changes.iter().any(|c| matches!(
            c,
            FieldChange::AddStatusEffect(e) if e.name == "Poisoned" && e.duration == Some(2)
        )));
    }

    #[test]
    fn type_mismatch_skips_only_that_field() {
        let payload = json!({
            "Bram": {
                "xp": "lots",
                "hp": 5,
                "level": 0,
                "addInventory": ["Lantern"],
                "teleport": true
            }
        });

        let set = StateUpdateSet::from_json(&payload).unwrap();
        let bram = set.for_character("Bram").unwrap();
        assert_eq!(
            bram.changes,
            vec![FieldChange::AddInventory(vec!["Lantern".to_string()])]
        );
        let skipped: Vec<&str> = set.skipped.iter().map(|s| s.field.as_str()).collect();
        assert_eq!(skipped.len(), 4);
        assert!(skipped.contains(&"teleport"));
    }

    #[test]
    fn empty_entry_means_no_change() {
        let set = StateUpdateSet::from_json(&json!({"Mira": {}})).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.updates.len(), 1);
    }

    #[test]
    fn non_object_payload_is_a_parse_error() {
        assert!(StateUpdateSet::from_json(&json!(["Mira"])).is_err());
        let set = StateUpdateSet::from_json(&json!({"Mira": 3})).unwrap();
        assert!(set.updates.is_empty());
        assert_eq!(set.skipped.len(), 1);
    }

    #[test]
    fn status_effect_accepts_bare_name_and_lists() {
        let set = StateUpdateSet::from_json(&json!({
            "Mira": {"addStatusEffect": ["Hasted", {"name": "Shielded", "duration": 1}, 42]}
        }))
        .unwrap();
        let changes = &set.for_character("MIRA").unwrap().changes;
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0], FieldChange::AddStatusEffect(StatusEffect::named("Hasted")));
    }
}
