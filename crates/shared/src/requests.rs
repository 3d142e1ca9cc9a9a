//! Request bodies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use talebound_domain::{Ability, DiceRoll, ResourcePool, StatusEffect};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSessionRequest {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCharacterRequest {
    pub name: String,
    pub race: String,
    pub class: String,
    #[serde(default)]
    pub max_hp: Option<i32>,
    #[serde(default)]
    pub max_mp: Option<i32>,
    #[serde(default)]
    pub attributes: BTreeMap<String, i32>,
    #[serde(default)]
    pub inventory: Vec<String>,
    #[serde(default)]
    pub abilities: Vec<Ability>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitActionRequest {
    pub content: String,
    /// A roll made with `POST /api/dice/roll` for this action
    #[serde(default)]
    pub dice_roll: Option<DiceRoll>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollDiceRequest {
    pub notation: String,
}

/// Administrative character edit; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCharacterRequest {
    pub name: Option<String>,
    pub race: Option<String>,
    pub class: Option<String>,
    pub level: Option<i32>,
    pub xp: Option<i32>,
    pub xp_to_next_level: Option<i32>,
    pub hp: Option<ResourcePool>,
    pub mp: Option<ResourcePool>,
    pub attributes: Option<BTreeMap<String, i32>>,
    pub inventory: Option<Vec<String>>,
    pub status_effects: Option<Vec<StatusEffect>>,
    pub abilities: Option<Vec<Ability>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_character_defaults_optional_lists() {
        let req: CreateCharacterRequest =
            serde_json::from_str(r#"{"name":"Mira","race":"Elf","class":"Ranger","maxHp":14}"#)
                .unwrap();
        assert_eq!(req.max_hp, Some(14));
        assert!(req.attributes.is_empty());
        assert!(req.abilities.is_empty());
    }

    #[test]
    fn submit_action_accepts_dice_roll() {
        let req: SubmitActionRequest = serde_json::from_str(
            r#"{"content":"I swing","diceRoll":{"notation":"1d20+2","total":15,"rolls":[13]}}"#,
        )
        .unwrap();
        assert_eq!(req.dice_roll.map(|r| r.total), Some(15));
    }
}
