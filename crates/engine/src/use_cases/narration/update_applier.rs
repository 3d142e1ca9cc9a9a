//! Applies decoded state updates to session characters.
//!
//! Works on freshly loaded characters in memory and collects one partial
//! update per touched character; the caller persists them with the round.

use talebound_domain::{Character, CharacterId, CharacterPatch, StateUpdateSet};

/// Pending per-character patches, in first-touched order.
#[derive(Debug, Default)]
pub struct CharacterChanges {
    entries: Vec<(CharacterId, CharacterPatch)>,
}

impl CharacterChanges {
    fn record(&mut self, id: CharacterId, patch: CharacterPatch) {
        if patch.is_empty() {
            return;
        }
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, current)) => *current = std::mem::take(current).merge(patch),
            None => self.entries.push((id, patch)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: CharacterId) -> Option<&CharacterPatch> {
        self.entries
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, patch)| patch)
    }

    pub fn into_updates(self) -> Vec<(CharacterId, CharacterPatch)> {
        self.entries
    }
}

fn names_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Apply every update whose key names a session character (case-insensitive).
///
/// Keys that match no character are ignored.
pub fn apply_state_updates(
    characters: &mut [Character],
    updates: &StateUpdateSet,
    changes: &mut CharacterChanges,
) {
    for update in &updates.updates {
        if update.changes.is_empty() {
            continue;
        }
        let Some(character) = characters
            .iter_mut()
            .find(|c| names_match(&c.name, &update.character_key))
        else {
            tracing::debug!(
                character = %update.character_key,
                "State update addressed to unknown character, ignoring"
            );
            continue;
        };

        let patch = character.apply_changes(&update.changes);
        tracing::debug!(
            character_id = %character.id,
            character = %character.name,
            changes = update.changes.len(),
            "Applied narrator state update"
        );
        changes.record(character.id, patch);
    }
}

/// Tick cooldowns and timed status effects for every character.
pub fn end_of_round_pass(characters: &mut [Character], changes: &mut CharacterChanges) {
    for character in characters.iter_mut() {
        let patch = character.end_of_round();
        changes.record(character.id, patch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use talebound_domain::{
        Ability, CharacterSetup, PlayerId, ResourcePool, SessionId, StatusEffect,
    };

    fn character(name: &str) -> Character {
        let setup = CharacterSetup {
            name: name.into(),
            race: "Human".into(),
            class: "Fighter".into(),
            max_hp: Some(12),
            inventory: vec!["Rope".into()],
            ..CharacterSetup::default()
        };
        Character::create(PlayerId::new(), SessionId::new(), setup, Utc::now()).unwrap()
    }

    fn updates(value: serde_json::Value) -> StateUpdateSet {
        StateUpdateSet::from_json(&value).unwrap()
    }

    #[test]
    fn lower_case_key_updates_capitalised_character() {
        let mut party = vec![character("Mira"), character("Tobin")];
        let mut changes = CharacterChanges::default();

        apply_state_updates(
            &mut party,
            &updates(json!({"mira": {"hp": {"current": 5, "max": 12}}})),
            &mut changes,
        );

        assert_eq!(party[0].hp, ResourcePool::new(5, 12));
        assert_eq!(party[1].hp, ResourcePool::full(12));
        assert_eq!(
            changes.get(party[0].id).and_then(|p| p.hp),
            Some(ResourcePool::new(5, 12))
        );
        assert!(changes.get(party[1].id).is_none());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut party = vec![character("Mira")];
        let mut changes = CharacterChanges::default();
        apply_state_updates(&mut party, &updates(json!({"Gandalf": {"xp": 99}})), &mut changes);
        assert!(changes.is_empty());
    }

    #[test]
    fn removing_absent_item_changes_nothing() {
        let mut party = vec![character("Mira")];
        let mut changes = CharacterChanges::default();
        apply_state_updates(
            &mut party,
            &updates(json!({"Mira": {"removeInventory": ["Torch"]}})),
            &mut changes,
        );
        assert_eq!(party[0].inventory, vec!["Rope".to_string()]);
    }

    #[test]
    fn decrement_pass_merges_with_narrator_changes() {
        let mut party = vec![character("Mira")];
        party[0].abilities = vec![Ability::new("Volley", "Arrows", 3)];
        party[0].status_effects = vec![StatusEffect::named("Stunned").with_duration(1)];
        let mut changes = CharacterChanges::default();

        apply_state_updates(
            &mut party,
            &updates(json!({"Mira": {"useAbility": "Volley", "addInventory": ["Gem"]}})),
            &mut changes,
        );
        end_of_round_pass(&mut party, &mut changes);

        let patch = changes.get(party[0].id).unwrap();
        assert_eq!(patch.abilities.as_ref().unwrap()[0].current_cooldown, 2);
        assert_eq!(patch.status_effects.as_deref(), Some(&[][..]));
        assert_eq!(
            patch.inventory.as_deref(),
            Some(&["Rope".to_string(), "Gem".to_string()][..])
        );
    }

    #[test]
    fn idle_characters_produce_no_patch() {
        let mut party = vec![character("Mira")];
        let mut changes = CharacterChanges::default();
        end_of_round_pass(&mut party, &mut changes);
        assert!(changes.is_empty());
    }
}
