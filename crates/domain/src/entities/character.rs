//! Character entity - the shared state the narrator mutates
//!
//! Characters are created once during setup and afterwards only change through
//! narrator state updates (see [`Character::apply_changes`]), the end-of-round
//! tick, or an explicit administrative patch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::DomainError;
use crate::ids::{CharacterId, PlayerId, SessionId};
use crate::value_objects::{Ability, FieldChange, ResourceChange, ResourcePool, StatusEffect};

/// Maximum length for character names and tags
const MAX_NAME_LENGTH: usize = 200;

/// Default experience needed for level 2
pub const DEFAULT_XP_TO_NEXT_LEVEL: i32 = 100;

/// Default hit and mana point maximum for a new character
pub const DEFAULT_RESOURCE_MAX: i32 = 10;

/// Attributes a new character gets when setup supplies none
pub const DEFAULT_ATTRIBUTES: [&str; 6] = [
    "strength",
    "dexterity",
    "constitution",
    "intelligence",
    "wisdom",
    "charisma",
];

/// A player character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: CharacterId,
    pub player_id: PlayerId,
    pub session_id: SessionId,
    pub name: String,
    pub race: String,
    pub class: String,
    pub level: i32,
    pub xp: i32,
    pub xp_to_next_level: i32,
    pub hp: ResourcePool,
    pub mp: ResourcePool,
    /// Open-ended numeric attributes (strength, dexterity, ... and any extras)
    pub attributes: BTreeMap<String, i32>,
    /// Ordered item names; duplicates allowed
    pub inventory: Vec<String>,
    pub status_effects: Vec<StatusEffect>,
    pub abilities: Vec<Ability>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input collected during character setup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterSetup {
    pub name: String,
    pub race: String,
    pub class: String,
    pub max_hp: Option<i32>,
    pub max_mp: Option<i32>,
    pub attributes: BTreeMap<String, i32>,
    pub inventory: Vec<String>,
    pub abilities: Vec<Ability>,
}

/// A partial update: only `Some` fields are written
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterPatch {
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

impl CharacterPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Reject values that would break character invariants.
    pub fn validate(&self) -> Result<(), DomainError> {
        for (field, value) in [
            ("name", &self.name),
            ("race", &self.race),
            ("class", &self.class),
        ] {
            if let Some(value) = value {
                validate_text(field, value)?;
            }
        }
        if let Some(level) = self.level {
            if level < 1 {
                return Err(DomainError::validation("Level must be at least 1"));
            }
        }
        if matches!(self.xp, Some(xp) if xp < 0)
            || matches!(self.xp_to_next_level, Some(xp) if xp < 0)
        {
            return Err(DomainError::validation("Experience cannot be negative"));
        }
        Ok(())
    }

    /// Overlay `later` onto this patch; fields set in `later` win.
    pub fn merge(mut self, later: CharacterPatch) -> Self {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if later.$field.is_some() { self.$field = later.$field; })*
            };
        }
        overlay!(
            name,
            race,
            class,
            level,
            xp,
            xp_to_next_level,
            hp,
            mp,
            attributes,
            inventory,
            status_effects,
            abilities
        );
        self
    }
}

fn validate_text(field: &str, value: &str) -> Result<(), DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("Character {} cannot be empty", field)));
    }
    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(DomainError::validation(format!(
            "Character {} cannot exceed {} characters",
            field, MAX_NAME_LENGTH
        )));
    }
    Ok(())
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

impl Character {
    /// Build a level-1 character from setup input.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the name, race or class is empty or too
    /// long, or a resource maximum is not positive.
    pub fn create(
        player_id: PlayerId,
        session_id: SessionId,
        setup: CharacterSetup,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        validate_text("name", &setup.name)?;
        validate_text("race", &setup.race)?;
        validate_text("class", &setup.class)?;

        let max_hp = setup.max_hp.unwrap_or(DEFAULT_RESOURCE_MAX);
        let max_mp = setup.max_mp.unwrap_or(DEFAULT_RESOURCE_MAX);
        if max_hp < 1 || max_mp < 0 {
            return Err(DomainError::validation(
                "Hit points must be positive and mana points non-negative",
            ));
        }

        let attributes = if setup.attributes.is_empty() {
            DEFAULT_ATTRIBUTES
                .iter()
                .map(|a| (a.to_string(), 10))
                .collect()
        } else {
            setup.attributes
        };

        Ok(Self {
            id: CharacterId::new(),
            player_id,
            session_id,
            name: setup.name.trim().to_string(),
            race: setup.race.trim().to_string(),
            class: setup.class.trim().to_string(),
            level: 1,
            xp: 0,
            xp_to_next_level: DEFAULT_XP_TO_NEXT_LEVEL,
            hp: ResourcePool::full(max_hp),
            mp: ResourcePool::full(max_mp),
            attributes,
            inventory: setup
                .inventory
                .into_iter()
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty())
                .collect(),
            status_effects: Vec::new(),
            abilities: setup.abilities,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply narrator changes to this character.
    ///
    /// Returns a patch holding only the fields the changes touched, computed from
    /// this (freshly loaded) state. Resource pools are clamped into `[0, max]`.
    pub fn apply_changes(&mut self, changes: &[FieldChange]) -> CharacterPatch {
        let mut touched = Touched::default();

        for change in changes {
            match change {
                FieldChange::SetHp(c) => {
                    self.hp = resolve_pool(self.hp, *c);
                    touched.hp = true;
                }
                FieldChange::SetMp(c) => {
                    self.mp = resolve_pool(self.mp, *c);
                    touched.mp = true;
                }
                FieldChange::SetXp(xp) => {
                    self.xp = *xp;
                    touched.xp = true;
                }
                FieldChange::SetLevel(level) => {
                    self.level = *level;
                    touched.level = true;
                }
                FieldChange::SetXpToNextLevel(xp) => {
                    self.xp_to_next_level = *xp;
                    touched.xp_to_next_level = true;
                }
                FieldChange::AddInventory(items) => {
                    self.inventory.extend(items.iter().cloned());
                    touched.inventory = true;
                }
                FieldChange::RemoveInventory(items) => {
                    self.inventory
                        .retain(|held| !items.iter().any(|gone| same_name(held, gone)));
                    touched.inventory = true;
                }
                FieldChange::AddStatusEffect(effect) => {
                    if !self.status_effects.iter().any(|e| same_name(&e.name, &effect.name)) {
                        self.status_effects.push(effect.clone());
                        touched.status_effects = true;
                    }
                }
                FieldChange::RemoveStatusEffect(name) => {
                    self.status_effects.retain(|e| !same_name(&e.name, name));
                    touched.status_effects = true;
                }
                FieldChange::AddAbility(ability) => {
                    if !self.abilities.iter().any(|a| same_name(&a.name, &ability.name)) {
                        self.abilities.push(ability.clone());
                        touched.abilities = true;
                    }
                }
                FieldChange::UseAbility(name) => {
                    if let Some(ability) =
                        self.abilities.iter_mut().find(|a| same_name(&a.name, name))
                    {
                        ability.trigger();
                        touched.abilities = true;
                    }
                }
            }
        }

        touched.into_patch(self)
    }

    /// Advance cooldowns and timed status effects by one round.
    ///
    /// Returns a patch with the fields that actually changed (empty when nothing
    /// was on cooldown and no effect had a duration).
    pub fn end_of_round(&mut self) -> CharacterPatch {
        let mut touched = Touched::default();

        for ability in &mut self.abilities {
            if ability.current_cooldown > 0 {
                ability.tick();
                touched.abilities = true;
            }
        }

        let before = self.status_effects.len();
        let mut timed = false;
        self.status_effects.retain_mut(|effect| {
            timed |= effect.duration.is_some();
            effect.tick()
        });
        touched.status_effects = timed || before != self.status_effects.len();

        touched.into_patch(self)
    }

    /// Apply a patch in memory (mirrors what the store writes).
    pub fn apply_patch(&mut self, patch: &CharacterPatch, now: DateTime<Utc>) {
        macro_rules! assign {
            ($($field:ident),*) => {
                $(if let Some(value) = &patch.$field { self.$field = value.clone(); })*
            };
        }
        assign!(
            name,
            race,
            class,
            level,
            xp,
            xp_to_next_level,
            hp,
            mp,
            attributes,
            inventory,
            status_effects,
            abilities
        );
        self.updated_at = now;
    }
}

fn resolve_pool(current: ResourcePool, change: ResourceChange) -> ResourcePool {
    ResourcePool::new(change.current, change.max.unwrap_or(current.max)).clamped()
}

#[derive(Default)]
struct Touched {
    hp: bool,
    mp: bool,
    xp: bool,
    level: bool,
    xp_to_next_level: bool,
    inventory: bool,
    status_effects: bool,
    abilities: bool,
}

impl Touched {
    fn into_patch(self, character: &Character) -> CharacterPatch {
        CharacterPatch {
            hp: self.hp.then_some(character.hp),
            mp: self.mp.then_some(character.mp),
            xp: self.xp.then_some(character.xp),
            level: self.level.then_some(character.level),
            xp_to_next_level: self.xp_to_next_level.then_some(character.xp_to_next_level),
            inventory: self.inventory.then(|| character.inventory.clone()),
            status_effects: self.status_effects.then(|| character.status_effects.clone()),
            abilities: self.abilities.then(|| character.abilities.clone()),
            ..CharacterPatch::default()
        }
    }
}
