//! Character resource, status-effect and ability value objects.

use serde::{Deserialize, Serialize};

/// A current/max resource pair (hit points, mana points)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePool {
    pub current: i32,
    pub max: i32,
}

impl ResourcePool {
    pub fn new(current: i32, max: i32) -> Self {
        Self { current, max }
    }

    /// Full pool at the given maximum.
    pub fn full(max: i32) -> Self {
        Self { current: max, max }
    }

    /// Clamp `current` into [0, max], flooring `max` at 0.
    pub fn clamped(self) -> Self {
        let max = self.max.max(0);
        Self {
            current: self.current.clamp(0, max),
            max,
        }
    }
}

/// A temporary or permanent condition on a character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEffect {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Remaining rounds; `None` means permanent until removed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}

impl StatusEffect {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            duration: None,
            severity: None,
        }
    }

    pub fn with_duration(mut self, duration: i32) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Advance one round. Returns `false` once the effect has run out.
    pub fn tick(&mut self) -> bool {
        match self.duration {
            Some(remaining) => {
                let next = remaining.saturating_sub(1);
                self.duration = Some(next);
                next > 0
            }
            None => true,
        }
    }
}

/// A named ability with a cooldown measured in rounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ability {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Total cooldown length applied when the ability is used
    #[serde(default)]
    pub cooldown: i32,
    /// Rounds remaining until the ability is ready again
    #[serde(default)]
    pub current_cooldown: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub ability_type: Option<String>,
}

impl Ability {
    pub fn new(name: impl Into<String>, description: impl Into<String>, cooldown: i32) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            cooldown,
            current_cooldown: 0,
            power: None,
            ability_type: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.current_cooldown <= 0
    }

    /// Put the ability on its full cooldown.
    pub fn trigger(&mut self) {
        self.current_cooldown = self.cooldown.max(0);
    }

    /// Advance one round, never going below zero.
    pub fn tick(&mut self) {
        self.current_cooldown = self.current_cooldown.saturating_sub(1).max(0);
    }
}
