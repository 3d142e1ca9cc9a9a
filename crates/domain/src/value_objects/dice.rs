//! Dice rolling value objects and parsing
//!
//! Supports notation like "1d20+5", "2d6-1", "3D8". The count is required and the
//! die marker is case-insensitive. Individual die results are kept for display;
//! the modifier is applied to the total only.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum number of dice in a single notation
pub const MAX_DICE_COUNT: u32 = 100;
/// Maximum number of sides on a single die
pub const MAX_DIE_SIZE: u32 = 1000;
/// Maximum absolute modifier
pub const MAX_MODIFIER: i32 = 10_000;

/// Error when parsing dice notation or validating a recorded roll
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceParseError {
    /// The notation string is empty
    #[error("Empty dice notation")]
    Empty,
    /// Invalid format - expected XdY or XdY+Z
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
    /// Dice count must be at least 1
    #[error("Dice count must be between 1 and {MAX_DICE_COUNT}")]
    InvalidDiceCount,
    /// Die size must be at least 1
    #[error("Die size must be between 1 and {MAX_DIE_SIZE}")]
    InvalidDieSize,
    /// Modifier out of range
    #[error("Modifier must be between -{MAX_MODIFIER} and {MAX_MODIFIER}")]
    ModifierOutOfRange,
    /// A recorded roll does not match its own notation
    #[error("Dice roll does not match notation: {0}")]
    InconsistentRoll(String),
}

/// A parsed dice notation like "2d6+3"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceFormula {
    /// Number of dice to roll (X in XdY)
    pub dice_count: u32,
    /// Size of each die (Y in XdY)
    pub die_size: u32,
    /// Modifier to add/subtract after rolling (+Z or -Z)
    pub modifier: i32,
}

impl DiceFormula {
    /// Create a new dice formula
    pub fn new(dice_count: u32, die_size: u32, modifier: i32) -> Result<Self, DiceParseError> {
        if dice_count == 0 || dice_count > MAX_DICE_COUNT {
            return Err(DiceParseError::InvalidDiceCount);
        }
        if die_size == 0 || die_size > MAX_DIE_SIZE {
            return Err(DiceParseError::InvalidDieSize);
        }
        if modifier.abs() > MAX_MODIFIER {
            return Err(DiceParseError::ModifierOutOfRange);
        }
        Ok(Self {
            dice_count,
            die_size,
            modifier,
        })
    }

    /// Parse a dice notation string like "1d20+5", "2d6-1", "1d100"
    ///
    /// Supported formats:
    /// - "XdY" - Roll X dice of size Y
    /// - "XdY+Z" - Roll X dice of size Y, add Z
    /// - "XdY-Z" - Roll X dice of size Y, subtract Z
    pub fn parse(input: &str) -> Result<Self, DiceParseError> {
        let input = input.trim().to_ascii_lowercase();
        if input.is_empty() {
            return Err(DiceParseError::Empty);
        }

        let (count_str, after_d) = input.split_once('d').ok_or_else(|| {
            DiceParseError::InvalidNotation(format!("Missing 'd' separator in '{}'", input))
        })?;

        let dice_count = parse_digits(count_str).ok_or_else(|| {
            DiceParseError::InvalidNotation(format!("Invalid dice count: '{}'", count_str))
        })?;

        let (sides_str, modifier) = match after_d.find(['+', '-']) {
            Some(pos) => {
                let sign = if after_d.as_bytes()[pos] == b'-' { -1 } else { 1 };
                let mod_str = &after_d[pos + 1..];
                let magnitude = parse_digits(mod_str).ok_or_else(|| {
                    DiceParseError::InvalidNotation(format!("Invalid modifier: '{}'", &after_d[pos..]))
                })?;
                let magnitude =
                    i32::try_from(magnitude).map_err(|_| DiceParseError::ModifierOutOfRange)?;
                (&after_d[..pos], sign * magnitude)
            }
            None => (after_d, 0),
        };

        let die_size = parse_digits(sides_str).ok_or_else(|| {
            DiceParseError::InvalidNotation(format!("Invalid die size: '{}'", sides_str))
        })?;

        Self::new(dice_count, die_size, modifier)
    }

    /// Roll the dice using the thread-local gameplay RNG
    pub fn roll(&self) -> DiceRoll {
        self.roll_with(&mut rand::thread_rng())
    }

    /// Roll the dice with a caller-supplied RNG
    pub fn roll_with<R: Rng + ?Sized>(&self, rng: &mut R) -> DiceRoll {
        let rolls: Vec<i32> = (0..self.dice_count)
            .map(|_| rng.gen_range(1..=self.die_size) as i32)
            .collect();
        let total = rolls.iter().sum::<i32>() + self.modifier;

        DiceRoll {
            notation: self.display(),
            total,
            rolls,
        }
    }

    /// Get the minimum possible roll
    pub fn min_roll(&self) -> i32 {
        self.dice_count as i32 + self.modifier
    }

    /// Get the maximum possible roll
    pub fn max_roll(&self) -> i32 {
        (self.dice_count * self.die_size) as i32 + self.modifier
    }

    /// Format as canonical notation (e.g., "1d20+5")
    pub fn display(&self) -> String {
        if self.modifier == 0 {
            format!("{}d{}", self.dice_count, self.die_size)
        } else {
            format!("{}d{}{:+}", self.dice_count, self.die_size, self.modifier)
        }
    }
}

impl fmt::Display for DiceFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Digits only; `str::parse` alone would also accept a leading '+'.
fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// A resolved dice roll as stored alongside a player message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceRoll {
    /// The notation that was rolled
    pub notation: String,
    /// Final total (sum of rolls + modifier)
    pub total: i32,
    /// Individual die results, modifier excluded
    pub rolls: Vec<i32>,
}

impl DiceRoll {
    /// Check that a client-supplied roll is consistent with its own notation.
    pub fn verify(&self) -> Result<DiceFormula, DiceParseError> {
        let formula = DiceFormula::parse(&self.notation)?;

        if self.rolls.len() != formula.dice_count as usize {
            return Err(DiceParseError::InconsistentRoll(format!(
                "expected {} rolls, got {}",
                formula.dice_count,
                self.rolls.len()
            )));
        }
        if let Some(bad) = self
            .rolls
            .iter()
            .find(|r| **r < 1 || **r > formula.die_size as i32)
        {
            return Err(DiceParseError::InconsistentRoll(format!(
                "roll {} outside 1..={}",
                bad, formula.die_size
            )));
        }
        let expected = self.rolls.iter().sum::<i32>() + formula.modifier;
        if expected != self.total {
            return Err(DiceParseError::InconsistentRoll(format!(
                "total {} does not equal {}",
                self.total, expected
            )));
        }

        Ok(formula)
    }

    /// Format as a breakdown string (e.g., "2d6+3 → [4, 5] = 12")
    pub fn breakdown(&self) -> String {
        let rolls: Vec<String> = self.rolls.iter().map(|r| r.to_string()).collect();
        format!("{} → [{}] = {}", self.notation, rolls.join(", "), self.total)
    }
}
