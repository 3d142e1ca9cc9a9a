//! Stand-alone dice rolls for players preparing an action.

use talebound_domain::{DiceFormula, DiceParseError, DiceRoll};

#[derive(Debug, Default)]
pub struct RollDice;

impl RollDice {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(&self, notation: &str) -> Result<DiceRoll, DiceParseError> {
        let roll = DiceFormula::parse(notation)?.roll();
        tracing::debug!(notation = %roll.notation, total = roll.total, "Dice rolled");
        Ok(roll)
    }
}
