//! Value objects: dice, character state pieces, state updates, codes.

mod character_state;
mod codes;
mod dice;
mod state_update;

pub use character_state::{Ability, ResourcePool, StatusEffect};
pub use codes::{generate_player_token, JoinCode, JOIN_CODE_LENGTH, TOKEN_LENGTH};
pub use dice::{
    DiceFormula, DiceParseError, DiceRoll, MAX_DICE_COUNT, MAX_DIE_SIZE, MAX_MODIFIER,
};
pub use state_update::{
    CharacterStateUpdate, FieldChange, ResourceChange, SkippedField, StateUpdateSet,
};
