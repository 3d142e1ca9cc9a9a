//! Talebound domain: sessions, players, characters, transcript messages, dice and
//! the narrator state-update vocabulary.
//!
//! Nothing in this crate performs I/O; the current time is always passed in.

pub mod aggregates;
pub mod entities;
pub mod error;
pub mod ids;
pub mod value_objects;

pub use aggregates::{GameSession, TurnPhase, MAX_PLAYERS};
pub use entities::{
    Character, CharacterPatch, CharacterSetup, Message, MessageRole, Player, NARRATOR_NAME,
};
pub use error::DomainError;
pub use ids::{CharacterId, MessageId, PlayerId, SessionId};
pub use value_objects::{
    generate_player_token, Ability, CharacterStateUpdate, DiceFormula, DiceParseError, DiceRoll,
    FieldChange, JoinCode, ResourceChange, ResourcePool, SkippedField, StateUpdateSet,
    StatusEffect, JOIN_CODE_LENGTH, TOKEN_LENGTH,
};
