//! Plain data entities.

pub mod character;
pub mod message;
pub mod player;

pub use character::{
    Character, CharacterPatch, CharacterSetup, DEFAULT_ATTRIBUTES, DEFAULT_RESOURCE_MAX,
    DEFAULT_XP_TO_NEXT_LEVEL,
};
pub use message::{Message, MessageRole, NARRATOR_NAME};
pub use player::Player;
