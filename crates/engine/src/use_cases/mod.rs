//! Use cases - User story orchestration.
//!
//! Each module contains use cases for one area of the game. Use cases
//! orchestrate the store ports and the narration pipeline.

pub mod character;
pub mod dice;
pub mod narration;
pub mod session;
pub mod turn;

pub use character::CharacterUseCases;
pub use dice::RollDice;
pub use session::SessionUseCases;
pub use turn::TurnUseCases;
