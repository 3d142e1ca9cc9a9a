//! Aggregates with invariants to protect.

pub mod session;

pub use session::{GameSession, TurnPhase, MAX_PLAYERS};
