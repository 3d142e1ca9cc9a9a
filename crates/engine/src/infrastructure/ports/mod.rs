//! Port traits for infrastructure boundaries.
//!
//! Ports exist for:
//! - Database access (SQLite today)
//! - Narrative generation (any OpenAI-compatible endpoint)
//! - Clock/Random (for testing)

mod error;
mod external;
mod repos;
mod testing;

// =============================================================================
// Repository Ports
// =============================================================================
pub use repos::{
    ActionRecord, CharacterRepo, MessageRepo, NarrationClaim, PlayerRepo, RoundCommit, SessionRepo,
    TurnRepo,
};

#[cfg(test)]
pub use repos::{
    MockCharacterRepo, MockMessageRepo, MockPlayerRepo, MockSessionRepo, MockTurnRepo,
};

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::{ChatMessage, ChatRole, FinishReason, LlmPort, LlmRequest, LlmResponse};

#[cfg(test)]
pub use external::MockLlmPort;

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::{ClockPort, RandomPort};

#[cfg(test)]
pub use testing::{MockClockPort, MockRandomPort};

// =============================================================================
// Error Types
// =============================================================================
pub use error::{LlmError, RepoError};
