//! Talebound wire types shared by the engine and its clients.
//!
//! # Design Principles
//!
//! 1. **No business logic** - Pure data types and serialization
//! 2. **camelCase on the wire** - every struct renames its fields
//! 3. **No domain IDs** - use raw `uuid::Uuid` in DTOs; domain value objects that
//!    are already plain data (dice rolls, effects, abilities) are reused as-is

pub mod requests;
pub mod responses;

pub use requests::{
    CreateCharacterRequest, JoinSessionRequest, RollDiceRequest, SubmitActionRequest,
    UpdateCharacterRequest,
};
pub use responses::{
    ActionOutcomeResponse, CharacterCreatedResponse, CharacterDto, ErrorCode, ErrorResponse,
    HealthResponse, JoinSessionResponse, MessageDto, PlayerDto, SessionDto, SessionStateResponse,
};
