//! Narration pipeline: prompt, generation, parsing and state updates.

mod gateway;
mod narrate;
mod prompt_builder;
mod update_applier;
mod update_parser;

pub use gateway::{
    GeneratorError, GeneratorSettings, Narration, NarrativeGateway, DEFAULT_MAX_TOKENS,
    DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT, FALLBACK_NARRATIONS,
};
pub use narrate::{NarrateRound, NarrationError, NarrationOutcome, RoundKind};
pub use prompt_builder::{build_prompt, render_character, DICE_RESOLUTION_CUE};
pub use update_applier::{apply_state_updates, end_of_round_pass, CharacterChanges};
pub use update_parser::{
    parse_narration, strip_special_tokens, strip_state_block, ParsedNarration,
    STATE_UPDATE_CLOSE, STATE_UPDATE_OPEN,
};
