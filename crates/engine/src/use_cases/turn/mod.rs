//! Round cycle use cases: actions, round resolution and the opening scene.

use std::sync::Arc;

mod error;
mod start_opening;
mod submit_action;

pub use error::TurnError;
pub use start_opening::{ForceOpening, OpeningResult, StartOpening};
pub use submit_action::{ActionOutcome, SubmitAction, MAX_ACTION_LENGTH};

/// Container for round cycle use cases.
pub struct TurnUseCases {
    pub submit_action: Arc<SubmitAction>,
    pub start_opening: Arc<StartOpening>,
    pub force_opening: Arc<ForceOpening>,
}

impl TurnUseCases {
    pub fn new(
        submit_action: Arc<SubmitAction>,
        start_opening: Arc<StartOpening>,
        force_opening: Arc<ForceOpening>,
    ) -> Self {
        Self {
            submit_action,
            start_opening,
            force_opening,
        }
    }
}
