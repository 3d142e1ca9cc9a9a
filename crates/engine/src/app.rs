//! Application state and composition.

use std::sync::Arc;

use crate::infrastructure::{
    clock::{SystemClock, SystemRandom},
    ports::{
        CharacterRepo, ClockPort, LlmPort, MessageRepo, PlayerRepo, RandomPort, SessionRepo,
        TurnRepo,
    },
    sqlite::SqliteRepositories,
};
use crate::use_cases;
use crate::use_cases::narration::{GeneratorSettings, NarrateRound, NarrativeGateway};

/// Main application state.
///
/// Holds all repository ports and use cases.
/// Passed to HTTP handlers via Axum state.
pub struct App {
    pub repositories: Repositories,
    pub use_cases: UseCases,
    /// Whether a generator credential is configured (reported by health)
    pub generator_configured: bool,
}

/// Container for the store ports.
pub struct Repositories {
    pub session: Arc<dyn SessionRepo>,
    pub player: Arc<dyn PlayerRepo>,
    pub character: Arc<dyn CharacterRepo>,
    pub message: Arc<dyn MessageRepo>,
    pub turn: Arc<dyn TurnRepo>,
}

/// Container for all use cases.
pub struct UseCases {
    pub session: use_cases::SessionUseCases,
    pub character: use_cases::CharacterUseCases,
    pub turn: use_cases::TurnUseCases,
    pub dice: Arc<use_cases::RollDice>,
}

impl App {
    /// Create a new App with the system clock and RNG.
    pub fn new(
        repos: SqliteRepositories,
        llm: Arc<dyn LlmPort>,
        settings: GeneratorSettings,
        generator_configured: bool,
    ) -> Self {
        Self::with_ports(
            repos,
            llm,
            settings,
            generator_configured,
            Arc::new(SystemClock),
            Arc::new(SystemRandom),
        )
    }

    /// Create a new App with every dependency supplied.
    pub fn with_ports(
        repos: SqliteRepositories,
        llm: Arc<dyn LlmPort>,
        settings: GeneratorSettings,
        generator_configured: bool,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        let repositories = Repositories {
            session: repos.session.clone(),
            player: repos.player.clone(),
            character: repos.character.clone(),
            message: repos.message.clone(),
            turn: repos.turn.clone(),
        };

        // Session
        let authenticate = Arc::new(use_cases::session::Authenticate::new(
            repositories.player.clone(),
        ));
        let get_by_code = Arc::new(use_cases::session::GetSessionByCode::new(
            repositories.session.clone(),
        ));
        let session = use_cases::SessionUseCases::new(
            authenticate.clone(),
            Arc::new(use_cases::session::CreateSession::new(
                repositories.session.clone(),
                clock.clone(),
            )),
            get_by_code.clone(),
            Arc::new(use_cases::session::JoinSession::new(
                get_by_code,
                repositories.player.clone(),
                clock.clone(),
            )),
            Arc::new(use_cases::session::GetSessionState::new(
                repositories.session.clone(),
                repositories.player.clone(),
                repositories.character.clone(),
                repositories.message.clone(),
            )),
        );

        // Narration and the round cycle
        let gateway = Arc::new(NarrativeGateway::new(llm, random, settings));
        let narrate = Arc::new(NarrateRound::new(
            repositories.character.clone(),
            repositories.player.clone(),
            repositories.message.clone(),
            repositories.turn.clone(),
            gateway,
            clock.clone(),
        ));
        let start_opening = Arc::new(use_cases::turn::StartOpening::new(
            repositories.session.clone(),
            repositories.player.clone(),
            repositories.character.clone(),
            repositories.message.clone(),
            narrate.clone(),
        ));
        let turn = use_cases::TurnUseCases::new(
            Arc::new(use_cases::turn::SubmitAction::new(
                authenticate.clone(),
                repositories.session.clone(),
                repositories.player.clone(),
                repositories.character.clone(),
                repositories.turn.clone(),
                narrate,
                clock.clone(),
            )),
            start_opening.clone(),
            Arc::new(use_cases::turn::ForceOpening::new(
                authenticate.clone(),
                start_opening.clone(),
            )),
        );

        // Characters
        let character = use_cases::CharacterUseCases::new(
            Arc::new(use_cases::character::CreateCharacter::new(
                authenticate.clone(),
                repositories.character.clone(),
                start_opening,
                clock.clone(),
            )),
            Arc::new(use_cases::character::UpdateCharacter::new(
                authenticate,
                repositories.character.clone(),
                clock,
            )),
        );

        let use_cases = UseCases {
            session,
            character,
            turn,
            dice: Arc::new(use_cases::RollDice::new()),
        };

        Self {
            repositories,
            use_cases,
            generator_configured,
        }
    }
}
