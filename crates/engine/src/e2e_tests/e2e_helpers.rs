//! Shared setup for end-to-end tests.

use std::sync::Arc;

use talebound_domain::{Character, Message, Player, SessionId};
use tempfile::TempDir;

use crate::app::App;
use crate::test_fixtures::{brom_setup, mira_setup, test_app, ScriptedLlm};
use crate::use_cases::session::SessionState;
use crate::use_cases::turn::ActionOutcome;

/// Narration used for the opening scene in most tests.
pub const OPENING: &str = "Rain hammers the roof of the Crooked Lantern inn.";

/// A seated party: two players with characters and the opening narrated.
pub struct E2ETestContext {
    pub app: Arc<App>,
    pub llm: Arc<ScriptedLlm>,
    pub session_id: SessionId,
    pub ash: Player,
    pub brin: Player,
    pub mira: Character,
    pub brom: Character,
    pub opening: Option<Message>,
    _temp_dir: TempDir,
}

impl E2ETestContext {
    /// Seat Ash (Mira) and Brin (Brom). The first scripted reply is consumed by
    /// the opening scene.
    pub async fn setup(llm: Arc<ScriptedLlm>) -> Self {
        let (app, temp_dir) = test_app(llm.clone()).await;
        let sessions = &app.use_cases.session;

        let session = sessions.create.execute().await.expect("create session");
        let code = session.join_code().as_str().to_string();
        let ash = sessions.join.execute(&code, "Ash").await.expect("join ash").player;
        let brin = sessions.join.execute(&code, "Brin").await.expect("join brin").player;

        let characters = &app.use_cases.character;
        let mira = characters
            .create
            .execute(session.id(), Some(&ash.token), mira_setup())
            .await
            .expect("create mira");
        assert!(mira.opening.is_none(), "opening needs both characters");
        let brom = characters
            .create
            .execute(session.id(), Some(&brin.token), brom_setup())
            .await
            .expect("create brom");

        Self {
            app,
            llm,
            session_id: session.id(),
            ash,
            brin,
            mira: mira.character,
            brom: brom.character,
            opening: brom.opening,
            _temp_dir: temp_dir,
        }
    }

    pub async fn act(&self, player: &Player, content: &str) -> ActionOutcome {
        self.app
            .use_cases
            .turn
            .submit_action
            .execute(self.session_id, Some(&player.token), content, None)
            .await
            .expect("submit action")
    }

    pub async fn state(&self) -> SessionState {
        self.app
            .use_cases
            .session
            .get_state
            .execute(self.session_id)
            .await
            .expect("session state")
    }

    pub async fn character(&self, name: &str) -> Character {
        self.state()
            .await
            .characters
            .into_iter()
            .find(|c| c.name == name)
            .expect("character exists")
    }
}
