//! Test fixtures and common test helpers.
//!
//! Builds a complete [`App`] over a temporary SQLite store with a scripted
//! narrative generator, plus ready-made character setups.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use talebound_domain::{Ability, CharacterSetup};
use talebound_shared::CreateCharacterRequest;
use tempfile::TempDir;

use crate::app::App;
use crate::infrastructure::clock::{FixedRandom, SystemClock};
use crate::infrastructure::ports::{
    ChatRole, FinishReason, LlmError, LlmPort, LlmRequest, LlmResponse,
};
use crate::infrastructure::sqlite::test_support::temp_store;
use crate::use_cases::narration::GeneratorSettings;

// =============================================================================
// Generator
// =============================================================================

/// Generator that replays canned replies and records every request.
///
/// Once the script runs out every call fails.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<LlmRequest>>,
    delay: Duration,
}

impl ScriptedLlm {
    pub fn new<S: Into<String>>(replies: impl IntoIterator<Item = Result<S, LlmError>>) -> Arc<Self> {
        Self::with_delay(replies, Duration::ZERO)
    }

    /// Like [`ScriptedLlm::new`], but every call takes `delay` to answer.
    pub fn with_delay<S: Into<String>>(
        replies: impl IntoIterator<Item = Result<S, LlmError>>,
        delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(|r| r.map(Into::into)).collect()),
            requests: Mutex::new(Vec::new()),
            delay,
        })
    }

    pub fn replying(replies: &[&str]) -> Arc<Self> {
        Self::new(replies.iter().map(|r| Ok::<_, LlmError>(*r)))
    }

    pub fn replying_slowly(replies: &[&str], delay: Duration) -> Arc<Self> {
        Self::with_delay(replies.iter().map(|r| Ok::<_, LlmError>(*r)), delay)
    }

    /// A generator nobody is expected to call.
    pub fn silent() -> Arc<Self> {
        Self::new(Vec::<Result<String, LlmError>>::new())
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The transcript part of the last prompt (everything after the system block).
    pub fn last_transcript(&self) -> Vec<(ChatRole, String)> {
        self.requests()
            .last()
            .map(|r| {
                r.messages
                    .iter()
                    .skip(1)
                    .map(|m| (m.role, m.content.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmPort for ScriptedLlm {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::RequestFailed("no scripted reply".into())));
        reply.map(|content| LlmResponse {
            content,
            finish_reason: FinishReason::Stop,
        })
    }
}

// =============================================================================
// App
// =============================================================================

/// A full app over a fresh store. Keep the `TempDir` alive for the test.
pub async fn test_app(llm: Arc<ScriptedLlm>) -> (Arc<App>, TempDir) {
    let (repos, dir) = temp_store().await;
    let app = App::with_ports(
        repos,
        llm,
        GeneratorSettings::default(),
        true,
        Arc::new(SystemClock),
        Arc::new(FixedRandom(0)),
    );
    (Arc::new(app), dir)
}

// =============================================================================
// Characters
// =============================================================================

pub fn mira_setup() -> CharacterSetup {
    CharacterSetup {
        name: "Mira".into(),
        race: "Elf".into(),
        class: "Ranger".into(),
        max_hp: Some(12),
        max_mp: Some(6),
        attributes: BTreeMap::from([
            ("dexterity".to_string(), 16),
            ("wisdom".to_string(), 13),
        ]),
        inventory: vec!["Longbow".into(), "Rope".into()],
        abilities: vec![Ability::new("Volley", "A rain of arrows", 3)],
    }
}

pub fn brom_setup() -> CharacterSetup {
    CharacterSetup {
        name: "Brom".into(),
        race: "Dwarf".into(),
        class: "Cleric".into(),
        max_hp: Some(14),
        max_mp: Some(10),
        inventory: vec!["Mace".into()],
        abilities: vec![Ability::new("Mend", "Close a wound", 2)],
        ..CharacterSetup::default()
    }
}

pub fn create_request(setup: CharacterSetup) -> CreateCharacterRequest {
    CreateCharacterRequest {
        name: setup.name,
        race: setup.race,
        class: setup.class,
        max_hp: setup.max_hp,
        max_mp: setup.max_mp,
        attributes: setup.attributes,
        inventory: setup.inventory,
        abilities: setup.abilities,
    }
}
