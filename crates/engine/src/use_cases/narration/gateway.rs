//! Narrative generator gateway.
//!
//! Sends a prompt to the generator with a fixed deadline and falls back to a
//! canned narration when the call fails for any reason.

use std::sync::Arc;
use std::time::Duration;

use crate::infrastructure::ports::{ChatMessage, LlmError, LlmPort, LlmRequest, RandomPort};

use super::update_parser::strip_special_tokens;

pub const DEFAULT_MAX_TOKENS: u32 = 700;
pub const DEFAULT_TEMPERATURE: f32 = 0.8;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Narrations used when the generator cannot produce one.
pub const FALLBACK_NARRATIONS: [&str; 5] = [
    "The world holds its breath for a moment. Shadows shift at the edge of sight, and the path ahead waits for your next move.",
    "A cold wind sweeps through the area, carrying distant sounds you cannot quite place. Whatever comes next is up to you.",
    "For a heartbeat nothing happens. Then the familiar sounds of the world return, and you sense that your choices still matter.",
    "The moment stretches, quiet and uncertain. Your surroundings remain as they were, ready for whatever you attempt next.",
    "Fate seems to pause and consider your deeds. The scene around you is unchanged, awaiting your next decision.",
];

/// Request settings for the generator.
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("Narrative generator is not configured")]
    Unavailable,
    #[error("Narrative generation failed: {0}")]
    Failed(String),
    #[error("Narrative generation timed out")]
    Timeout,
}

impl From<LlmError> for GeneratorError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Unavailable => Self::Unavailable,
            LlmError::Timeout => Self::Timeout,
            other => Self::Failed(other.to_string()),
        }
    }
}

/// A narration ready to be parsed, possibly canned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Narration {
    pub text: String,
    pub fallback: bool,
}

pub struct NarrativeGateway {
    llm: Arc<dyn LlmPort>,
    random: Arc<dyn RandomPort>,
    settings: GeneratorSettings,
}

impl NarrativeGateway {
    pub fn new(
        llm: Arc<dyn LlmPort>,
        random: Arc<dyn RandomPort>,
        settings: GeneratorSettings,
    ) -> Self {
        Self {
            llm,
            random,
            settings,
        }
    }

    /// The deadline applied to each generator call.
    pub fn timeout(&self) -> Duration {
        self.settings.timeout
    }

    /// One generator call with the configured deadline.
    pub async fn generate(&self, prompt: Vec<ChatMessage>) -> Result<String, GeneratorError> {
        let request = LlmRequest::new(prompt)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(Some(self.settings.max_tokens));

        let response = tokio::time::timeout(self.settings.timeout, self.llm.generate(request))
            .await
            .map_err(|_| GeneratorError::Timeout)??;

        let text = strip_special_tokens(&response.content).trim().to_string();
        if text.is_empty() {
            return Err(GeneratorError::Failed("empty response".to_string()));
        }
        Ok(text)
    }

    /// Pick one of the canned narrations.
    pub fn fallback(&self) -> String {
        let last = FALLBACK_NARRATIONS.len() as i32 - 1;
        let index = self.random.gen_range(0, last).clamp(0, last) as usize;
        FALLBACK_NARRATIONS[index].to_string()
    }

    /// Generate a narration, substituting a fallback on any failure.
    pub async fn narrate(&self, prompt: Vec<ChatMessage>) -> Narration {
        match self.generate(prompt).await {
            Ok(text) => Narration {
                text,
                fallback: false,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Narrative generation failed, using fallback");
                Narration {
                    text: self.fallback(),
                    fallback: true,
                }
            }
        }
    }
}
