//! Narrate one round (or the opening scene) and commit the result.
//!
//! The caller must first win the session's narrating claim. The claimed
//! pipeline then runs on its own task, so a caller that goes away mid-round
//! does not abandon it. Whatever happens, the claim is given back: on success
//! by the round commit, on error by a best-effort release. A claim whose
//! holder died anyway can be taken over once it is older than the lease.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use talebound_domain::{Message, SessionId};

use super::gateway::NarrativeGateway;
use super::prompt_builder::build_prompt;
use super::update_applier::{apply_state_updates, end_of_round_pass, CharacterChanges};
use super::update_parser::parse_narration;
use crate::infrastructure::ports::{
    CharacterRepo, ClockPort, MessageRepo, NarrationClaim, PlayerRepo, RepoError, RoundCommit,
    TurnRepo,
};

/// Time a claim may outlive the generator deadline before it counts as abandoned.
pub const CLAIM_LEASE_MARGIN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundKind {
    /// A completed round of player actions
    Turn,
    /// The opening scene; no decrement pass and no turn change
    Opening,
}

#[derive(Debug, Clone)]
pub struct NarrationOutcome {
    pub message: Message,
    pub used_fallback: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum NarrationError {
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
    #[error("Narration task failed: {0}")]
    Task(String),
}

pub struct NarrateRound {
    characters: Arc<dyn CharacterRepo>,
    players: Arc<dyn PlayerRepo>,
    messages: Arc<dyn MessageRepo>,
    turns: Arc<dyn TurnRepo>,
    gateway: Arc<NarrativeGateway>,
    clock: Arc<dyn ClockPort>,
}

impl NarrateRound {
    pub fn new(
        characters: Arc<dyn CharacterRepo>,
        players: Arc<dyn PlayerRepo>,
        messages: Arc<dyn MessageRepo>,
        turns: Arc<dyn TurnRepo>,
        gateway: Arc<NarrativeGateway>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            characters,
            players,
            messages,
            turns,
            gateway,
            clock,
        }
    }

    /// How long a claim is honoured before another request may take it over.
    pub fn claim_lease(&self) -> Duration {
        self.gateway.timeout() + CLAIM_LEASE_MARGIN
    }

    /// Try to take the narrating phase for `turn`.
    pub async fn claim(
        &self,
        session_id: SessionId,
        turn: i64,
    ) -> Result<Option<NarrationClaim>, RepoError> {
        let now = self.clock.now();
        let stale_before = chrono::Duration::from_std(self.claim_lease())
            .ok()
            .and_then(|lease| now.checked_sub_signed(lease))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.turns
            .claim_narrating(session_id, turn, now, stale_before)
            .await
    }

    /// Give a claim back without narrating.
    pub async fn release(&self, claim: &NarrationClaim) -> Result<(), RepoError> {
        self.turns.release_narrating(claim).await
    }

    /// Narrate and commit under `claim`.
    ///
    /// The work runs on a spawned task; dropping the returned future leaves it
    /// running to completion.
    pub async fn execute(
        self: Arc<Self>,
        claim: NarrationClaim,
        kind: RoundKind,
    ) -> Result<NarrationOutcome, NarrationError> {
        let session_id = claim.session_id;
        tokio::spawn(async move { self.run_claimed(claim, kind).await })
            .await
            .map_err(|e| {
                tracing::error!(session_id = %session_id, error = %e, "Narration task aborted");
                NarrationError::Task(e.to_string())
            })?
    }

    async fn run_claimed(
        &self,
        claim: NarrationClaim,
        kind: RoundKind,
    ) -> Result<NarrationOutcome, NarrationError> {
        let session_id = claim.session_id;
        match self.run(claim, kind).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Narration failed, releasing session");
                if let Err(release_err) = self.turns.release_narrating(&claim).await {
                    tracing::error!(
                        session_id = %session_id,
                        error = %release_err,
                        "Failed to release narrating phase"
                    );
                }
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        claim: NarrationClaim,
        kind: RoundKind,
    ) -> Result<NarrationOutcome, NarrationError> {
        let session_id = claim.session_id;
        let characters = self.characters.list_for_session(session_id).await?;
        let players = self.players.list_for_session(session_id).await?;
        let history = self.messages.list_for_session(session_id).await?;

        let prompt = build_prompt(&characters, &players, &history);
        let narration = self.gateway.narrate(prompt).await;
        let parsed = parse_narration(&narration.text);

        // Reload so updates land on top of any patch made during generation
        let mut characters = self.characters.list_for_session(session_id).await?;
        let mut changes = CharacterChanges::default();
        apply_state_updates(&mut characters, &parsed.updates, &mut changes);
        if kind == RoundKind::Turn {
            end_of_round_pass(&mut characters, &mut changes);
        }

        let mut used_fallback = narration.fallback;
        let narrative = if parsed.narrative.is_empty() {
            tracing::warn!(session_id = %session_id, "Narration had no story text, using fallback");
            used_fallback = true;
            self.gateway.fallback()
        } else {
            parsed.narrative
        };

        let now = self.clock.now();
        let message = Message::from_narrator(session_id, narrative, parsed.payload, now);
        let character_updates = changes.into_updates();
        let updated = character_updates.len();

        self.turns
            .commit_round(RoundCommit {
                claim,
                message: message.clone(),
                character_updates,
                advance_turn: kind == RoundKind::Turn,
                now,
            })
            .await?;

        tracing::info!(
            session_id = %session_id,
            kind = ?kind,
            fallback = used_fallback,
            characters_updated = updated,
            "Round narrated"
        );

        Ok(NarrationOutcome {
            message,
            used_fallback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::ports::{
        FinishReason, LlmResponse, MockCharacterRepo, MockLlmPort, MockMessageRepo,
        MockPlayerRepo, MockRandomPort, MockTurnRepo,
    };
    use crate::use_cases::narration::GeneratorSettings;
    use chrono::Utc;
    use talebound_domain::{Character, CharacterSetup, PlayerId};

    fn mira(session_id: SessionId) -> Character {
        let mut character = Character::create(
            PlayerId::new(),
            session_id,
            CharacterSetup {
                name: "Mira".into(),
                race: "Elf".into(),
                class: "Ranger".into(),
                ..CharacterSetup::default()
            },
            Utc::now(),
        )
        .unwrap();
        character.abilities.push(talebound_domain::Ability {
            current_cooldown: 2,
            ..talebound_domain::Ability::new("Volley", "", 3)
        });
        character
    }

    fn claim(session_id: SessionId) -> NarrationClaim {
        NarrationClaim {
            session_id,
            turn: 1,
            claimed_at: Utc::now(),
        }
    }

    fn gateway(reply: &'static str) -> Arc<NarrativeGateway> {
        let mut llm = MockLlmPort::new();
        llm.expect_generate().times(1).returning(move |_| {
            Ok(LlmResponse {
                content: reply.to_string(),
                finish_reason: FinishReason::Stop,
            })
        });
        let mut random = MockRandomPort::new();
        random.expect_gen_range().returning(|min, _| min);
        Arc::new(NarrativeGateway::new(
            Arc::new(llm),
            Arc::new(random),
            GeneratorSettings::default(),
        ))
    }

    fn repos(
        session_id: SessionId,
    ) -> (MockCharacterRepo, MockPlayerRepo, MockMessageRepo) {
        let mut characters = MockCharacterRepo::new();
        characters
            .expect_list_for_session()
            .returning(move |_| Ok(vec![mira(session_id)]));
        let mut players = MockPlayerRepo::new();
        players.expect_list_for_session().returning(|_| Ok(vec![]));
        let mut messages = MockMessageRepo::new();
        messages.expect_list_for_session().returning(|_| Ok(vec![]));
        (characters, players, messages)
    }

    #[tokio::test]
    async fn opening_applies_updates_without_decrement() {
        let session_id = SessionId::new();
        let (characters, players, messages) = repos(session_id);
        let mut turns = MockTurnRepo::new();
        turns
            .expect_commit_round()
            .withf(|commit| {
                !commit.advance_turn
                    && commit.character_updates.len() == 1
                    && commit.character_updates[0].1.xp == Some(50)
                    && commit.character_updates[0].1.abilities.is_none()
                    && commit.message.content == "You stand at the gate."
                    && commit.message.state_updates.is_some()
            })
            .times(1)
            .returning(|_| Ok(()));

        let narrate = Arc::new(NarrateRound::new(
            Arc::new(characters),
            Arc::new(players),
            Arc::new(messages),
            Arc::new(turns),
            gateway("You stand at the gate.\n[[STATE_UPDATE]]{\"mira\":{\"xp\":50}}[[/STATE_UPDATE]]"),
            Arc::new(FixedClock(Utc::now())),
        ));

        let outcome = narrate
            .execute(claim(session_id), RoundKind::Opening)
            .await
            .unwrap();
        assert!(!outcome.used_fallback);
    }

    #[tokio::test]
    async fn turn_runs_decrement_and_advances() {
        let session_id = SessionId::new();
        let (characters, players, messages) = repos(session_id);
        let mut turns = MockTurnRepo::new();
        turns
            .expect_commit_round()
            .withf(|commit| {
                commit.advance_turn
                    && commit.character_updates[0]
                        .1
                        .abilities
                        .as_ref()
                        .is_some_and(|a| a[0].current_cooldown == 1)
            })
            .times(1)
            .returning(|_| Ok(()));

        let narrate = Arc::new(NarrateRound::new(
            Arc::new(characters),
            Arc::new(players),
            Arc::new(messages),
            Arc::new(turns),
            gateway("The arrows fly."),
            Arc::new(FixedClock(Utc::now())),
        ));

        narrate.execute(claim(session_id), RoundKind::Turn).await.unwrap();
    }

    #[tokio::test]
    async fn block_only_reply_gets_fallback_text_but_keeps_updates() {
        let session_id = SessionId::new();
        let (characters, players, messages) = repos(session_id);
        let mut turns = MockTurnRepo::new();
        turns
            .expect_commit_round()
            .withf(|commit| {
                commit.message.content == super::super::FALLBACK_NARRATIONS[0]
                    && commit.character_updates[0].1.xp == Some(7)
            })
            .times(1)
            .returning(|_| Ok(()));

        let narrate = Arc::new(NarrateRound::new(
            Arc::new(characters),
            Arc::new(players),
            Arc::new(messages),
            Arc::new(turns),
            gateway("[[STATE_UPDATE]]{\"Mira\":{\"xp\":7}}[[/STATE_UPDATE]]"),
            Arc::new(FixedClock(Utc::now())),
        ));

        let outcome = narrate.execute(claim(session_id), RoundKind::Opening).await.unwrap();
        assert!(outcome.used_fallback);
    }

    #[tokio::test]
    async fn failed_commit_releases_phase() {
        let session_id = SessionId::new();
        let (characters, players, messages) = repos(session_id);
        let mut turns = MockTurnRepo::new();
        turns
            .expect_commit_round()
            .times(1)
            .returning(|_| Err(RepoError::database("commit_round", "disk I/O error")));
        turns
            .expect_release_narrating()
            .withf(move |claim| claim.session_id == session_id)
            .times(1)
            .returning(|_| Ok(()));

        let narrate = Arc::new(NarrateRound::new(
            Arc::new(characters),
            Arc::new(players),
            Arc::new(messages),
            Arc::new(turns),
            gateway("Nothing stirs."),
            Arc::new(FixedClock(Utc::now())),
        ));

        let err = narrate.execute(claim(session_id), RoundKind::Turn).await.unwrap_err();
        assert!(matches!(err, NarrationError::Repo(_)));
    }

    #[tokio::test]
    async fn claim_lease_covers_the_generator_deadline() {
        let session_id = SessionId::new();
        let (characters, players, messages) = repos(session_id);
        let now = Utc::now();
        let mut turns = MockTurnRepo::new();
        turns
            .expect_claim_narrating()
            .withf(move |id, turn, at, stale_before| {
                *id == session_id
                    && *turn == 4
                    && *at == now
                    && *at - *stale_before == chrono::Duration::seconds(90)
            })
            .times(1)
            .returning(move |session_id, turn, claimed_at, _| {
                Ok(Some(NarrationClaim {
                    session_id,
                    turn,
                    claimed_at,
                }))
            });

        let mut llm = MockLlmPort::new();
        llm.expect_generate().never();
        let narrate = NarrateRound::new(
            Arc::new(characters),
            Arc::new(players),
            Arc::new(messages),
            Arc::new(turns),
            Arc::new(NarrativeGateway::new(
                Arc::new(llm),
                Arc::new(MockRandomPort::new()),
                GeneratorSettings::default(),
            )),
            Arc::new(FixedClock(now)),
        );

        let claim = narrate.claim(session_id, 4).await.unwrap().unwrap();
        assert_eq!(claim.claimed_at, now);
        assert_eq!(narrate.claim_lease(), Duration::from_secs(90));
    }
}
