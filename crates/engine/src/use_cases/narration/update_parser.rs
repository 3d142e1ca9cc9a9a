//! Narrator output parser.
//!
//! Splits generated text into player-facing narrative and the machine-directed
//! state-update block:
//!
//! ```text
//! The goblin's blade grazes Mira's arm.
//! [[STATE_UPDATE]]
//! {"Mira": {"hp": {"current": 6, "max": 12}}}
//! [[/STATE_UPDATE]]
//! ```
//!
//! A malformed block never fails the round: the payload is dropped with a
//! warning and the narrative is still returned.

use regex_lite::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use talebound_domain::StateUpdateSet;

/// Opening sentinel of the state-update block
pub const STATE_UPDATE_OPEN: &str = "[[STATE_UPDATE]]";
/// Closing sentinel of the state-update block
pub const STATE_UPDATE_CLOSE: &str = "[[/STATE_UPDATE]]";

// Regex to remove model-specific special tokens
static SPECIAL_TOKENS_RE: LazyLock<Regex> = LazyLock::new(|| {
    // - <|...|> style tokens
    // - [INST], [/INST] tokens (llama)
    // - <<SYS>>, <</SYS>> tokens (llama)
    Regex::new(r"<\|[^|>]+\|>|\[/?INST\]|<</?SYS>>").expect("valid regex")
});

// Regex to extract final content from channel-style responses
static FINAL_CONTENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<\|channel\|>final<\|message\|>(.*)$").expect("valid regex")
});

// Markdown code fence some models wrap around the JSON
static CODE_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\s*(.*?)\s*```$").expect("valid regex"));

/// Narrative and decoded updates from one generator reply
#[derive(Debug, Clone, Default)]
pub struct ParsedNarration {
    /// Player-facing text with every state-update block removed
    pub narrative: String,
    /// The raw decoded payload, kept on the message for audit
    pub payload: Option<Value>,
    pub updates: StateUpdateSet,
}

/// Remove leaked instruction-delimiter tokens.
///
/// Handles:
/// - `<|channel|>final<|message|>CONTENT` -> just CONTENT
/// - individual `<|...|>` tokens
/// - `[INST]`, `[/INST]`, `<<SYS>>`, `<</SYS>>`
pub fn strip_special_tokens(raw: &str) -> String {
    if let Some(content) = FINAL_CONTENT_RE.captures(raw).and_then(|caps| caps.get(1)) {
        return SPECIAL_TOKENS_RE
            .replace_all(content.as_str().trim(), "")
            .to_string();
    }
    SPECIAL_TOKENS_RE.replace_all(raw, "").to_string()
}

/// Split text into narrative and the bodies of its state-update blocks.
///
/// An opening sentinel without a closing one swallows the rest of the text.
fn split_blocks(text: &str) -> (String, Vec<&str>) {
    let mut narrative = String::with_capacity(text.len());
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(STATE_UPDATE_OPEN) {
        narrative.push_str(&rest[..start]);
        let after_open = &rest[start + STATE_UPDATE_OPEN.len()..];
        match after_open.find(STATE_UPDATE_CLOSE) {
            Some(end) => {
                blocks.push(&after_open[..end]);
                rest = &after_open[end + STATE_UPDATE_CLOSE.len()..];
            }
            None => {
                blocks.push(after_open);
                rest = "";
            }
        }
    }
    narrative.push_str(rest);

    (narrative.trim().to_string(), blocks)
}

/// Drop state-update blocks, keeping only narrative text.
pub fn strip_state_block(text: &str) -> String {
    split_blocks(text).0
}

fn decode_block(body: &str) -> Option<Value> {
    let body = body.trim();
    let body = CODE_FENCE_RE
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map_or(body, |m| m.as_str());

    match serde_json::from_str::<Value>(body) {
        Ok(value @ Value::Object(_)) => Some(value),
        Ok(other) => {
            tracing::warn!(json = %other, "State update block is not a JSON object, ignoring");
            None
        }
        Err(e) => {
            tracing::warn!(json = %body, error = %e, "Failed to parse state update JSON");
            None
        }
    }
}

/// Parse a generator reply.
pub fn parse_narration(raw: &str) -> ParsedNarration {
    let cleaned = strip_special_tokens(raw);
    let (narrative, blocks) = split_blocks(&cleaned);

    let mut payload: Option<Value> = None;
    for value in blocks.into_iter().filter_map(decode_block) {
        match (&mut payload, value) {
            (Some(Value::Object(merged)), Value::Object(more)) => merged.extend(more),
            (slot, value) => *slot = Some(value),
        }
    }

    let updates = match &payload {
        Some(value) => match StateUpdateSet::from_json(value) {
            Ok(set) => set,
            Err(e) => {
                tracing::warn!(error = %e, "State update payload rejected");
                StateUpdateSet::default()
            }
        },
        None => StateUpdateSet::default(),
    };

    for skipped in &updates.skipped {
        tracing::warn!(
            character = %skipped.character_key,
            field = %skipped.field,
            reason = %skipped.reason,
            "Skipping malformed state update field"
        );
    }

    ParsedNarration {
        narrative,
        payload,
        updates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use talebound_domain::{FieldChange, ResourceChange};

    #[test]
    fn text_without_block_is_all_narrative() {
        let parsed = parse_narration("  The wind howls through the pass.  ");
        assert_eq!(parsed.narrative, "The wind howls through the pass.");
        assert!(parsed.payload.is_none());
        assert!(parsed.updates.is_empty());
    }

    #[test]
    fn valid_block_is_removed_and_decoded() {
        let raw = "The blade bites.\n[[STATE_UPDATE]]\n{\"Mira\": {\"hp\": {\"current\": 6, \"max\": 12}}}\n[[/STATE_UPDATE]]\n";
        let parsed = parse_narration(raw);

        assert_eq!(parsed.narrative, "The blade bites.");
        assert!(parsed.payload.is_some());
        let mira = parsed.updates.for_character("mira").unwrap();
        assert_eq!(
            mira.changes,
            vec![FieldChange::SetHp(ResourceChange {
                current: 6,
                max: Some(12)
            })]
        );
    }

    #[test]
    fn invalid_json_keeps_narrative_and_drops_payload() {
        let raw = "A door slams.\n[[STATE_UPDATE]]\n{\"Mira\": {\"hp\": \n[[/STATE_UPDATE]]";
        let parsed = parse_narration(raw);

        assert_eq!(parsed.narrative, "A door slams.");
        assert!(parsed.payload.is_none());
        assert!(parsed.updates.is_empty());
    }

    #[test]
    fn unterminated_block_is_cut_from_narrative() {
        let parsed = parse_narration("Steam rises.\n[[STATE_UPDATE]]\n{\"Mira\": {\"xp\": 40}}");
        assert_eq!(parsed.narrative, "Steam rises.");
        assert!(parsed.updates.for_character("Mira").is_some());
    }

    #[test]
    fn fenced_json_is_accepted() {
        let raw = "Done.\n[[STATE_UPDATE]]\n```json\n{\"Mira\": {\"xp\": 5}}\n```\n[[/STATE_UPDATE]]";
        let parsed = parse_narration(raw);
        assert!(parsed.payload.is_some());
    }

    #[test]
    fn special_tokens_are_stripped() {
        let parsed = parse_narration("[INST]<<SYS>>The torch gutters.<</SYS>>[/INST]<|end|>");
        assert_eq!(parsed.narrative, "The torch gutters.");

        let channel = strip_special_tokens(
            "<|channel|>analysis<|message|>thinking<|end|><|start|>assistant<|channel|>final<|message|>Snow falls.",
        );
        assert_eq!(channel, "Snow falls.");
    }

    #[test]
    fn strip_state_block_leaves_text_only() {
        assert_eq!(
            strip_state_block("Hi.\n[[STATE_UPDATE]]{}[[/STATE_UPDATE]]\nBye."),
            "Hi.\n\nBye."
        );
    }
}
