//! Builds the generator prompt from session state.
//!
//! Output is a list of role-tagged blocks: one system block describing every
//! character plus the narrator rules, followed by the transcript with each
//! round's player actions merged into a single user turn.

use std::collections::HashMap;
use std::fmt::Write;

use talebound_domain::{Character, Message, MessageRole, Player, PlayerId};

use super::update_parser::{strip_state_block, STATE_UPDATE_CLOSE, STATE_UPDATE_OPEN};
use crate::infrastructure::ports::{ChatMessage, ChatRole};

/// Cue attached to dice results from the round being resolved
pub const DICE_RESOLUTION_CUE: &str =
    "Use this roll to resolve the pending uncertain action; do not ask for another roll.";

const NARRATOR_ROLE: &str = "You are the narrator of a cooperative fantasy role-playing game \
for two players. You describe the world, its people and the consequences of the players' \
choices.";

fn rules() -> String {
    format!(
        r#"## Rules
1. Never write dialogue, thoughts or actions for the player characters. Describe the world and non-player characters only, and let the players decide what their characters do.
2. Before resolving any action whose outcome is uncertain, ask the acting player to roll dice (for example "Mira, roll 1d20 + dexterity") and stop. Resolve the action once the roll arrives.
3. After narrating consequences that change a character, append one state update block at the very end of your reply:
{open}
{{"Mira": {{"hp": {{"current": 6, "max": 12}}, "addInventory": ["Silver key"]}}}}
{close}
   Keys are character names. Every field is optional:
   - "hp", "mp": {{"current": n, "max": n}} replaces both values
   - "xp", "level", "xpToNextLevel": new absolute values
   - "addInventory": list of item names to add
   - "removeInventory": item name or list of names to remove
   - "addStatusEffect": {{"name", "description", "duration" (rounds), "severity"}}
   - "removeStatusEffect": effect name
   - "addAbility": {{"name", "description", "cooldown", "power", "type"}}
   - "useAbility": ability name (starts its cooldown)
   Leave the block out when nothing changed. Never mention it in the story.
4. Write 2-4 paragraphs, then stop and hand control back to the players."#,
        open = STATE_UPDATE_OPEN,
        close = STATE_UPDATE_CLOSE,
    )
}

/// Render one character for the system block.
pub fn render_character(character: &Character) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "### {} ({} {})",
        character.name, character.race, character.class
    );
    let _ = writeln!(
        out,
        "- Level {} (XP {}/{})",
        character.level, character.xp, character.xp_to_next_level
    );
    let _ = writeln!(
        out,
        "- HP {}/{}, MP {}/{}",
        character.hp.current, character.hp.max, character.mp.current, character.mp.max
    );

    let attributes: Vec<String> = character
        .attributes
        .iter()
        .map(|(name, value)| format!("{} {}", name, value))
        .collect();
    let _ = writeln!(out, "- Attributes: {}", join_or_none(&attributes));

    let effects: Vec<String> = character
        .status_effects
        .iter()
        .map(|effect| {
            let mut text = effect.name.clone();
            let mut details = Vec::new();
            if let Some(severity) = &effect.severity {
                details.push(severity.clone());
            }
            if let Some(duration) = effect.duration {
                details.push(format!("{} rounds left", duration));
            }
            if !details.is_empty() {
                let _ = write!(text, " ({})", details.join(", "));
            }
            if let Some(description) = &effect.description {
                let _ = write!(text, ": {}", description);
            }
            text
        })
        .collect();
    let _ = writeln!(out, "- Status effects: {}", join_or_none(&effects));

    let abilities: Vec<String> = character
        .abilities
        .iter()
        .map(|ability| {
            let state = if ability.is_ready() {
                "ready".to_string()
            } else {
                format!(
                    "cooling down, {} of {} rounds left",
                    ability.current_cooldown, ability.cooldown
                )
            };
            let mut text = format!("{} [{}]", ability.name, state);
            if let Some(kind) = &ability.ability_type {
                let _ = write!(text, " {}", kind);
            }
            if let Some(power) = &ability.power {
                let _ = write!(text, " power {}", power);
            }
            if !ability.description.is_empty() {
                let _ = write!(text, ": {}", ability.description);
            }
            text
        })
        .collect();
    let _ = writeln!(out, "- Abilities: {}", join_or_none(&abilities));
    let _ = write!(out, "- Inventory: {}", join_or_none(&character.inventory));
    out
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

fn system_block(characters: &[Character]) -> String {
    let mut out = String::from(NARRATOR_ROLE);
    out.push_str("\n\n## Characters\n");
    if characters.is_empty() {
        out.push_str("No characters have been created yet.\n");
    }
    for character in characters {
        out.push_str(&render_character(character));
        out.push_str("\n\n");
    }
    out.push_str(&rules());
    out
}

/// Render one player action line.
fn render_action(message: &Message, author: &str, current_round: bool) -> String {
    let mut line = format!("{}: {}", author, message.content.trim());
    if let Some(roll) = &message.dice_roll {
        let _ = write!(line, "\n[Dice: {}]", roll.breakdown());
        if current_round {
            let _ = write!(line, " {}", DICE_RESOLUTION_CUE);
        }
    }
    line
}

fn kickoff(characters: &[Character]) -> String {
    let party: Vec<&str> = characters.iter().map(|c| c.name.as_str()).collect();
    let party = if party.is_empty() {
        "the adventurers".to_string()
    } else {
        party.join(" and ")
    };
    format!(
        "Begin the adventure. Set the opening scene for {}: where they are, what brought them \
together and what demands their attention. End by asking the players what they do.",
        party
    )
}

/// Assemble the prompt for the next narration.
pub fn build_prompt(
    characters: &[Character],
    players: &[Player],
    history: &[Message],
) -> Vec<ChatMessage> {
    let character_names: HashMap<PlayerId, &str> = characters
        .iter()
        .map(|c| (c.player_id, c.name.as_str()))
        .collect();
    let player_names: HashMap<PlayerId, &str> =
        players.iter().map(|p| (p.id, p.name.as_str())).collect();

    // Player messages after the last narration belong to the round being resolved
    let current_round_start = history
        .iter()
        .rposition(|m| m.role == MessageRole::Assistant)
        .map_or(0, |i| i + 1);

    let mut blocks = vec![ChatMessage::system(system_block(characters))];

    for (index, message) in history.iter().enumerate() {
        match message.role {
            MessageRole::Assistant => {
                let narrative = strip_state_block(&message.content);
                if !narrative.is_empty() {
                    blocks.push(ChatMessage::assistant(narrative));
                }
            }
            MessageRole::User => {
                let author = message
                    .player_id
                    .and_then(|id| {
                        character_names
                            .get(&id)
                            .or_else(|| player_names.get(&id))
                            .copied()
                    })
                    .unwrap_or(message.author_name.as_str());
                let line = render_action(message, author, index >= current_round_start);

                match blocks.last_mut() {
                    Some(last) if last.role == ChatRole::User => {
                        last.content.push_str("\n\n");
                        last.content.push_str(&line);
                    }
                    _ => blocks.push(ChatMessage::user(line)),
                }
            }
        }
    }

    if blocks.len() == 1 {
        blocks.push(ChatMessage::user(kickoff(characters)));
    }

    blocks
}
