//! Join codes and bearer tokens.

use rand::distributions::{Alphanumeric, DistString};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Length of a join code
pub const JOIN_CODE_LENGTH: usize = 6;

/// Length of a player bearer token
pub const TOKEN_LENGTH: usize = 48;

/// Join code alphabet without look-alike characters (0/O, 1/I/L)
const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// A short, human-shareable session code (stored upper-case)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JoinCode(String);

impl JoinCode {
    /// Parse a join code typed by a player. Matching is case-insensitive.
    pub fn new(code: impl Into<String>) -> Result<Self, DomainError> {
        let code = code.into().trim().to_ascii_uppercase();
        if code.len() != JOIN_CODE_LENGTH || !code.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(DomainError::validation(format!(
                "Join code must be {} letters or digits",
                JOIN_CODE_LENGTH
            )));
        }
        Ok(Self(code))
    }

    /// Generate a random join code.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let code = (0..JOIN_CODE_LENGTH)
            .map(|_| JOIN_CODE_ALPHABET[rng.gen_range(0..JOIN_CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JoinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for JoinCode {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<JoinCode> for String {
    fn from(code: JoinCode) -> String {
        code.0
    }
}

/// Generate an opaque bearer token for a player.
pub fn generate_player_token() -> String {
    Alphanumeric.sample_string(&mut rand::thread_rng(), TOKEN_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_code_is_case_insensitive() {
        let code = JoinCode::new(" ab3kq9 ").unwrap();
        assert_eq!(code.as_str(), "AB3KQ9");
        assert_eq!(code, JoinCode::new("AB3KQ9").unwrap());
    }

    #[test]
    fn join_code_rejects_bad_input() {
        assert!(JoinCode::new("ABC").is_err());
        assert!(JoinCode::new("ABC-12").is_err());
    }

    #[test]
    fn generated_values_have_expected_shape() {
        let code = JoinCode::generate();
        assert!(JoinCode::new(code.as_str()).is_ok());
        assert!(!code.as_str().contains('0'));

        let token = generate_player_token();
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert_ne!(token, generate_player_token());
    }
}
