//! Upload tokens.
//!
//! A token identifies the files a user attached to a chat. It has the form
//! `<16 alphanumerics>-<16 alphanumerics>`. The first half stays fixed for
//! the lifetime of the page; the second half is regenerated whenever the
//! attached files are discarded, so the backend can tell uploads apart.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::validation::ValidationError;

/// Length of each half of a token.
pub const PARTIAL_TOKEN_SIZE: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UploadToken(String);

impl UploadToken {
    /// A fresh token with both halves random.
    pub fn generate() -> Self {
        Self(format!("{}-{}", random_half(), random_half()))
    }

    /// Same first half, new second half.
    pub fn renew(&self) -> Self {
        Self(format!("{}-{}", self.stable_half(), random_half()))
    }

    /// Validate a token received from elsewhere.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let valid = raw.split_once('-').is_some_and(|(first, second)| {
            is_token_half(first) && is_token_half(second)
        });
        if !valid {
            return Err(ValidationError::new(
                "token",
                format!("expected two groups of {PARTIAL_TOKEN_SIZE} alphanumerics joined by '-'"),
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn stable_half(&self) -> &str {
        &self.0[..PARTIAL_TOKEN_SIZE]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_token_half(part: &str) -> bool {
    part.len() == PARTIAL_TOKEN_SIZE && part.chars().all(|c| c.is_ascii_alphanumeric())
}

fn random_half() -> String {
    let mut half = Uuid::new_v4().simple().to_string();
    half.truncate(PARTIAL_TOKEN_SIZE);
    half
}

impl fmt::Display for UploadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UploadToken {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for UploadToken {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UploadToken> for String {
    fn from(token: UploadToken) -> Self {
        token.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_valid_and_distinct() {
        let a = UploadToken::generate();
        let b = UploadToken::generate();

        assert!(UploadToken::parse(a.as_str()).is_ok());
        assert_eq!(a.as_str().len(), 2 * PARTIAL_TOKEN_SIZE + 1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_renew_keeps_first_half() {
        let token = UploadToken::generate();
        let renewed = token.renew();

        assert_eq!(renewed.stable_half(), token.stable_half());
        assert_ne!(renewed, token);
        assert!(UploadToken::parse(renewed.as_str()).is_ok());
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        assert!(UploadToken::parse("abcdefghijklmnop-ABCDEFGHIJKLMNOP").is_ok());
        assert!(UploadToken::parse("abcdefghijklmnop").is_err());
        assert!(UploadToken::parse("abcdefghijklmno-ABCDEFGHIJKLMNOP").is_err());
        assert!(UploadToken::parse("abcdefghijklmnop-ABCDEFGHIJKLMN_P").is_err());
        assert!(UploadToken::parse("abcdefghijklmnop-ABCDEFGHIJKLMNOP-").is_err());
    }

    #[test]
    fn test_serde_validates() {
        let token: UploadToken = serde_json::from_str("\"abcdefghijklmnop-ABCDEFGHIJKLMNOP\"").unwrap();
        assert_eq!(serde_json::to_string(&token).unwrap(), "\"abcdefghijklmnop-ABCDEFGHIJKLMNOP\"");
        assert!(serde_json::from_str::<UploadToken>("\"nope\"").is_err());
    }
}
