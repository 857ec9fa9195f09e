use std::fmt;

use serde::{Deserialize, Serialize};

/// Verified subject identifier.
///
/// Opaque to docbase: whatever the identity service puts in a token's
/// subject claim. Only ever produced by the identity layer after a
/// successful sign-in or token verification.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uid({})", self.0)
    }
}

/// Bearer credential presented to prove an identity.
///
/// The token text is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdToken(String);

impl IdToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the token is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for IdToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdToken(<{} bytes>)", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_debug_is_redacted() {
        let t = IdToken::new("secret-token-value");
        let dbg = format!("{t:?}");
        assert!(!dbg.contains("secret"));
        assert!(dbg.contains("18 bytes"));
    }

    #[test]
    fn blank_tokens() {
        assert!(IdToken::new("").is_blank());
        assert!(IdToken::new(" \t").is_blank());
        assert!(!IdToken::new("x").is_blank());
    }

    #[test]
    fn uid_serializes_as_plain_string() {
        let json = serde_json::to_string(&Uid::new("user-1")).unwrap();
        assert_eq!(json, "\"user-1\"");
    }
}
