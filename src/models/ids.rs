//! Platform identity newtypes.
//!
//! Player identities are the 17-digit numeric ids the game platform
//! assigns; chat-side identities (users, roles, channels) are opaque
//! strings owned by the chat platform.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from parsing an identity out of user-supplied text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("player id must be exactly 17 digits, got {0:?}")]
    BadPlayerId(String),
}

/// A stable in-game player identity (17-digit platform id).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct PlayerId(u64);

impl PlayerId {
    /// Wrap a raw numeric id without format validation.
    ///
    /// Used when the id comes from a trusted source (the event store).
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Parse a player id from command text, enforcing the 17-digit format.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        let s = s.trim();
        if s.len() != 17 || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(IdError::BadPlayerId(s.to_string()));
        }
        s.parse::<u64>()
            .map(Self)
            .map_err(|_| IdError::BadPlayerId(s.to_string()))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlayerId({})", self.0)
    }
}

/// A chat-platform user id (opaque snowflake-style string).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatUserId(String);

impl ChatUserId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ChatUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChatUserId({})", self.0)
    }
}

impl From<&str> for ChatUserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A chat-platform role id, used for authorization gates.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(String);

impl RoleId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoleId({})", self.0)
    }
}

impl From<&str> for RoleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_parse_valid() {
        let id = PlayerId::parse("76561198012345678").unwrap();
        assert_eq!(id.as_u64(), 76561198012345678);
    }

    #[test]
    fn test_player_id_parse_trims_whitespace() {
        let id = PlayerId::parse(" 76561198012345678 ").unwrap();
        assert_eq!(id.as_u64(), 76561198012345678);
    }

    #[test]
    fn test_player_id_parse_too_short() {
        assert!(PlayerId::parse("1234567").is_err());
    }

    #[test]
    fn test_player_id_parse_too_long() {
        assert!(PlayerId::parse("765611980123456789").is_err());
    }

    #[test]
    fn test_player_id_parse_non_digits() {
        assert!(PlayerId::parse("7656119801234567x").is_err());
    }

    #[test]
    fn test_player_id_display() {
        let id = PlayerId::new(76561198012345678);
        assert_eq!(format!("{}", id), "76561198012345678");
    }

    #[test]
    fn test_player_id_serialization() {
        let id = PlayerId::new(76561198012345678);
        let json = serde_json::to_string(&id).unwrap();
        let back: PlayerId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn test_chat_user_id_roundtrip() {
        let id = ChatUserId::from("112233445566778899");
        assert_eq!(id.as_str(), "112233445566778899");
        assert_eq!(format!("{}", id), "112233445566778899");
    }

    #[test]
    fn test_role_id_equality() {
        assert_eq!(RoleId::from("mod"), RoleId::from("mod"));
        assert_ne!(RoleId::from("mod"), RoleId::from("admin"));
    }
}
