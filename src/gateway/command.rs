//! Chat command grammar.
//!
//! A command is the configured name prefixed with `!`, optionally
//! followed by a single 17-digit player id. Anything else is not a
//! command for us and parses to `None`.

use regex::Regex;

use crate::models::PlayerId;

/// A recognized chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Personal stats, for the given player or the requester's own
    /// resolved identity when no argument is supplied.
    PersonalStats { player: Option<PlayerId> },

    /// Manually trigger the daily digest.
    PostDigest,
}

/// Compiled command patterns for the two external-chat commands.
pub struct CommandGrammar {
    stats: Regex,
    digest: Regex,
}

impl CommandGrammar {
    pub fn new(stats_command: &str, digest_command: &str) -> Result<Self, regex::Error> {
        let stats = Regex::new(&format!(
            r"^!{}(?:\s+(\d{{17}}))?$",
            regex::escape(stats_command)
        ))?;
        let digest = Regex::new(&format!(r"^!{}$", regex::escape(digest_command)))?;
        Ok(Self { stats, digest })
    }

    /// Parse one message. The digest command wins when the two names
    /// collide, matching how the commands were historically checked.
    pub fn parse(&self, message: &str) -> Option<ChatCommand> {
        let message = message.trim();

        if self.digest.is_match(message) {
            return Some(ChatCommand::PostDigest);
        }

        if let Some(caps) = self.stats.captures(message) {
            let player = caps
                .get(1)
                .and_then(|m| PlayerId::parse(m.as_str()).ok());
            return Some(ChatCommand::PersonalStats { player });
        }

        None
    }
}
