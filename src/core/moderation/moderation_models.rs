// Moderation domain models - data structures for the anti-spam pipeline.
//
// These are pure domain types with no Discord dependencies.
// The Discord layer converts serenity entities into these.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of an inbound message, as much as the pipeline needs to know.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageAuthor {
    pub id: u64,
    pub name: String,
    pub is_bot: bool,
    pub avatar_url: Option<String>,
}

impl MessageAuthor {
    /// Platform mention string, e.g. `<@1234>`.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// An already-parsed platform message event.
///
/// `rich_content` keeps the raw embed payloads as JSON so a malformed payload
/// can be detected during normalization instead of at the platform edge.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: u64,
    pub channel_id: u64,
    pub guild_id: Option<u64>,
    pub author: MessageAuthor,
    pub text: Option<String>,
    pub rich_content: Vec<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Normalized message record used by every downstream stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u64,
    pub channel_id: u64,
    pub guild_id: Option<u64>,
    pub author_id: u64,
    pub content: String,
}

/// A message the scoring stage remembered for a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlaggedMessage {
    pub id: u64,
    pub channel_id: u64,
    pub guild_id: u64,
    pub is_duplicate: bool,
}

/// Per-member moderation record, owned by the member cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: u64,
    pub guild_id: u64,
    pub warn_count: u32,
    pub kick_count: u32,
    pub is_in_guild: bool,
    pub messages: Vec<FlaggedMessage>,
}

impl Member {
    pub fn new(id: u64, guild_id: u64) -> Self {
        Self {
            id,
            guild_id,
            warn_count: 0,
            kick_count: 0,
            is_in_guild: true,
            messages: Vec::new(),
        }
    }

    /// Undo the scoring stage's optimistic `kick_count` increment.
    ///
    /// The scoring stage bumps `kick_count` by one before asking for a
    /// punishment; a denied or failed attempt gives exactly that one back.
    pub fn revert_punishment_attempt(&mut self) {
        self.kick_count = self.kick_count.saturating_sub(1);
        self.is_in_guild = true;
    }
}

/// Guild-level moderation settings kept in the member cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildConfig {
    pub id: u64,
    pub log_channel_id: Option<u64>,
}

impl GuildConfig {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            log_channel_id: None,
        }
    }
}

/// Result of a successful eligibility check, handed to the scoring stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagateData {
    pub guild_id: u64,
    pub member_name: String,
    pub member_id: u64,
    pub has_perms_to_make_guild: bool,
}

/// Escalation level decided by the scoring stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunishmentKind {
    Warn,
    Kick,
    Ban,
}

impl std::fmt::Display for PunishmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PunishmentKind::Warn => write!(f, "warn"),
            PunishmentKind::Kick => write!(f, "kick"),
            PunishmentKind::Ban => write!(f, "ban"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revert_gives_back_exactly_one_kick() {
        let mut member = Member::new(1, 2);
        member.kick_count = 3;
        member.is_in_guild = false;

        member.revert_punishment_attempt();

        assert_eq!(member.kick_count, 2);
        assert!(member.is_in_guild);
    }

    #[test]
    fn test_author_mention() {
        let author = MessageAuthor {
            id: 12345,
            name: "Skelmis".to_string(),
            is_bot: false,
            avatar_url: None,
        };
        assert_eq!(author.mention(), "<@12345>");
    }
}
