// Handler-wide anti-spam options.
//
// Read-only to the pipeline; the host loads them (see
// `infra::moderation::options_file`) and hands them to `ModerationService`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// An ignore-list entry: either a numeric id or a display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ignorable {
    Id(u64),
    Name(String),
}

/// Ignore list that matches on ids and on display names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IgnoreList(HashSet<Ignorable>);

impl IgnoreList {
    pub fn contains_id(&self, id: u64) -> bool {
        self.0.contains(&Ignorable::Id(id))
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.0.contains(&Ignorable::Name(name.to_string()))
    }

    pub fn insert(&mut self, entry: Ignorable) {
        self.0.insert(entry);
    }
}

impl FromIterator<Ignorable> for IgnoreList {
    fn from_iter<T: IntoIterator<Item = Ignorable>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A configured message: plain text (which may itself hold a `{...}`
/// rich-content literal) or an inline rich-content object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageTemplate {
    Text(String),
    Rich(serde_json::Value),
}

impl From<&str> for MessageTemplate {
    fn from(value: &str) -> Self {
        MessageTemplate::Text(value.to_string())
    }
}

/// Configuration for anti-spam behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AntiSpamOptions {
    /// Skip messages sent by bot accounts
    pub ignore_bots: bool,
    /// Strip zero-width characters before the message is scored
    pub delete_zero_width_chars: bool,
    /// Purge the member's duplicate messages after a kick or ban
    pub delete_spam: bool,

    pub ignored_members: HashSet<u64>,
    pub ignored_channels: IgnoreList,
    pub ignored_roles: IgnoreList,
    pub ignored_guilds: HashSet<u64>,

    pub member_warn_message: MessageTemplate,
    pub member_kick_message: MessageTemplate,
    pub member_ban_message: MessageTemplate,
    pub member_failed_kick_message: MessageTemplate,
    pub member_failed_ban_message: MessageTemplate,
    pub guild_log_warn_message: MessageTemplate,
    pub guild_log_kick_message: MessageTemplate,
    pub guild_log_ban_message: MessageTemplate,

    // Delays are in seconds; `None` keeps the message.
    pub member_warn_message_delete_after: Option<u64>,
    pub member_kick_message_delete_after: Option<u64>,
    pub member_ban_message_delete_after: Option<u64>,
    pub guild_log_warn_message_delete_after: Option<u64>,
    pub guild_log_kick_message_delete_after: Option<u64>,
    pub guild_log_ban_message_delete_after: Option<u64>,
}

impl Default for AntiSpamOptions {
    fn default() -> Self {
        Self {
            ignore_bots: true,
            delete_zero_width_chars: true,
            delete_spam: false,
            ignored_members: HashSet::new(),
            ignored_channels: IgnoreList::default(),
            ignored_roles: IgnoreList::default(),
            ignored_guilds: HashSet::new(),
            member_warn_message:
                "Hey $MENTIONUSER, please stop spamming/sending duplicate messages.".into(),
            member_kick_message:
                "Hey $MENTIONUSER, you are being kicked from $GUILDNAME for spamming/sending duplicate messages."
                    .into(),
            member_ban_message:
                "Hey $MENTIONUSER, you are being banned from $GUILDNAME for spamming/sending duplicate messages."
                    .into(),
            member_failed_kick_message:
                "I failed to punish you because I lack permissions, but still you shouldn't spam."
                    .into(),
            member_failed_ban_message:
                "I failed to punish you because I lack permissions, but still you shouldn't spam."
                    .into(),
            guild_log_warn_message:
                "$MENTIONUSER was warned for spamming/sending duplicate messages.".into(),
            guild_log_kick_message:
                "$USERNAME was kicked for spamming/sending duplicate messages.".into(),
            guild_log_ban_message:
                "$USERNAME was banned for spamming/sending duplicate messages.".into(),
            member_warn_message_delete_after: None,
            member_kick_message_delete_after: None,
            member_ban_message_delete_after: None,
            guild_log_warn_message_delete_after: None,
            guild_log_kick_message_delete_after: None,
            guild_log_ban_message_delete_after: None,
        }
    }
}

/// Templates and delays for one escalation level.
#[derive(Debug, Clone, Copy)]
pub struct PunishmentMessages<'a> {
    pub member_message: &'a MessageTemplate,
    pub guild_message: &'a MessageTemplate,
    /// Only kicks and bans have a "failed" variant.
    pub failed_message: Option<&'a MessageTemplate>,
    pub member_delete_after: Option<Duration>,
    pub guild_delete_after: Option<Duration>,
}

impl AntiSpamOptions {
    pub fn messages_for(&self, kind: super::PunishmentKind) -> PunishmentMessages<'_> {
        use super::PunishmentKind::*;

        let secs = |value: Option<u64>| value.map(Duration::from_secs);
        match kind {
            Warn => PunishmentMessages {
                member_message: &self.member_warn_message,
                guild_message: &self.guild_log_warn_message,
                failed_message: None,
                member_delete_after: secs(self.member_warn_message_delete_after),
                guild_delete_after: secs(self.guild_log_warn_message_delete_after),
            },
            Kick => PunishmentMessages {
                member_message: &self.member_kick_message,
                guild_message: &self.guild_log_kick_message,
                failed_message: Some(&self.member_failed_kick_message),
                member_delete_after: secs(self.member_kick_message_delete_after),
                guild_delete_after: secs(self.guild_log_kick_message_delete_after),
            },
            Ban => PunishmentMessages {
                member_message: &self.member_ban_message,
                guild_message: &self.guild_log_ban_message,
                failed_message: Some(&self.member_failed_ban_message),
                member_delete_after: secs(self.member_ban_message_delete_after),
                guild_delete_after: secs(self.guild_log_ban_message_delete_after),
            },
        }
    }
}
