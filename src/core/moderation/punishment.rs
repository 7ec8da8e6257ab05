// Punishment executor - one kick or ban attempt for one member.
//
// Authorizing -> Notifying -> Acting -> Logging -> Done, with `Denied`
// (returned as `MissingAuthority`) and `PartialFailure` as the failure exits.
//
// The scorer has already bumped `kick_count` and marked the member as gone.
// Every path that ends without a punishment gives that bump back through
// `Member::revert_punishment_attempt`.

use super::moderation_models::{GuildConfig, InboundMessage, Member, PunishmentKind};
use super::moderation_service::{ModerationError, ModerationService};
use super::permissions::{effective_permissions, PermissionSet};
use super::ports::{ChatClient, MemberCache, MessageHandle, MessageTarget};
use super::templates::{build_context, RenderedMessage};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

const PUNISHMENT_REASON: &str = "Automated punishment from Anti-Spam.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunitiveAction {
    Kick,
    Ban,
}

impl PunitiveAction {
    pub fn kind(self) -> PunishmentKind {
        match self {
            PunitiveAction::Kick => PunishmentKind::Kick,
            PunitiveAction::Ban => PunishmentKind::Ban,
        }
    }
}

impl fmt::Display for PunitiveAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PunitiveAction::Kick => write!(f, "kick"),
            PunitiveAction::Ban => write!(f, "ban"),
        }
    }
}

/// Why the bot refused to attempt a punishment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MissingAuthority {
    #[error("I need kick perms to punish someone in {guild_name}")]
    KickMembers { guild_name: String },

    #[error("I need ban perms to punish someone in {guild_name}")]
    BanMembers { guild_name: String },

    #[error("I cannot punish {member_name}({member_id}) because they own this guild. ({guild_name})")]
    GuildOwner {
        member_name: String,
        member_id: u64,
        guild_name: String,
    },
}

/// Everything one attempt needs besides the member record.
#[derive(Debug, Clone)]
pub struct PunishmentRequest<'a> {
    /// The message that triggered the punishment.
    pub message: &'a InboundMessage,
    pub guild: &'a GuildConfig,
    pub action: PunitiveAction,
    /// Private notice for the member, already rendered.
    pub member_message: RenderedMessage,
    /// Log entry for a punishment that went through, already rendered.
    pub guild_message: RenderedMessage,
    pub member_delete_after: Option<Duration>,
    pub guild_delete_after: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunishmentOutcome {
    Completed,
    /// The kick or ban call failed; the member record says nothing happened.
    PartialFailure {
        /// The member had been told about the punishment.
        notified: bool,
        /// That notice was deleted again.
        retracted: bool,
    },
}

impl<C: ChatClient + 'static, M: MemberCache> ModerationService<C, M> {
    /// Run one punishment attempt against `member`.
    ///
    /// The cache is written exactly once, whatever the exit, and `member` is
    /// refreshed from the stored record afterwards.
    pub async fn punish_member(
        &self,
        request: PunishmentRequest<'_>,
        member: &mut Member,
    ) -> Result<PunishmentOutcome, ModerationError> {
        let message = request.message;
        let author = &message.author;
        let action = request.action;

        // Authorizing
        if let Err(error) = self.authorize(&request, member).await {
            self.commit_member(member, Member::revert_punishment_attempt).await;
            return Err(error);
        }

        // Notifying
        let notice = match self
            .client
            .send_message(MessageTarget::User(author.id), &request.member_message)
            .await
        {
            Ok(handle) => {
                if let Some(delay) = request.member_delete_after {
                    self.schedule_deletion(handle, delay);
                }
                Some(handle)
            }
            Err(error) => {
                tracing::warn!(
                    member_id = author.id,
                    %error,
                    "Failed to message user about {}",
                    action
                );
                let failed = RenderedMessage::Text(format!(
                    "Sending a message to {} about their {} failed.",
                    author.mention(),
                    action
                ));
                self.send_guild_log(
                    request.guild,
                    &failed,
                    request.guild_delete_after,
                    message.channel_id,
                )
                .await;
                None
            }
        };

        // Acting
        let result = match action {
            PunitiveAction::Kick => {
                self.client
                    .kick_member(member.guild_id, member.id, PUNISHMENT_REASON)
                    .await
            }
            PunitiveAction::Ban => {
                self.client
                    .ban_member(member.guild_id, member.id, PUNISHMENT_REASON)
                    .await
            }
        };

        let mut reverted = false;
        let outcome = match result {
            Ok(()) => {
                match action {
                    PunitiveAction::Kick => tracing::info!("Kicked User: ({})", member.id),
                    PunitiveAction::Ban => tracing::info!("Banned User: ({})", member.id),
                }

                // Logging
                self.send_guild_log(
                    request.guild,
                    &request.guild_message,
                    request.guild_delete_after,
                    message.channel_id,
                )
                .await;
                PunishmentOutcome::Completed
            }
            Err(error) => {
                // Local copy only, so the failure notices show the reverted
                // counters. The cache gets the same change at Done.
                member.revert_punishment_attempt();
                reverted = true;
                tracing::error!(
                    member_id = member.id,
                    %error,
                    "An error occurred trying to {}",
                    action
                );

                let notice_text = RenderedMessage::Text(format!(
                    "An error occurred trying to {}: <@{}>",
                    action, member.id
                ));
                self.send_guild_log(
                    request.guild,
                    &notice_text,
                    request.guild_delete_after,
                    message.channel_id,
                )
                .await;

                let retracted = match notice {
                    Some(handle) => {
                        self.log_failed_punishment(&request, member).await;
                        self.delete_message(handle, member.guild_id).await
                    }
                    None => false,
                };

                PunishmentOutcome::PartialFailure {
                    notified: notice.is_some(),
                    retracted,
                }
            }
        };

        // Done
        self.commit_member(member, move |stored| {
            if reverted {
                stored.revert_punishment_attempt();
            }
            stored.is_in_guild = true;
        })
        .await;

        Ok(outcome)
    }

    async fn authorize(
        &self,
        request: &PunishmentRequest<'_>,
        member: &Member,
    ) -> Result<(), ModerationError> {
        let guild = self.client.fetch_guild(member.guild_id).await?;
        let bot = self.client.current_user();

        let perms = match effective_permissions(&*self.client, guild.id, bot.id).await {
            Ok(perms) => perms,
            Err(error) => {
                tracing::warn!(
                    guild_id = guild.id,
                    %error,
                    "Could not resolve my own permissions"
                );
                PermissionSet::NONE
            }
        };

        let denied = match request.action {
            PunitiveAction::Kick if !perms.can_kick() => Some(MissingAuthority::KickMembers {
                guild_name: guild.name.clone(),
            }),
            PunitiveAction::Ban if !perms.can_ban() => Some(MissingAuthority::BanMembers {
                guild_name: guild.name.clone(),
            }),
            _ if guild.owner_id == member.id => Some(MissingAuthority::GuildOwner {
                member_name: request.message.author.name.clone(),
                member_id: member.id,
                guild_name: guild.name.clone(),
            }),
            _ => None,
        };

        match denied {
            Some(reason) => {
                tracing::warn!(
                    guild_id = guild.id,
                    member_id = member.id,
                    %reason,
                    "Punishment denied"
                );
                Err(ModerationError::MissingAuthority(reason))
            }
            None => Ok(()),
        }
    }

    /// Log the "failed kick/ban" template after the punitive call failed.
    async fn log_failed_punishment(&self, request: &PunishmentRequest<'_>, member: &Member) {
        let Some(template) = self.options.messages_for(request.action.kind()).failed_message
        else {
            return;
        };

        let rendered = async {
            let context = build_context(
                &*self.client,
                request.message,
                member.warn_count,
                member.kick_count,
            )
            .await?;
            context.render_template(template)
        }
        .await;

        match rendered {
            Ok(content) => {
                self.send_guild_log(
                    request.guild,
                    &content,
                    request.guild_delete_after,
                    request.message.channel_id,
                )
                .await;
            }
            Err(error) => {
                tracing::error!(
                    member_id = member.id,
                    %error,
                    "Failed to render failed {} message",
                    request.action
                );
            }
        }
    }

    /// Send `content` to the guild's log channel, or to `origin_channel_id`
    /// when none is configured.
    ///
    /// Failures are logged and swallowed.
    pub async fn send_guild_log(
        &self,
        guild: &GuildConfig,
        content: &RenderedMessage,
        delete_after: Option<Duration>,
        origin_channel_id: u64,
    ) -> Option<MessageHandle> {
        let channel_id = guild.log_channel_id.unwrap_or(origin_channel_id);

        match self
            .client
            .send_message(MessageTarget::Channel(channel_id), content)
            .await
        {
            Ok(handle) => {
                if let Some(delay) = delete_after {
                    self.schedule_deletion(handle, delay);
                }
                Some(handle)
            }
            Err(error) => {
                tracing::error!(
                    guild_id = guild.id,
                    channel_id,
                    %error,
                    "Failed to send log message"
                );
                None
            }
        }
    }

    /// Delete `handle` after `delay` without holding up the caller.
    pub(crate) fn schedule_deletion(
        &self,
        handle: MessageHandle,
        delay: Duration,
    ) -> JoinHandle<()> {
        let client = Arc::clone(&self.client);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(error) = client.delete_message(handle).await {
                tracing::debug!(
                    channel_id = handle.channel_id,
                    message_id = handle.message_id,
                    %error,
                    "Deferred deletion failed"
                );
            }
        })
    }
}
