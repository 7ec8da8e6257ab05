// Eligibility filter - decides whether a message is scored at all.
//
// Checks run in a fixed order and the first failing one wins. A rejection is
// never an error for the host, just a reason to skip scoring.

use super::moderation_models::{InboundMessage, PropagateData};
use super::moderation_service::ModerationService;
use super::permissions::effective_permissions;
use super::ports::{ChatClient, MemberCache};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropagateRejection {
    #[error("Ignoring messages from dm's")]
    NotInGuild,

    #[error("Ignoring messages from myself (the bot)")]
    SelfAuthored,

    #[error("Could not resolve member {member_id} in guild {guild_id}")]
    UnresolvableMember { guild_id: u64, member_id: u64 },

    #[error("Ignoring messages from bots")]
    IgnoredBot,

    #[error("Ignoring this member: {0}")]
    IgnoredMember(u64),

    #[error("Ignoring this channel: {0}")]
    IgnoredChannel(u64),

    #[error("Ignoring this role: {0}")]
    IgnoredRole(String),

    #[error("Ignoring this guild: {0}")]
    IgnoredGuild(u64),
}

impl<C: ChatClient + 'static, M: MemberCache> ModerationService<C, M> {
    /// Run the eligibility chain for `message`.
    pub async fn check_propagation(
        &self,
        message: &InboundMessage,
    ) -> Result<PropagateData, PropagateRejection> {
        let options = &self.options;
        let author = &message.author;

        let Some(guild_id) = message.guild_id else {
            tracing::debug!("Message was not in a guild");
            return Err(PropagateRejection::NotInGuild);
        };

        let bot = self.client.current_user();
        if author.id == bot.id {
            tracing::debug!("Message was from myself");
            return Err(PropagateRejection::SelfAuthored);
        }

        let member = match self.client.fetch_member(guild_id, author.id).await {
            Ok(member) => member,
            Err(error) => {
                // Usually a stale or partial member list on the platform side.
                tracing::error!(
                    guild_id,
                    member_id = author.id,
                    %error,
                    "Could not resolve the author of a message as a guild member"
                );
                return Err(PropagateRejection::UnresolvableMember {
                    guild_id,
                    member_id: author.id,
                });
            }
        };

        if options.ignore_bots && author.is_bot {
            tracing::debug!(member_id = author.id, "Ignoring bot message");
            return Err(PropagateRejection::IgnoredBot);
        }

        if options.ignored_members.contains(&author.id) {
            tracing::debug!(member_id = author.id, "The user who sent this message is ignored");
            return Err(PropagateRejection::IgnoredMember(author.id));
        }

        let channel_name = match self.client.fetch_channel(message.channel_id).await {
            Ok(channel) => channel.name,
            Err(error) => {
                tracing::warn!(
                    channel_id = message.channel_id,
                    %error,
                    "Could not fetch channel, checking ignored channels by id only"
                );
                None
            }
        };
        let channel_ignored = options.ignored_channels.contains_id(message.channel_id)
            || channel_name
                .as_deref()
                .is_some_and(|name| options.ignored_channels.contains_name(name));
        if channel_ignored {
            tracing::debug!(channel_id = message.channel_id, "Channel is ignored");
            return Err(PropagateRejection::IgnoredChannel(message.channel_id));
        }

        if let Some(role_id) = member
            .role_ids
            .iter()
            .find(|id| options.ignored_roles.contains_id(**id))
        {
            tracing::debug!(role_id, "Member has an ignored role");
            return Err(PropagateRejection::IgnoredRole(role_id.to_string()));
        }
        match self.client.fetch_member_roles(guild_id, author.id).await {
            Ok(roles) => {
                if let Some(role) = roles.iter().find(|role| {
                    options.ignored_roles.contains_id(role.id)
                        || options.ignored_roles.contains_name(&role.name)
                }) {
                    tracing::debug!(role = %role.name, "Member has an ignored role");
                    return Err(PropagateRejection::IgnoredRole(role.name.clone()));
                }
            }
            Err(error) => {
                tracing::warn!(
                    "Could not compute ignored_roles for {}({}): {}",
                    author.name,
                    author.id,
                    error
                );
            }
        }

        if options.ignored_guilds.contains(&guild_id) {
            tracing::debug!(guild_id, "Guild is ignored");
            return Err(PropagateRejection::IgnoredGuild(guild_id));
        }

        let has_perms = match effective_permissions(&*self.client, guild_id, bot.id).await {
            Ok(perms) => perms.can_kick() && perms.can_ban(),
            Err(error) => {
                tracing::warn!(guild_id, %error, "Could not resolve my own permissions");
                false
            }
        };

        Ok(PropagateData {
            guild_id,
            member_name: author.name.clone(),
            member_id: author.id,
            has_perms_to_make_guild: has_perms,
        })
    }
}
