// ChatClient over serenity's REST client.

use super::conversions::{classify_error, to_create_message};
use crate::core::moderation::{
    BotUser, ChannelInfo, ChatClient, ClientError, GuildInfo, GuildMemberInfo, MessageHandle,
    MessageTarget, PermissionSet, RenderedMessage, RoleInfo,
};
use async_trait::async_trait;
use serenity::http::Http;
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};
use std::sync::Arc;

pub struct SerenityChatClient {
    http: Arc<Http>,
    bot: BotUser,
}

impl SerenityChatClient {
    /// Resolve the bot's own account and build the client.
    pub async fn connect(http: Arc<Http>) -> Result<Self, ClientError> {
        let me = http
            .get_current_user()
            .await
            .map_err(|e| classify_error(&e))?;

        let bot = BotUser {
            id: me.id.get(),
            name: me.name.clone(),
            avatar_url: me.avatar_url(),
        };
        tracing::info!(bot_id = bot.id, "Anti-spam client ready as {}", bot.name);

        Ok(Self { http, bot })
    }

    pub fn http(&self) -> &Arc<Http> {
        &self.http
    }
}

fn remote_error(operation: &str, error: serenity::Error) -> ClientError {
    let classified = classify_error(&error);
    tracing::debug!(operation, %error, "Discord request failed");
    classified
}

#[async_trait]
impl ChatClient for SerenityChatClient {
    fn current_user(&self) -> BotUser {
        self.bot.clone()
    }

    async fn fetch_guild(&self, guild_id: u64) -> Result<GuildInfo, ClientError> {
        let guild = GuildId::new(guild_id)
            .to_partial_guild(&*self.http)
            .await
            .map_err(|e| remote_error("fetch_guild", e))?;

        Ok(GuildInfo {
            id: guild.id.get(),
            name: guild.name.clone(),
            icon_url: guild.icon_url(),
            owner_id: guild.owner_id.get(),
        })
    }

    async fn fetch_member(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<GuildMemberInfo, ClientError> {
        let member = GuildId::new(guild_id)
            .member(&*self.http, UserId::new(user_id))
            .await
            .map_err(|e| remote_error("fetch_member", e))?;

        Ok(GuildMemberInfo {
            user_id,
            role_ids: member.roles.iter().map(|role| role.get()).collect(),
        })
    }

    async fn fetch_member_roles(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Vec<RoleInfo>, ClientError> {
        let guild = GuildId::new(guild_id);
        let member = guild
            .member(&*self.http, UserId::new(user_id))
            .await
            .map_err(|e| remote_error("fetch_member_roles", e))?;
        let roles = guild
            .roles(&*self.http)
            .await
            .map_err(|e| remote_error("fetch_member_roles", e))?;

        // @everyone shares the guild's id and isn't listed on the member.
        let everyone = RoleId::new(guild_id);
        Ok(roles
            .values()
            .filter(|role| role.id == everyone || member.roles.contains(&role.id))
            .map(|role| RoleInfo {
                id: role.id.get(),
                name: role.name.clone(),
                permissions: PermissionSet::from_bits_truncate(role.permissions.bits()),
            })
            .collect())
    }

    async fn fetch_channel(&self, channel_id: u64) -> Result<ChannelInfo, ClientError> {
        let channel = ChannelId::new(channel_id)
            .to_channel(&*self.http)
            .await
            .map_err(|e| remote_error("fetch_channel", e))?;

        Ok(ChannelInfo {
            id: channel_id,
            name: channel.guild().map(|c| c.name),
        })
    }

    async fn fetch_message(
        &self,
        channel_id: u64,
        message_id: u64,
    ) -> Result<MessageHandle, ClientError> {
        let message = ChannelId::new(channel_id)
            .message(&*self.http, MessageId::new(message_id))
            .await
            .map_err(|e| remote_error("fetch_message", e))?;

        Ok(MessageHandle {
            channel_id: message.channel_id.get(),
            message_id: message.id.get(),
        })
    }

    async fn send_message(
        &self,
        target: MessageTarget,
        content: &RenderedMessage,
    ) -> Result<MessageHandle, ClientError> {
        let builder = to_create_message(content);
        let sent = match target {
            MessageTarget::Channel(channel_id) => {
                ChannelId::new(channel_id)
                    .send_message(&*self.http, builder)
                    .await
            }
            MessageTarget::User(user_id) => {
                UserId::new(user_id)
                    .direct_message(&*self.http, builder)
                    .await
            }
        }
        .map_err(|e| remote_error("send_message", e))?;

        Ok(MessageHandle {
            channel_id: sent.channel_id.get(),
            message_id: sent.id.get(),
        })
    }

    async fn delete_message(&self, handle: MessageHandle) -> Result<(), ClientError> {
        ChannelId::new(handle.channel_id)
            .delete_message(&*self.http, MessageId::new(handle.message_id))
            .await
            .map_err(|e| remote_error("delete_message", e))
    }

    async fn kick_member(
        &self,
        guild_id: u64,
        user_id: u64,
        reason: &str,
    ) -> Result<(), ClientError> {
        GuildId::new(guild_id)
            .kick_with_reason(&*self.http, UserId::new(user_id), reason)
            .await
            .map_err(|e| remote_error("kick_member", e))
    }

    async fn ban_member(
        &self,
        guild_id: u64,
        user_id: u64,
        reason: &str,
    ) -> Result<(), ClientError> {
        GuildId::new(guild_id)
            .ban_with_reason(&*self.http, UserId::new(user_id), 0, reason)
            .await
            .map_err(|e| remote_error("ban_member", e))
    }
}
