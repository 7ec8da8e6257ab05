// Cleanup sweeper - removes a punished member's duplicate messages.

use super::moderation_models::Member;
use super::moderation_service::ModerationService;
use super::ports::{ChannelInfo, ChatClient, ClientError, MemberCache, MessageHandle};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted: usize,
    /// Already gone, unreachable, or not deletable.
    pub skipped: usize,
}

impl<C: ChatClient + 'static, M: MemberCache> ModerationService<C, M> {
    /// Delete every flagged duplicate of `member`.
    ///
    /// Never fails: each message that can't be removed is counted as skipped
    /// and the sweep moves on.
    pub async fn purge_duplicates(&self, member: &Member) -> SweepReport {
        let mut report = SweepReport::default();
        let mut channels: HashMap<u64, Option<ChannelInfo>> = HashMap::new();

        for flagged in member.messages.iter().filter(|m| m.is_duplicate) {
            if !channels.contains_key(&flagged.channel_id) {
                let channel = match self.client.fetch_channel(flagged.channel_id).await {
                    Ok(channel) => Some(channel),
                    Err(error) => {
                        tracing::warn!(
                            channel_id = flagged.channel_id,
                            %error,
                            "Could not resolve channel while purging spam"
                        );
                        None
                    }
                };
                channels.insert(flagged.channel_id, channel);
            }

            let Some(Some(channel)) = channels.get(&flagged.channel_id) else {
                report.skipped += 1;
                continue;
            };

            let handle = match self.client.fetch_message(channel.id, flagged.id).await {
                Ok(handle) => handle,
                Err(ClientError::NotFound) => {
                    // Deleted already, possibly by a moderator.
                    report.skipped += 1;
                    continue;
                }
                Err(error) => {
                    tracing::warn!(
                        message_id = flagged.id,
                        channel_id = channel.id,
                        %error,
                        "Could not fetch message while purging spam"
                    );
                    report.skipped += 1;
                    continue;
                }
            };

            if self.delete_message(handle, flagged.guild_id).await {
                report.deleted += 1;
            } else {
                report.skipped += 1;
            }
        }

        tracing::debug!(
            member_id = member.id,
            deleted = report.deleted,
            skipped = report.skipped,
            "Purged spam"
        );
        report
    }

    /// Delete one message, logging instead of failing. Returns whether it went.
    pub async fn delete_message(&self, handle: MessageHandle, guild_id: u64) -> bool {
        match self.client.delete_message(handle).await {
            Ok(()) => {
                tracing::debug!(message_id = handle.message_id, "Deleted message");
                true
            }
            Err(ClientError::NotFound) => {
                tracing::warn!(
                    message_id = handle.message_id,
                    guild_id,
                    "Failed to delete message, it was already deleted"
                );
                false
            }
            Err(ClientError::Forbidden) => {
                tracing::warn!(
                    message_id = handle.message_id,
                    guild_id,
                    "Failed to delete message, I lack permissions"
                );
                false
            }
            Err(error) => {
                tracing::warn!(
                    message_id = handle.message_id,
                    guild_id,
                    %error,
                    "Failed to delete message"
                );
                false
            }
        }
    }
}
