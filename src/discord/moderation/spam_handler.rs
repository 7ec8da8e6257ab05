// Discord-specific spam handling - feeds serenity message events into the core pipeline.

use super::conversions::inbound_from_serenity;
use super::serenity_client::SerenityChatClient;
use crate::core::moderation::{
    ChatClient, MemberCache, ModerationError, ModerationService, PropagateOutcome, SpamScorer,
};
use serenity::async_trait;
use serenity::client::{Context, EventHandler};
use serenity::model::channel::Message;
use std::sync::Arc;

/// Run one serenity message through the anti-spam pipeline.
///
/// Returns `true` if the author was warned or punished. Messages without any
/// usable content are skipped quietly.
pub async fn handle_message_for_spam<C, M, S>(
    msg: &Message,
    service: &ModerationService<C, M>,
    scorer: &S,
) -> Result<bool, ModerationError>
where
    C: ChatClient + 'static,
    M: MemberCache,
    S: SpamScorer + ?Sized,
{
    let inbound = inbound_from_serenity(msg);

    match service.propagate(&inbound, scorer).await {
        Ok(PropagateOutcome::Actioned { data, outcome }) => {
            tracing::info!(
                guild_id = data.guild_id,
                member_id = data.member_id,
                ?outcome,
                "Handled spam from {}",
                data.member_name
            );
            Ok(true)
        }
        Ok(_) => Ok(false),
        Err(ModerationError::InvalidContent(reason)) => {
            tracing::debug!(message_id = inbound.id, "Skipping message: {}", reason);
            Ok(false)
        }
        Err(ModerationError::MissingAuthority(reason)) => {
            tracing::warn!(message_id = inbound.id, "Could not punish spammer: {}", reason);
            Err(ModerationError::MissingAuthority(reason))
        }
        Err(e) => {
            tracing::error!(message_id = inbound.id, "Anti-spam pipeline failed: {}", e);
            Err(e)
        }
    }
}

/// Serenity event handler that only cares about new messages.
pub struct AntiSpamHandler<M: MemberCache, S: SpamScorer> {
    service: Arc<ModerationService<SerenityChatClient, M>>,
    scorer: Arc<S>,
}

impl<M: MemberCache, S: SpamScorer> AntiSpamHandler<M, S> {
    pub fn new(service: Arc<ModerationService<SerenityChatClient, M>>, scorer: Arc<S>) -> Self {
        Self { service, scorer }
    }
}

#[async_trait]
impl<M, S> EventHandler for AntiSpamHandler<M, S>
where
    M: MemberCache + 'static,
    S: SpamScorer + 'static,
{
    async fn message(&self, _ctx: Context, msg: Message) {
        // Errors are already logged with their context.
        let _ = handle_message_for_spam(&msg, &self.service, self.scorer.as_ref()).await;
    }
}
