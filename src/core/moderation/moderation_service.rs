// Anti-spam moderation service - orchestrates the pipeline.
//
// This service handles:
// - Normalizing inbound messages
// - Deciding whether a message is scored at all (eligibility.rs)
// - Rendering notifications (templates.rs)
// - Warn -> kick -> ban escalation once the scorer reports a violation
//   (punishment.rs, cleanup.rs)
//
// NO Discord dependencies here - platform access goes through `ChatClient`.

use super::cleanup::SweepReport;
use super::eligibility::PropagateRejection;
use super::moderation_models::{
    GuildConfig, InboundMessage, Member, Message, PropagateData, PunishmentKind,
};
use super::moderation_options::AntiSpamOptions;
use super::normalizer;
use super::ports::{CacheError, ChatClient, ClientError, MemberCache, MessageTarget, SpamScorer};
use super::punishment::{MissingAuthority, PunishmentOutcome, PunishmentRequest, PunitiveAction};
use super::templates::{build_context, RenderedMessage, RichContent};
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Invalid message content: {0}")]
    InvalidContent(String),

    #[error("Template parse error: {0}")]
    TemplateParse(String),

    #[error("Render context unavailable: {0}")]
    RenderContextUnavailable(String),

    #[error("Missing authority: {0}")]
    MissingAuthority(MissingAuthority),

    #[error("Chat client error: {0}")]
    Client(#[from] ClientError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

// ============================================================================
// OUTCOMES
// ============================================================================

/// What happened to a violation reported by the scorer.
#[derive(Debug, Clone, PartialEq)]
pub enum ViolationOutcome {
    Warned,
    Punished {
        outcome: PunishmentOutcome,
        /// Present when `delete_spam` is on and the punishment went through.
        sweep: Option<SweepReport>,
    },
}

/// Result of running one inbound message through the whole pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PropagateOutcome {
    /// Skipped before scoring.
    Rejected(PropagateRejection),
    /// Scored, no violation.
    Clean(PropagateData),
    Actioned {
        data: PropagateData,
        outcome: ViolationOutcome,
    },
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ModerationService<C: ChatClient + 'static, M: MemberCache> {
    pub(crate) client: Arc<C>,
    pub(crate) cache: M,
    pub(crate) options: AntiSpamOptions,
}

impl<C: ChatClient + 'static, M: MemberCache> ModerationService<C, M> {
    pub fn new(client: Arc<C>, cache: M, options: AntiSpamOptions) -> Self {
        Self {
            client,
            cache,
            options,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn cache(&self) -> &M {
        &self.cache
    }

    pub fn options(&self) -> &AntiSpamOptions {
        &self.options
    }

    /// Convert an inbound event into the record the scorer sees.
    pub fn normalize(&self, inbound: &InboundMessage) -> Result<Message, ModerationError> {
        normalizer::normalize(inbound, self.options.delete_zero_width_chars)
    }

    // ------------------------------------------------------------------------
    // Templates
    // ------------------------------------------------------------------------

    pub async fn substitute(
        &self,
        text: &str,
        message: &InboundMessage,
        warn_count: u32,
        kick_count: u32,
    ) -> Result<String, ModerationError> {
        let context = build_context(&*self.client, message, warn_count, kick_count).await?;
        Ok(context.substitute(text))
    }

    pub async fn render_rich_content(
        &self,
        spec: RichContent,
        message: &InboundMessage,
        warn_count: u32,
        kick_count: u32,
    ) -> Result<RichContent, ModerationError> {
        let context = build_context(&*self.client, message, warn_count, kick_count).await?;
        Ok(context.render_rich_content(spec))
    }

    pub async fn render_input(
        &self,
        raw: &str,
        message: &InboundMessage,
        warn_count: u32,
        kick_count: u32,
    ) -> Result<RenderedMessage, ModerationError> {
        let context = build_context(&*self.client, message, warn_count, kick_count).await?;
        context.render_input(raw)
    }

    /// Preview a configured template the way a member would see it.
    pub async fn visualize(
        &self,
        raw: &str,
        message: &InboundMessage,
    ) -> Result<RenderedMessage, ModerationError> {
        self.render_input(raw, message, 1, 2).await
    }

    // ------------------------------------------------------------------------
    // Pipeline
    // ------------------------------------------------------------------------

    /// Run one inbound message through eligibility, scoring and punishment.
    ///
    /// Rejections are not errors: they come back as `PropagateOutcome::Rejected`.
    pub async fn propagate<S: SpamScorer + ?Sized>(
        &self,
        inbound: &InboundMessage,
        scorer: &S,
    ) -> Result<PropagateOutcome, ModerationError> {
        let data = match self.check_propagation(inbound).await {
            Ok(data) => data,
            Err(rejection) => {
                tracing::debug!(message_id = inbound.id, %rejection, "Message not propagated");
                return Ok(PropagateOutcome::Rejected(rejection));
            }
        };

        let message = self.normalize(inbound)?;

        let Some(kind) = scorer.score(&data, &message).await? else {
            return Ok(PropagateOutcome::Clean(data));
        };

        let outcome = self.handle_violation(inbound, kind).await?;
        Ok(PropagateOutcome::Actioned { data, outcome })
    }

    /// Act on a violation the scorer reported for the author of `message`.
    pub async fn handle_violation(
        &self,
        message: &InboundMessage,
        kind: PunishmentKind,
    ) -> Result<ViolationOutcome, ModerationError> {
        let guild_id = message.guild_id.ok_or_else(|| {
            ModerationError::RenderContextUnavailable(
                "cannot punish outside of a guild".to_string(),
            )
        })?;

        let action = match kind {
            PunishmentKind::Warn => {
                self.warn_member(message, guild_id).await?;
                return Ok(ViolationOutcome::Warned);
            }
            PunishmentKind::Kick => PunitiveAction::Kick,
            PunishmentKind::Ban => PunitiveAction::Ban,
        };

        let mut member = self.cache.get_member(guild_id, message.author.id).await?;
        let guild = self.guild_config(guild_id).await;
        let messages = self.options.messages_for(kind);

        let rendered = async {
            let context =
                build_context(&*self.client, message, member.warn_count, member.kick_count)
                    .await?;
            Ok::<_, ModerationError>((
                context.render_template(messages.member_message)?,
                context.render_template(messages.guild_message)?,
            ))
        }
        .await;

        let (member_message, guild_message) = match rendered {
            Ok(rendered) => rendered,
            Err(error) => {
                // Nothing was sent yet, so this attempt never happened.
                self.commit_member(&mut member, Member::revert_punishment_attempt).await;
                return Err(error);
            }
        };

        let request = PunishmentRequest {
            message,
            guild: &guild,
            action,
            member_message,
            guild_message,
            member_delete_after: messages.member_delete_after,
            guild_delete_after: messages.guild_delete_after,
        };
        let outcome = self.punish_member(request, &mut member).await?;

        let sweep = if self.options.delete_spam && outcome == PunishmentOutcome::Completed {
            Some(self.purge_duplicates(&member).await)
        } else {
            None
        };

        Ok(ViolationOutcome::Punished { outcome, sweep })
    }

    /// Warn in the channel the spam came from and note it in the guild log.
    async fn warn_member(
        &self,
        message: &InboundMessage,
        guild_id: u64,
    ) -> Result<(), ModerationError> {
        let member = match self.cache.get_member(guild_id, message.author.id).await {
            Ok(member) => member,
            Err(CacheError::MemberNotFound { .. }) => Member::new(message.author.id, guild_id),
            Err(e) => return Err(e.into()),
        };
        let guild = self.guild_config(guild_id).await;
        let messages = self.options.messages_for(PunishmentKind::Warn);

        let context =
            build_context(&*self.client, message, member.warn_count, member.kick_count).await?;
        let member_message = context.render_template(messages.member_message)?;
        let guild_message = context.render_template(messages.guild_message)?;

        match self
            .client
            .send_message(MessageTarget::Channel(message.channel_id), &member_message)
            .await
        {
            Ok(handle) => {
                if let Some(delay) = messages.member_delete_after {
                    self.schedule_deletion(handle, delay);
                }
            }
            Err(error) => {
                tracing::warn!(
                    member_id = member.id,
                    channel_id = message.channel_id,
                    %error,
                    "Failed to send spam warning"
                );
            }
        }

        self.send_guild_log(
            &guild,
            &guild_message,
            messages.guild_delete_after,
            message.channel_id,
        )
        .await;

        Ok(())
    }

    /// Guild settings, or defaults (no log channel) if the guild isn't cached.
    async fn guild_config(&self, guild_id: u64) -> GuildConfig {
        match self.cache.get_guild(guild_id).await {
            Ok(guild) => guild,
            Err(error) => {
                tracing::debug!(guild_id, %error, "Using default guild config");
                GuildConfig::new(guild_id)
            }
        }
    }

    /// Apply `update` to the cached record and refresh `member` from it.
    ///
    /// Only the change is written, so updates that landed since `member` was
    /// read survive. A failed write is logged, never raised.
    pub(crate) async fn commit_member<F>(&self, member: &mut Member, update: F)
    where
        F: FnOnce(&mut Member) + Send,
    {
        match self
            .cache
            .update_member(member.guild_id, member.id, update)
            .await
        {
            Ok(stored) => *member = stored,
            Err(error) => {
                tracing::error!(
                    guild_id = member.guild_id,
                    member_id = member.id,
                    %error,
                    "Failed to persist member after punishment attempt"
                );
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
