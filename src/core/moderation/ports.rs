// Collaborator contracts (ports) the pipeline depends on.
//
// The Discord layer implements `ChatClient`; the infra layer implements
// `MemberCache`. `SpamScorer` is whatever the host uses to decide that a
// violation happened.

use super::moderation_models::{GuildConfig, Member, Message, PropagateData, PunishmentKind};
use super::permissions::PermissionSet;
use super::templates::RenderedMessage;
use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

/// How a remote call failed, classified once at the platform edge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("rate limited")]
    RateLimited,

    #[error("internal server error")]
    InternalServerError,

    #[error("transport error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("member {member_id} is not cached for guild {guild_id}")]
    MemberNotFound { guild_id: u64, member_id: u64 },

    #[error("guild {0} is not cached")]
    GuildNotFound(u64),

    #[error("storage error: {0}")]
    Storage(String),
}

// ============================================================================
// PLATFORM ENTITIES
// ============================================================================

/// The bot's own account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotUser {
    pub id: u64,
    pub name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildInfo {
    pub id: u64,
    pub name: String,
    pub icon_url: Option<String>,
    pub owner_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: u64,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildMemberInfo {
    pub user_id: u64,
    pub role_ids: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleInfo {
    pub id: u64,
    pub name: String,
    pub permissions: PermissionSet,
}

/// Enough to find a sent (or fetched) message again for deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub channel_id: u64,
    pub message_id: u64,
}

/// Where an outgoing message goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTarget {
    Channel(u64),
    /// Private message to a user.
    User(u64),
}

// ============================================================================
// TRAITS
// ============================================================================

/// Remote operations against the chat platform.
///
/// Every async call may fail with a [`ClientError`]; callers decide whether a
/// failure is fatal, logged, or ignored.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// The bot's own account. Implementations resolve this once up front.
    fn current_user(&self) -> BotUser;

    async fn fetch_guild(&self, guild_id: u64) -> Result<GuildInfo, ClientError>;

    async fn fetch_member(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<GuildMemberInfo, ClientError>;

    /// Roles held by a member, including the guild's default role.
    async fn fetch_member_roles(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Vec<RoleInfo>, ClientError>;

    async fn fetch_channel(&self, channel_id: u64) -> Result<ChannelInfo, ClientError>;

    async fn fetch_message(
        &self,
        channel_id: u64,
        message_id: u64,
    ) -> Result<MessageHandle, ClientError>;

    async fn send_message(
        &self,
        target: MessageTarget,
        content: &RenderedMessage,
    ) -> Result<MessageHandle, ClientError>;

    async fn delete_message(&self, handle: MessageHandle) -> Result<(), ClientError>;

    async fn kick_member(&self, guild_id: u64, user_id: u64, reason: &str)
        -> Result<(), ClientError>;

    async fn ban_member(&self, guild_id: u64, user_id: u64, reason: &str)
        -> Result<(), ClientError>;
}

/// Storage for per-member counters and guild settings.
///
/// The pipeline holds no locks and never writes back a member it read
/// earlier: every change it makes goes through `update_member`.
#[async_trait]
pub trait MemberCache: Send + Sync {
    async fn get_member(&self, guild_id: u64, member_id: u64) -> Result<Member, CacheError>;

    async fn set_member(&self, member: Member) -> Result<(), CacheError>;

    /// Apply `update` to the stored member atomically and return the result.
    ///
    /// A member with no record yet starts from `Member::new`.
    async fn update_member<F>(
        &self,
        guild_id: u64,
        member_id: u64,
        update: F,
    ) -> Result<Member, CacheError>
    where
        F: FnOnce(&mut Member) + Send;

    async fn get_guild(&self, guild_id: u64) -> Result<GuildConfig, CacheError>;

    async fn set_guild(&self, guild: GuildConfig) -> Result<(), CacheError>;
}

/// The scoring stage, which lives outside this crate.
///
/// Contract: before returning `Kick` or `Ban` the scorer has already
/// incremented the member's `kick_count` in the cache (and marked them as
/// leaving). The punishment executor confirms or compensates that increment.
#[async_trait]
pub trait SpamScorer: Send + Sync {
    async fn score(
        &self,
        data: &PropagateData,
        message: &Message,
    ) -> Result<Option<PunishmentKind>, CacheError>;
}
