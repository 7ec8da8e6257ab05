// Shared fixtures for the moderation tests: a recording chat client and an
// in-memory cache that counts writes.

use super::moderation_models::{GuildConfig, InboundMessage, Member, MessageAuthor};
use super::permissions::PermissionSet;
use super::ports::*;
use super::templates::RenderedMessage;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const GUILD_ID: u64 = 123456789;
pub const CHANNEL_ID: u64 = 555;
pub const LOG_CHANNEL_ID: u64 = 777;
pub const AUTHOR_ID: u64 = 12345;
pub const BOT_ID: u64 = 98987;
pub const OWNER_ID: u64 = 1;
pub const MESSAGE_ID: u64 = 12341234;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn bot_user() -> BotUser {
    BotUser {
        id: BOT_ID,
        name: "Anti Spam".to_string(),
        avatar_url: Some("https://cdn.test/bot.png".to_string()),
    }
}

pub fn guild_info() -> GuildInfo {
    GuildInfo {
        id: GUILD_ID,
        name: "Test Guild".to_string(),
        icon_url: Some("https://cdn.test/guild.png".to_string()),
        owner_id: OWNER_ID,
    }
}

pub fn inbound_message(text: &str) -> InboundMessage {
    InboundMessage {
        id: MESSAGE_ID,
        channel_id: CHANNEL_ID,
        guild_id: Some(GUILD_ID),
        author: MessageAuthor {
            id: AUTHOR_ID,
            name: "Skelmis".to_string(),
            is_bot: false,
            avatar_url: Some("https://cdn.test/user.png".to_string()),
        },
        text: Some(text.to_string()),
        rich_content: Vec::new(),
        created_at: Utc.with_ymd_and_hms(2021, 3, 7, 10, 0, 0).unwrap(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Send {
        target: MessageTarget,
        content: RenderedMessage,
        handle: MessageHandle,
    },
    Delete(MessageHandle),
    Kick(u64),
    Ban(u64),
}

/// Chat client that records successful calls.
///
/// Failures are injected per operation name: `fetch_guild`, `fetch_member`,
/// `fetch_member_roles`, `fetch_channel`, `fetch_message`, `send_dm`,
/// `send_channel`, `delete_message`, `kick`, `ban`.
pub struct MockChatClient {
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<&'static str, ClientError>>,
    members: Mutex<HashMap<u64, GuildMemberInfo>>,
    roles: Mutex<HashMap<u64, Vec<RoleInfo>>>,
    channels: Mutex<HashMap<u64, ChannelInfo>>,
    live_messages: Mutex<HashSet<MessageHandle>>,
    next_message_id: AtomicU64,
    channel_fetches: AtomicUsize,
    punish_hook: Mutex<Option<Box<dyn Fn() + Send>>>,
}

impl MockChatClient {
    /// A guild where the author is a plain member and the bot can kick and ban.
    pub fn new() -> Self {
        init_tracing();

        let client = Self {
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            members: Mutex::new(HashMap::new()),
            roles: Mutex::new(HashMap::new()),
            channels: Mutex::new(HashMap::new()),
            live_messages: Mutex::new(HashSet::new()),
            next_message_id: AtomicU64::new(900_000),
            channel_fetches: AtomicUsize::new(0),
            punish_hook: Mutex::new(None),
        };

        client.add_member(AUTHOR_ID, vec![]);
        client.add_member(BOT_ID, vec![]);
        client.set_roles(AUTHOR_ID, vec![("@everyone", PermissionSet::NONE)]);
        client.set_roles(
            BOT_ID,
            vec![(
                "Moderator",
                PermissionSet::KICK_MEMBERS | PermissionSet::BAN_MEMBERS,
            )],
        );
        client.add_channel(CHANNEL_ID, "general");
        client.add_channel(LOG_CHANNEL_ID, "mod-log");
        client
    }

    pub fn fail(&self, operation: &'static str, error: ClientError) {
        self.failures.lock().unwrap().insert(operation, error);
    }

    /// Run `hook` inside every kick or ban call, before it succeeds or fails.
    pub fn on_punish(&self, hook: impl Fn() + Send + 'static) {
        *self.punish_hook.lock().unwrap() = Some(Box::new(hook));
    }

    fn run_punish_hook(&self) {
        if let Some(hook) = self.punish_hook.lock().unwrap().as_ref() {
            hook();
        }
    }

    fn check(&self, operation: &'static str) -> Result<(), ClientError> {
        match self.failures.lock().unwrap().get(operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    pub fn add_member(&self, user_id: u64, role_ids: Vec<u64>) {
        self.members
            .lock()
            .unwrap()
            .insert(user_id, GuildMemberInfo { user_id, role_ids });
    }

    pub fn remove_member(&self, user_id: u64) {
        self.members.lock().unwrap().remove(&user_id);
    }

    pub fn set_roles(&self, user_id: u64, roles: Vec<(&str, PermissionSet)>) {
        let roles = roles
            .into_iter()
            .enumerate()
            .map(|(i, (name, permissions))| RoleInfo {
                id: 1000 + i as u64,
                name: name.to_string(),
                permissions,
            })
            .collect();
        self.roles.lock().unwrap().insert(user_id, roles);
    }

    pub fn add_channel(&self, channel_id: u64, name: &str) {
        self.channels.lock().unwrap().insert(
            channel_id,
            ChannelInfo {
                id: channel_id,
                name: Some(name.to_string()),
            },
        );
    }

    pub fn add_live_message(&self, channel_id: u64, message_id: u64) {
        self.live_messages.lock().unwrap().insert(MessageHandle {
            channel_id,
            message_id,
        });
    }

    pub fn is_live(&self, handle: MessageHandle) -> bool {
        self.live_messages.lock().unwrap().contains(&handle)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Everything successfully sent to `target`, in order.
    pub fn sent_to(&self, target: MessageTarget) -> Vec<RenderedMessage> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Send {
                    target: t, content, ..
                } if t == target => Some(content),
                _ => None,
            })
            .collect()
    }

    pub fn deleted(&self) -> Vec<MessageHandle> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Delete(handle) => Some(handle),
                _ => None,
            })
            .collect()
    }

    pub fn channel_fetches(&self) -> usize {
        self.channel_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    fn current_user(&self) -> BotUser {
        bot_user()
    }

    async fn fetch_guild(&self, guild_id: u64) -> Result<GuildInfo, ClientError> {
        self.check("fetch_guild")?;
        let mut guild = guild_info();
        guild.id = guild_id;
        Ok(guild)
    }

    async fn fetch_member(
        &self,
        _guild_id: u64,
        user_id: u64,
    ) -> Result<GuildMemberInfo, ClientError> {
        self.check("fetch_member")?;
        self.members
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .ok_or(ClientError::NotFound)
    }

    async fn fetch_member_roles(
        &self,
        _guild_id: u64,
        user_id: u64,
    ) -> Result<Vec<RoleInfo>, ClientError> {
        self.check("fetch_member_roles")?;
        Ok(self
            .roles
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_channel(&self, channel_id: u64) -> Result<ChannelInfo, ClientError> {
        self.channel_fetches.fetch_add(1, Ordering::SeqCst);
        self.check("fetch_channel")?;
        self.channels
            .lock()
            .unwrap()
            .get(&channel_id)
            .cloned()
            .ok_or(ClientError::NotFound)
    }

    async fn fetch_message(
        &self,
        channel_id: u64,
        message_id: u64,
    ) -> Result<MessageHandle, ClientError> {
        self.check("fetch_message")?;
        let handle = MessageHandle {
            channel_id,
            message_id,
        };
        if self.is_live(handle) {
            Ok(handle)
        } else {
            Err(ClientError::NotFound)
        }
    }

    async fn send_message(
        &self,
        target: MessageTarget,
        content: &RenderedMessage,
    ) -> Result<MessageHandle, ClientError> {
        let (operation, channel_id) = match target {
            MessageTarget::User(user_id) => ("send_dm", user_id),
            MessageTarget::Channel(channel_id) => ("send_channel", channel_id),
        };
        self.check(operation)?;

        let handle = MessageHandle {
            channel_id,
            message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst),
        };
        self.live_messages.lock().unwrap().insert(handle);
        self.calls.lock().unwrap().push(Call::Send {
            target,
            content: content.clone(),
            handle,
        });
        Ok(handle)
    }

    async fn delete_message(&self, handle: MessageHandle) -> Result<(), ClientError> {
        self.check("delete_message")?;
        if !self.live_messages.lock().unwrap().remove(&handle) {
            return Err(ClientError::NotFound);
        }
        self.calls.lock().unwrap().push(Call::Delete(handle));
        Ok(())
    }

    async fn kick_member(
        &self,
        _guild_id: u64,
        user_id: u64,
        _reason: &str,
    ) -> Result<(), ClientError> {
        self.run_punish_hook();
        self.check("kick")?;
        self.calls.lock().unwrap().push(Call::Kick(user_id));
        Ok(())
    }

    async fn ban_member(
        &self,
        _guild_id: u64,
        user_id: u64,
        _reason: &str,
    ) -> Result<(), ClientError> {
        self.run_punish_hook();
        self.check("ban")?;
        self.calls.lock().unwrap().push(Call::Ban(user_id));
        Ok(())
    }
}

/// In-memory cache that counts member writes.
pub struct MockMemberCache {
    members: DashMap<(u64, u64), Member>,
    guilds: DashMap<u64, GuildConfig>,
    member_writes: AtomicUsize,
}

impl MockMemberCache {
    pub fn new() -> Self {
        Self {
            members: DashMap::new(),
            guilds: DashMap::new(),
            member_writes: AtomicUsize::new(0),
        }
    }

    pub fn with_member(member: Member) -> Self {
        let cache = Self::new();
        cache.members.insert((member.guild_id, member.id), member);
        cache
    }

    pub fn member(&self, guild_id: u64, member_id: u64) -> Option<Member> {
        self.members.get(&(guild_id, member_id)).map(|m| m.clone())
    }

    pub fn member_writes(&self) -> usize {
        self.member_writes.load(Ordering::SeqCst)
    }

    /// Change a stored member the way another event would, without counting
    /// it as a pipeline write.
    pub fn edit_member(&self, guild_id: u64, member_id: u64, f: impl FnOnce(&mut Member)) {
        if let Some(mut member) = self.members.get_mut(&(guild_id, member_id)) {
            f(member.value_mut());
        }
    }
}

#[async_trait]
impl MemberCache for MockMemberCache {
    async fn get_member(&self, guild_id: u64, member_id: u64) -> Result<Member, CacheError> {
        self.member(guild_id, member_id)
            .ok_or(CacheError::MemberNotFound {
                guild_id,
                member_id,
            })
    }

    async fn set_member(&self, member: Member) -> Result<(), CacheError> {
        self.member_writes.fetch_add(1, Ordering::SeqCst);
        self.members.insert((member.guild_id, member.id), member);
        Ok(())
    }

    async fn update_member<F>(
        &self,
        guild_id: u64,
        member_id: u64,
        update: F,
    ) -> Result<Member, CacheError>
    where
        F: FnOnce(&mut Member) + Send,
    {
        self.member_writes.fetch_add(1, Ordering::SeqCst);
        let mut entry = self
            .members
            .entry((guild_id, member_id))
            .or_insert_with(|| Member::new(member_id, guild_id));
        update(entry.value_mut());
        Ok(entry.value().clone())
    }

    async fn get_guild(&self, guild_id: u64) -> Result<GuildConfig, CacheError> {
        self.guilds
            .get(&guild_id)
            .map(|g| g.clone())
            .ok_or(CacheError::GuildNotFound(guild_id))
    }

    async fn set_guild(&self, guild: GuildConfig) -> Result<(), CacheError> {
        self.guilds.insert(guild.id, guild);
        Ok(())
    }
}

#[async_trait]
impl MemberCache for Arc<MockMemberCache> {
    async fn get_member(&self, guild_id: u64, member_id: u64) -> Result<Member, CacheError> {
        self.as_ref().get_member(guild_id, member_id).await
    }

    async fn set_member(&self, member: Member) -> Result<(), CacheError> {
        self.as_ref().set_member(member).await
    }

    async fn update_member<F>(
        &self,
        guild_id: u64,
        member_id: u64,
        update: F,
    ) -> Result<Member, CacheError>
    where
        F: FnOnce(&mut Member) + Send,
    {
        self.as_ref().update_member(guild_id, member_id, update).await
    }

    async fn get_guild(&self, guild_id: u64) -> Result<GuildConfig, CacheError> {
        self.as_ref().get_guild(guild_id).await
    }

    async fn set_guild(&self, guild: GuildConfig) -> Result<(), CacheError> {
        self.as_ref().set_guild(guild).await
    }
}
