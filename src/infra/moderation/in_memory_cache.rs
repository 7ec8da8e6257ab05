// In-memory implementation of MemberCache.
//
// Good enough for a single process. Records are lost on restart, which only
// resets warn/kick counters.

use crate::core::moderation::{CacheError, GuildConfig, Member, MemberCache};
use async_trait::async_trait;
use dashmap::DashMap;

/// Members are keyed by (guild_id, member_id) since a user can be in many guilds.
#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug)]
struct MemberKey {
    guild_id: u64,
    member_id: u64,
}

/// DashMap-backed member and guild records.
///
/// `update_member` runs its closure under the entry lock, so concurrent
/// updates to the same member never lose each other's changes.
pub struct InMemoryMemberCache {
    members: DashMap<MemberKey, Member>,
    guilds: DashMap<u64, GuildConfig>,
}

impl InMemoryMemberCache {
    pub fn new() -> Self {
        Self {
            members: DashMap::new(),
            guilds: DashMap::new(),
        }
    }
}

impl Default for InMemoryMemberCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemberCache for InMemoryMemberCache {
    async fn get_member(&self, guild_id: u64, member_id: u64) -> Result<Member, CacheError> {
        let key = MemberKey {
            guild_id,
            member_id,
        };

        self.members
            .get(&key)
            .map(|entry| entry.value().clone())
            .ok_or(CacheError::MemberNotFound {
                guild_id,
                member_id,
            })
    }

    async fn set_member(&self, member: Member) -> Result<(), CacheError> {
        let key = MemberKey {
            guild_id: member.guild_id,
            member_id: member.id,
        };
        self.members.insert(key, member);
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
        let key = MemberKey {
            guild_id,
            member_id,
        };
        let mut entry = self
            .members
            .entry(key)
            .or_insert_with(|| Member::new(member_id, guild_id));
        update(entry.value_mut());
        Ok(entry.value().clone())
    }

    async fn get_guild(&self, guild_id: u64) -> Result<GuildConfig, CacheError> {
        self.guilds
            .get(&guild_id)
            .map(|entry| entry.value().clone())
            .ok_or(CacheError::GuildNotFound(guild_id))
    }

    async fn set_guild(&self, guild: GuildConfig) -> Result<(), CacheError> {
        self.guilds.insert(guild.id, guild);
        Ok(())
    }
}
