// Effective moderation permissions the bot holds in a guild.
//
// Bit values match Discord's permission flags so the adapter can pass
// `Permissions::bits()` through. Bits not modelled here are dropped.

use super::ports::{ChatClient, ClientError};
use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct PermissionSet: u64 {
        const KICK_MEMBERS = 1 << 1;
        const BAN_MEMBERS = 1 << 2;
        const ADMINISTRATOR = 1 << 3;
    }
}

impl PermissionSet {
    pub const NONE: PermissionSet = PermissionSet::empty();

    /// Whether `flag` is granted, directly or through `ADMINISTRATOR`.
    pub fn allows(self, flag: PermissionSet) -> bool {
        self.contains(Self::ADMINISTRATOR) || self.contains(flag)
    }

    pub fn can_kick(self) -> bool {
        self.allows(Self::KICK_MEMBERS)
    }

    pub fn can_ban(self) -> bool {
        self.allows(Self::BAN_MEMBERS)
    }
}

/// Union of every role permission `member_id` holds in `guild_id`.
///
/// Not cached: roles can change between two messages.
pub async fn effective_permissions<C: ChatClient + ?Sized>(
    client: &C,
    guild_id: u64,
    member_id: u64,
) -> Result<PermissionSet, ClientError> {
    let roles = client.fetch_member_roles(guild_id, member_id).await?;

    Ok(roles
        .iter()
        .fold(PermissionSet::NONE, |acc, role| acc | role.permissions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::test_support::{MockChatClient, BOT_ID, GUILD_ID};

    #[test]
    fn test_administrator_implies_kick_and_ban() {
        let admin = PermissionSet::ADMINISTRATOR;
        assert!(admin.can_kick());
        assert!(admin.can_ban());
        assert!(!PermissionSet::NONE.can_kick());
    }

    #[test]
    fn test_unknown_platform_bits_are_dropped() {
        // MANAGE_CHANNELS | KICK_MEMBERS
        let perms = PermissionSet::from_bits_truncate((1 << 4) | (1 << 1));
        assert_eq!(perms, PermissionSet::KICK_MEMBERS);
    }

    #[tokio::test]
    async fn test_permissions_are_union_of_roles() {
        let client = MockChatClient::new();
        client.set_roles(
            BOT_ID,
            vec![
                ("kickers", PermissionSet::KICK_MEMBERS),
                ("banners", PermissionSet::BAN_MEMBERS),
            ],
        );

        let perms = effective_permissions(&client, GUILD_ID, BOT_ID).await.unwrap();

        assert!(perms.can_kick());
        assert!(perms.can_ban());
        assert!(!perms.contains(PermissionSet::ADMINISTRATOR));
    }

    #[tokio::test]
    async fn test_permissions_recomputed_each_call() {
        let client = MockChatClient::new();
        client.set_roles(BOT_ID, vec![("kickers", PermissionSet::KICK_MEMBERS)]);
        let first = effective_permissions(&client, GUILD_ID, BOT_ID).await.unwrap();

        client.set_roles(BOT_ID, vec![]);
        let second = effective_permissions(&client, GUILD_ID, BOT_ID).await.unwrap();

        assert!(first.can_kick());
        assert_eq!(second, PermissionSet::NONE);
    }
}
