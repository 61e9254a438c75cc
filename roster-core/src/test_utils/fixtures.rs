//! Test fixtures for common snapshots and sessions

use crate::core_contact::types::{ContactId, PermissionLevel};
use crate::core_events::EventBus;
use crate::core_gateway::session::Session;
use crate::core_gateway::types::{RawGroupInfo, RawMember, SessionKey};
use crate::test_utils::MockGateway;
use std::sync::Arc;

/// Raw snapshot owned by `owner` with the given additional members.
///
/// The owner is always listed first with [`PermissionLevel::Owner`].
pub fn group_info(owner: u32, members: &[(u32, PermissionLevel)]) -> RawGroupInfo {
    let mut all = Vec::with_capacity(members.len() + 1);
    all.push(RawMember::new(owner, PermissionLevel::Owner));
    all.extend(
        members
            .iter()
            .map(|(id, permission)| RawMember::new(*id, *permission)),
    );

    RawGroupInfo {
        owner: ContactId(owner),
        name: format!("group of {}", owner),
        announcement: String::new(),
        members: all,
    }
}

/// Deterministic session key for tests
pub fn test_session_key() -> SessionKey {
    SessionKey::new((0u8..16).collect())
}

/// Session logged in as `account`, backed by `gateway` and a fresh bus
pub fn mock_session(account: u32, gateway: Arc<MockGateway>) -> Session {
    Session::new(
        ContactId(account),
        test_session_key(),
        gateway,
        EventBus::default(),
    )
}

/// Builder for raw group snapshots
pub struct TestGroupBuilder {
    owner: u32,
    name: String,
    announcement: String,
    members: Vec<(u32, PermissionLevel)>,
}

impl TestGroupBuilder {
    pub fn new(owner: u32) -> Self {
        Self {
            owner,
            name: format!("group of {}", owner),
            announcement: String::new(),
            members: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn announcement(mut self, announcement: impl Into<String>) -> Self {
        self.announcement = announcement.into();
        self
    }

    pub fn admin(mut self, id: u32) -> Self {
        self.members.push((id, PermissionLevel::Administrator));
        self
    }

    pub fn member(mut self, id: u32) -> Self {
        self.members.push((id, PermissionLevel::Member));
        self
    }

    pub fn build(self) -> RawGroupInfo {
        RawGroupInfo {
            name: self.name,
            announcement: self.announcement,
            ..group_info(self.owner, &self.members)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_builder() {
        let info = TestGroupBuilder::new(1)
            .name("Rustaceans")
            .admin(2)
            .member(3)
            .build();

        assert_eq!(info.name, "Rustaceans");
        assert_eq!(info.owner, ContactId(1));
        assert_eq!(info.members.len(), 3);
        assert_eq!(info.members[0], RawMember::new(1u32, PermissionLevel::Owner));
        assert_eq!(info.members[1].permission, PermissionLevel::Administrator);
    }
}
