//! Contact events pushed by the server

use crate::core_contact::types::{ContactId, GroupId, PermissionLevel};
use crate::core_gateway::types::RawMember;
use serde::{Deserialize, Serialize};

/// Push notification about a contact or group
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactEvent {
    /// A member joined the group (or was re-announced)
    MemberJoined { group_id: GroupId, member: RawMember },

    /// A member left or was removed from the group
    MemberLeft {
        group_id: GroupId,
        member_id: ContactId,
    },

    /// A member was promoted or demoted
    MemberPermissionChanged {
        group_id: GroupId,
        member_id: ContactId,
        permission: PermissionLevel,
    },

    /// The account was removed from a friend's list
    FriendDeleted { friend_id: ContactId },
}

impl ContactEvent {
    /// Get the group this event is scoped to (if any)
    pub fn group_id(&self) -> Option<GroupId> {
        match self {
            ContactEvent::MemberJoined { group_id, .. } => Some(*group_id),
            ContactEvent::MemberLeft { group_id, .. } => Some(*group_id),
            ContactEvent::MemberPermissionChanged { group_id, .. } => Some(*group_id),
            ContactEvent::FriendDeleted { .. } => None,
        }
    }

    /// Short name for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ContactEvent::MemberJoined { .. } => "member_joined",
            ContactEvent::MemberLeft { .. } => "member_left",
            ContactEvent::MemberPermissionChanged { .. } => "member_permission_changed",
            ContactEvent::FriendDeleted { .. } => "friend_deleted",
        }
    }
}
