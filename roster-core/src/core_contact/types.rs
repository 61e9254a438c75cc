//! Identifier and permission types shared by every contact kind

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric identifier of a single remote contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContactId(pub u32);

/// The logged-in account is itself an individual contact
pub type AccountId = ContactId;

impl ContactId {
    pub fn new(value: u32) -> Self {
        ContactId(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ContactId {
    fn from(value: u32) -> Self {
        ContactId(value)
    }
}

/// Public identifier of a group, as shown to users
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub u32);

/// Server-side identifier of a group, required by every group-scoped call
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InternalGroupId(pub u32);

/// Ids below this bound are identical in both numbering schemes
const UNBANDED_LIMIT: u64 = 1_000_000;

/// Offset bands used by the server to derive internal ids.
///
/// Each entry is `(first, last, increment, right_digits)`: a group id whose
/// value divided by one million lies in `first..=last` gets
/// `increment * 10^right_digits` added to it.
const OFFSET_BANDS: [(u64, u64, u64, u32); 7] = [
    (1, 10, 202, 6),
    (11, 19, 469, 6),
    (20, 66, 208, 7),
    (67, 156, 1943, 6),
    (157, 209, 199, 7),
    (210, 309, 389, 7),
    (310, 499, 349, 7),
];

impl GroupId {
    pub fn new(value: u32) -> Self {
        GroupId(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// Derive the internal id the server uses for this group.
    ///
    /// Ids outside every offset band are passed through unchanged.
    pub fn to_internal_id(&self) -> InternalGroupId {
        let value = u64::from(self.0);
        if value <= UNBANDED_LIMIT {
            return InternalGroupId(self.0);
        }

        let leading = value / UNBANDED_LIMIT;
        OFFSET_BANDS
            .iter()
            .find(|(first, last, _, _)| (*first..=*last).contains(&leading))
            .and_then(|(_, _, increment, right)| {
                u32::try_from(value + increment * 10u64.pow(*right)).ok()
            })
            .map(InternalGroupId)
            .unwrap_or(InternalGroupId(self.0))
    }
}

impl InternalGroupId {
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Recover the public group id from an internal id
    pub fn to_group_id(&self) -> GroupId {
        let value = u64::from(self.0);
        if value <= UNBANDED_LIMIT {
            return GroupId(self.0);
        }

        let leading = value / UNBANDED_LIMIT;
        OFFSET_BANDS
            .iter()
            .find_map(|(first, last, increment, right)| {
                let offset = increment * 10u64.pow(*right);
                let low = (first * UNBANDED_LIMIT + offset) / UNBANDED_LIMIT;
                let high = ((last + 1) * UNBANDED_LIMIT - 1 + offset) / UNBANDED_LIMIT;
                (low..=high).contains(&leading).then(|| value - offset)
            })
            .and_then(|original| u32::try_from(original).ok())
            .map(GroupId)
            .unwrap_or(GroupId(self.0))
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for InternalGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for GroupId {
    fn from(value: u32) -> Self {
        GroupId(value)
    }
}

/// Role of a member inside one group, ordered by privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PermissionLevel {
    /// Default role
    Member,
    /// Can mute ordinary members
    Administrator,
    /// Full control, exactly one per group
    Owner,
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PermissionLevel::Member => "MEMBER",
            PermissionLevel::Administrator => "ADMINISTRATOR",
            PermissionLevel::Owner => "OWNER",
        };
        f.write_str(name)
    }
}
