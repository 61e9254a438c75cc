//! Error types for contact operations

use super::types::{ContactId, GroupId};
use crate::core_gateway::errors::RpcError;
use thiserror::Error;

/// Result type for contact operations
pub type ContactResult<T> = Result<T, ContactError>;

/// Errors surfaced by contact, group and membership operations.
///
/// Permission denials are not errors; they are reported as `Ok(false)`.
#[derive(Error, Debug)]
pub enum ContactError {
    /// The bootstrap fetch failed, so the group never came into existence
    #[error("Cannot obtain group info for id {group_id}: {cause}")]
    Construction {
        group_id: GroupId,
        #[source]
        cause: BootstrapError,
    },

    /// Lookup of an id that is absent from the cached snapshot
    #[error("No such member whose id is {id} in group {group_id}")]
    NotFound { id: ContactId, group_id: GroupId },

    /// The caller passed an argument outside the contract
    #[error("Invalid argument: {0}")]
    Validation(String),

    /// Internal state that should be unreachable
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    /// Transport or protocol failure of a remote command
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// A membership outlived the group it refers to
    #[error("Group {group_id} has been closed")]
    GroupClosed { group_id: GroupId },
}

/// Cause of a failed group construction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BootstrapError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("malformed group info: {0}")]
    Malformed(String),
}

impl ContactError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ContactError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = ContactError::NotFound {
            id: ContactId(12),
            group_id: GroupId(34),
        };
        assert_eq!(err.to_string(), "No such member whose id is 12 in group 34");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_construction_error_keeps_cause() {
        let err = ContactError::Construction {
            group_id: GroupId(5),
            cause: BootstrapError::Rpc(RpcError::Closed),
        };
        assert!(err.to_string().starts_with("Cannot obtain group info for id 5"));
        assert!(err.source().is_some());
    }
}
