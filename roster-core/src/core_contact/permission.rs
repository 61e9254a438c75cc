//! Permission hierarchy for group moderation
//!
//! The decision itself is a pure function of the two roles involved, so it can
//! be evaluated against a cached snapshot before any remote command is sent.

use super::errors::{ContactError, ContactResult};
use super::types::PermissionLevel;

/// Longest mute the server accepts (30 days)
pub const MAX_MUTE_SECONDS: i64 = 30 * 24 * 3600;

/// Outcome of a mute permission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteDecision {
    /// Send the mute command
    Proceed,
    /// Expected refusal, reported to the caller as `false`
    Denied(DenyReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Owners can never be muted
    TargetIsOwner,
    /// Ordinary members cannot mute anyone
    OperatorIsMember,
    /// Administrators cannot mute each other
    PeerAdministrator,
}

/// Decide whether `operator` may mute `target`
pub fn evaluate_mute(operator: PermissionLevel, target: PermissionLevel) -> MuteDecision {
    use PermissionLevel::*;

    match (operator, target) {
        (_, Owner) => MuteDecision::Denied(DenyReason::TargetIsOwner),
        (Member, _) => MuteDecision::Denied(DenyReason::OperatorIsMember),
        (Administrator, Administrator) => MuteDecision::Denied(DenyReason::PeerAdministrator),
        (Administrator, Member) | (Owner, Member) | (Owner, Administrator) => {
            MuteDecision::Proceed
        }
    }
}

/// Check a requested mute duration and convert it to the wire type
pub fn validate_mute_duration(duration_seconds: i64) -> ContactResult<u32> {
    if duration_seconds <= 0 {
        return Err(ContactError::Validation(
            "duration must be greater than 0 second".to_string(),
        ));
    }
    if duration_seconds > MAX_MUTE_SECONDS {
        return Err(ContactError::Validation(
            "duration must be no more than 30 days".to_string(),
        ));
    }
    u32::try_from(duration_seconds)
        .map_err(|_| ContactError::Validation(format!("duration out of range: {duration_seconds}")))
}
