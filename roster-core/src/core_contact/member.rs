//! Group memberships
//!
//! A [`Membership`] is an [`Individual`] seen through one group: it forwards
//! every individual capability to its delegate and adds the group-scoped
//! moderation actions.

use super::errors::{ContactError, ContactResult};
use super::group::GroupRef;
use super::individual::Individual;
use super::permission::{evaluate_mute, validate_mute_duration, MuteDecision};
use super::types::{ContactId, GroupId, PermissionLevel};
use crate::core_gateway::session::Session;
use crate::core_gateway::types::{FriendRemark, Message, PreviousNameList, Profile};
use crate::metrics;
use std::fmt;
use tracing::{debug, info};

/// An individual's role-qualified presence within one group
#[derive(Debug, Clone)]
pub struct Membership {
    delegate: Individual,
    group: GroupRef,
    permission: PermissionLevel,
}

impl Membership {
    pub(crate) fn new(delegate: Individual, group: GroupRef, permission: PermissionLevel) -> Self {
        Self {
            delegate,
            group,
            permission,
        }
    }

    pub fn id(&self) -> ContactId {
        self.delegate.id()
    }

    pub fn permission(&self) -> PermissionLevel {
        self.permission
    }

    pub fn group_id(&self) -> GroupId {
        self.group.id()
    }

    /// Non-owning reference to the group this membership belongs to
    pub fn group(&self) -> &GroupRef {
        &self.group
    }

    pub fn as_individual(&self) -> &Individual {
        &self.delegate
    }

    pub fn session(&self) -> &Session {
        self.delegate.session()
    }

    pub(crate) fn with_permission(&self, permission: PermissionLevel) -> Self {
        Self {
            permission,
            ..self.clone()
        }
    }

    pub async fn send_message(&self, message: impl Into<Message>) -> ContactResult<()> {
        self.delegate.send_message(message).await
    }

    pub async fn query_profile(&self) -> ContactResult<Profile> {
        self.delegate.query_profile().await
    }

    pub async fn query_previous_names(&self) -> ContactResult<PreviousNameList> {
        self.delegate.query_previous_names().await
    }

    pub async fn query_remark(&self) -> ContactResult<FriendRemark> {
        self.delegate.query_remark().await
    }

    /// Mute this member for `duration_seconds`.
    ///
    /// Returns `Ok(false)` when the permission hierarchy forbids it, in which
    /// case no remote command is sent. Both the target and the operator (the
    /// logged-in account's own membership) are resolved from the group's
    /// current snapshot, not from this handle.
    pub async fn mute(&self, duration_seconds: i64) -> ContactResult<bool> {
        let duration = validate_mute_duration(duration_seconds)?;

        let group = self.group.upgrade()?;
        let target = group.get_member(self.id())?;
        if target.permission == PermissionLevel::Owner {
            metrics::record_counter(metrics::MUTE_DENIED, 1);
            debug!(member = %target, "Refusing to mute group owner");
            return Ok(false);
        }

        let operator = group.get_member(self.session().account())?;
        if operator.id() == target.id() {
            return Err(ContactError::InvariantViolation(format!(
                "account {} cannot mute itself in group {}",
                operator.id(),
                self.group_id()
            )));
        }

        match evaluate_mute(operator.permission(), target.permission) {
            MuteDecision::Denied(reason) => {
                metrics::record_counter(metrics::MUTE_DENIED, 1);
                debug!(
                    member = %target,
                    operator = %operator.permission(),
                    reason = ?reason,
                    "Mute denied by permission hierarchy"
                );
                Ok(false)
            }
            MuteDecision::Proceed => {
                self.session()
                    .mute(group.internal_id(), target.id(), duration)
                    .await?;
                info!(member = %target, duration_seconds = duration, "Member muted");
                Ok(true)
            }
        }
    }

    /// Lift a mute. The server enforces permissions for this command.
    pub async fn unmute(&self) -> ContactResult<()> {
        let group = self.group.upgrade()?;
        self.session().mute(group.internal_id(), self.id(), 0).await?;
        info!(member = %self, "Member unmuted");
        Ok(())
    }
}

impl PartialEq for Membership {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
            && self.group_id() == other.group_id()
            && self.permission == other.permission
    }
}

impl Eq for Membership {}

impl fmt::Display for Membership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Member(id={}, group={}, permission={})",
            self.id(),
            self.group_id(),
            self.permission
        )
    }
}
