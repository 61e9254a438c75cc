//! Groups
//!
//! A [`Group`] only exists once its initial snapshot has been fetched. The
//! fetch result goes through a private [`GroupBootstrap`] and is converted into
//! a live group in one step, which also starts the membership synchronizer.
//!
//! The snapshot is guarded by a `RwLock` that is held for exactly one read or
//! one mutation and never across an `.await`.

use super::errors::{BootstrapError, ContactError, ContactResult};
use super::individual::Individual;
use super::member::Membership;
use super::sync::Synchronizer;
use super::types::{ContactId, GroupId, InternalGroupId, PermissionLevel};
use crate::core_events::ContactEvent;
use crate::core_gateway::errors::RpcError;
use crate::core_gateway::session::Session;
use crate::core_gateway::types::{Message, QuitResponse, RawGroupInfo, RawMember};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Cached snapshot of a group's server-side state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    pub owner: Membership,
    pub name: String,
    pub announcement: String,
    pub members: HashMap<ContactId, Membership>,
}

impl GroupInfo {
    pub fn member(&self, id: ContactId) -> Option<&Membership> {
        self.members.get(&id)
    }
}

/// Result of applying one push event to a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The snapshot changed
    Applied,
    /// Nothing to do, e.g. a leave for a member that is already gone
    NoOp,
    /// The event would break the single-owner invariant and was dropped
    Rejected(&'static str),
}

/// Shared state behind a live group
pub(crate) struct GroupState {
    id: GroupId,
    internal_id: InternalGroupId,
    session: Session,
    info: RwLock<GroupInfo>,
}

impl GroupState {
    pub(crate) fn id(&self) -> GroupId {
        self.id
    }

    pub(crate) fn internal_id(&self) -> InternalGroupId {
        self.internal_id
    }

    fn read_info(&self) -> RwLockReadGuard<'_, GroupInfo> {
        self.info.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_info(&self) -> RwLockWriteGuard<'_, GroupInfo> {
        self.info.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn group_ref(self: &Arc<Self>) -> GroupRef {
        GroupRef {
            id: self.id,
            state: Arc::downgrade(self),
        }
    }

    pub(crate) fn get_member(&self, id: ContactId) -> ContactResult<Membership> {
        self.read_info()
            .members
            .get(&id)
            .cloned()
            .ok_or(ContactError::NotFound {
                id,
                group_id: self.id,
            })
    }

    /// Fetch a fresh snapshot and replace the cached one wholesale
    pub(crate) async fn refresh(self: &Arc<Self>) -> ContactResult<GroupInfo> {
        let raw = self.session.query_group_info(self.internal_id).await?;
        let parsed = ParsedGroupInfo::parse(raw)
            .map_err(|reason| ContactError::Rpc(RpcError::Malformed(reason)))?;
        let snapshot = parsed.materialize(&self.group_ref(), &self.session);

        *self.write_info() = snapshot.clone();
        debug!(group_id = %self.id, members = snapshot.members.len(), "Group snapshot refreshed");
        Ok(snapshot)
    }

    /// Apply one push event under the write lock
    pub(crate) fn apply_event(self: &Arc<Self>, event: &ContactEvent) -> EventOutcome {
        let group_ref = self.group_ref();
        let mut info = self.write_info();
        let owner_id = info.owner.id();

        match event {
            ContactEvent::MemberJoined { member, .. } => {
                if member.id == owner_id {
                    return if member.permission == PermissionLevel::Owner {
                        EventOutcome::NoOp
                    } else {
                        EventOutcome::Rejected("join would demote the owner")
                    };
                }
                if member.permission == PermissionLevel::Owner {
                    return EventOutcome::Rejected("join claims a second owner");
                }
                let membership = Membership::new(
                    Individual::delegate(self.session.clone(), member.id),
                    group_ref,
                    member.permission,
                );
                info.members.insert(member.id, membership);
                EventOutcome::Applied
            }
            ContactEvent::MemberLeft { member_id, .. } => {
                if *member_id == owner_id {
                    return EventOutcome::Rejected("owner cannot leave");
                }
                match info.members.remove(member_id) {
                    Some(_) => EventOutcome::Applied,
                    None => EventOutcome::NoOp,
                }
            }
            ContactEvent::MemberPermissionChanged {
                member_id,
                permission,
                ..
            } => {
                if *member_id == owner_id || *permission == PermissionLevel::Owner {
                    return EventOutcome::Rejected("ownership changes only through refresh");
                }
                match info.members.get(member_id) {
                    Some(existing) if existing.permission() == *permission => EventOutcome::NoOp,
                    Some(existing) => {
                        let updated = existing.with_permission(*permission);
                        info.members.insert(*member_id, updated);
                        EventOutcome::Applied
                    }
                    None => EventOutcome::NoOp,
                }
            }
            ContactEvent::FriendDeleted { .. } => EventOutcome::NoOp,
        }
    }
}

/// Non-owning, lookup-only reference to a group
#[derive(Debug, Clone)]
pub struct GroupRef {
    id: GroupId,
    state: Weak<GroupState>,
}

impl GroupRef {
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Whether the referenced group is still alive
    pub fn is_live(&self) -> bool {
        self.state.strong_count() > 0
    }

    pub(crate) fn upgrade(&self) -> ContactResult<Arc<GroupState>> {
        self.state
            .upgrade()
            .ok_or(ContactError::GroupClosed { group_id: self.id })
    }

    /// Look up a member in the referenced group's current snapshot
    pub fn get_member(&self, id: ContactId) -> ContactResult<Membership> {
        self.upgrade()?.get_member(id)
    }
}

/// Validated, not yet materialized snapshot
#[derive(Debug, Clone)]
struct ParsedGroupInfo {
    owner: ContactId,
    name: String,
    announcement: String,
    members: Vec<RawMember>,
}

impl ParsedGroupInfo {
    /// Check the raw server answer: unique member ids and exactly one owner,
    /// matching the declared owner.
    fn parse(raw: RawGroupInfo) -> Result<Self, String> {
        let mut seen = HashSet::with_capacity(raw.members.len());
        if let Some(duplicate) = raw.members.iter().find(|m| !seen.insert(m.id)) {
            return Err(format!("duplicate member {}", duplicate.id));
        }

        let owners: Vec<ContactId> = raw
            .members
            .iter()
            .filter(|m| m.permission == PermissionLevel::Owner)
            .map(|m| m.id)
            .collect();
        match owners.as_slice() {
            [owner] if *owner == raw.owner => {}
            [owner] => {
                return Err(format!(
                    "declared owner {} but member {} holds ownership",
                    raw.owner, owner
                ))
            }
            [] => return Err(format!("owner {} missing from member list", raw.owner)),
            _ => return Err(format!("{} members claim ownership", owners.len())),
        }

        Ok(Self {
            owner: raw.owner,
            name: raw.name,
            announcement: raw.announcement,
            members: raw.members,
        })
    }

    fn materialize(self, group: &GroupRef, session: &Session) -> GroupInfo {
        let members: HashMap<ContactId, Membership> = self
            .members
            .into_iter()
            .map(|m| {
                let membership = Membership::new(
                    Individual::delegate(session.clone(), m.id),
                    group.clone(),
                    m.permission,
                );
                (m.id, membership)
            })
            .collect();

        let owner = Membership::new(
            Individual::delegate(session.clone(), self.owner),
            group.clone(),
            PermissionLevel::Owner,
        );

        GroupInfo {
            owner,
            name: self.name,
            announcement: self.announcement,
            members,
        }
    }
}

/// A group whose snapshot has been fetched but which is not yet live.
///
/// Only [`GroupBootstrap::into_ready`] turns it into a [`Group`], so a group
/// without a snapshot cannot be observed.
struct GroupBootstrap {
    id: GroupId,
    internal_id: InternalGroupId,
    session: Session,
    info: ParsedGroupInfo,
    events: broadcast::Receiver<ContactEvent>,
}

impl GroupBootstrap {
    fn into_ready(self) -> Group {
        let GroupBootstrap {
            id,
            internal_id,
            session,
            info,
            events,
        } = self;

        let state = Arc::new_cyclic(|weak: &Weak<GroupState>| {
            let group_ref = GroupRef {
                id,
                state: weak.clone(),
            };
            let snapshot = info.materialize(&group_ref, &session);
            GroupState {
                id,
                internal_id,
                session: session.clone(),
                info: RwLock::new(snapshot),
            }
        });

        let synchronizer = Synchronizer::spawn_for_group(Arc::downgrade(&state), id, events);
        Group {
            state,
            synchronizer,
        }
    }
}

/// Construct a [`Group`] by fetching its snapshot through `session`
pub async fn construct_group(session: &Session, group_id: GroupId) -> ContactResult<Group> {
    Group::construct(session.clone(), group_id).await
}

/// A live group with a synchronized member list
#[derive(Debug)]
pub struct Group {
    state: Arc<GroupState>,
    synchronizer: Synchronizer,
}

impl Group {
    /// Fetch the group's snapshot and start synchronizing it.
    ///
    /// Performs exactly one `QueryGroupInfo` call and never retries. The bus
    /// subscription is taken before the fetch so events pushed while the
    /// fetch is in flight are applied once the group is live.
    pub async fn construct(session: Session, group_id: GroupId) -> ContactResult<Group> {
        let internal_id = group_id.to_internal_id();
        let events = session.events().subscribe();

        let raw = session
            .query_group_info(internal_id)
            .await
            .map_err(|e| {
                error!(group_id = %group_id, error = %e, "Cannot obtain group info");
                ContactError::Construction {
                    group_id,
                    cause: BootstrapError::Rpc(e),
                }
            })?;

        let info = ParsedGroupInfo::parse(raw).map_err(|reason| {
            error!(group_id = %group_id, reason = %reason, "Rejecting malformed group info");
            ContactError::Construction {
                group_id,
                cause: BootstrapError::Malformed(reason),
            }
        })?;

        let group = GroupBootstrap {
            id: group_id,
            internal_id,
            session,
            info,
            events,
        }
        .into_ready();

        info!(
            group_id = %group_id,
            internal_id = %internal_id,
            members = group.member_count(),
            "Group ready"
        );
        Ok(group)
    }

    pub fn id(&self) -> GroupId {
        self.state.id
    }

    pub fn internal_id(&self) -> InternalGroupId {
        self.state.internal_id
    }

    pub fn session(&self) -> &Session {
        &self.state.session
    }

    /// Non-owning handle to this group
    pub fn group_ref(&self) -> GroupRef {
        self.state.group_ref()
    }

    pub fn owner(&self) -> Membership {
        self.state.read_info().owner.clone()
    }

    pub fn name(&self) -> String {
        self.state.read_info().name.clone()
    }

    pub fn announcement(&self) -> String {
        self.state.read_info().announcement.clone()
    }

    /// Copy of the whole cached snapshot
    pub fn info(&self) -> GroupInfo {
        self.state.read_info().clone()
    }

    /// Consistent copy of the member list, ordered by id
    pub fn members(&self) -> Vec<Membership> {
        let mut members: Vec<Membership> =
            self.state.read_info().members.values().cloned().collect();
        members.sort_by_key(Membership::id);
        members
    }

    pub fn member_count(&self) -> usize {
        self.state.read_info().members.len()
    }

    pub fn contains_member(&self, id: ContactId) -> bool {
        self.state.read_info().members.contains_key(&id)
    }

    /// Look up a member in the cached snapshot. Never touches the network.
    pub fn get_member(&self, id: ContactId) -> ContactResult<Membership> {
        self.state.get_member(id)
    }

    /// Apply a push event directly, bypassing the bus
    pub fn apply_event(&self, event: &ContactEvent) -> EventOutcome {
        self.state.apply_event(event)
    }

    pub async fn send_message(&self, message: impl Into<Message>) -> ContactResult<()> {
        self.state
            .session
            .send_group_message(self.state.internal_id, message.into())
            .await?;
        Ok(())
    }

    /// Re-fetch the snapshot from the server and replace the cached one
    pub async fn refresh(&self) -> ContactResult<GroupInfo> {
        self.state.refresh().await
    }

    /// Leave the group on the server
    pub async fn quit(&self) -> ContactResult<QuitResponse> {
        let response = self.state.session.quit_group(self.state.internal_id).await?;
        info!(group_id = %self.id(), response = ?response, "Quit group");
        Ok(response)
    }

    /// Whether the membership synchronizer is still running
    pub fn is_synchronizing(&self) -> bool {
        self.synchronizer.is_active()
    }

    /// Stop the synchronizer and wait for it. No snapshot mutation from push
    /// events happens after this returns.
    pub async fn close(self) {
        let Group {
            state,
            synchronizer,
        } = self;
        synchronizer.shutdown().await;
        debug!(group_id = %state.id, "Group closed");
    }
}

impl fmt::Debug for GroupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupState")
            .field("id", &self.id)
            .field("internal_id", &self.internal_id)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Group({})", self.id())
    }
}
