//! Individual contacts

use super::errors::ContactResult;
use super::sync::Synchronizer;
use super::types::ContactId;
use crate::core_gateway::session::Session;
use crate::core_gateway::types::{FriendRemark, Message, PreviousNameList, Profile};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// A single remote contact.
///
/// Holds nothing but its id and the session; profile data is fetched on demand.
#[derive(Debug, Clone)]
pub struct Individual {
    id: ContactId,
    session: Session,
    removed: Arc<AtomicBool>,
    synchronizer: Arc<Synchronizer>,
}

/// Construct an [`Individual`]. No fetch is needed; the id alone suffices.
///
/// Must be called from within a Tokio runtime.
pub fn construct_individual(session: &Session, id: ContactId) -> Individual {
    Individual::construct(session.clone(), id)
}

impl Individual {
    /// Construct an individual and subscribe it to `FriendDeleted` events
    pub fn construct(session: Session, id: ContactId) -> Self {
        debug!(contact_id = %id, "Constructing individual");
        let removed = Arc::new(AtomicBool::new(false));
        let synchronizer =
            Synchronizer::spawn_for_individual(id, removed.clone(), session.events().subscribe());
        Self {
            id,
            session,
            removed,
            synchronizer: Arc::new(synchronizer),
        }
    }

    /// The person behind a group membership. Membership changes reach it
    /// through the group's synchronizer, so it runs no task of its own.
    pub(crate) fn delegate(session: Session, id: ContactId) -> Self {
        Self {
            id,
            session,
            removed: Arc::new(AtomicBool::new(false)),
            synchronizer: Arc::new(Synchronizer::idle()),
        }
    }

    pub fn id(&self) -> ContactId {
        self.id
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Whether a background subscription is running for this contact
    pub fn is_synchronizing(&self) -> bool {
        self.synchronizer.is_active()
    }

    /// Whether this contact has removed the account from their friend list
    pub fn friend_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    /// Send a direct message to this contact
    pub async fn send_message(&self, message: impl Into<Message>) -> ContactResult<()> {
        self.session
            .send_direct_message(self.id, message.into())
            .await?;
        Ok(())
    }

    pub async fn query_profile(&self) -> ContactResult<Profile> {
        Ok(self.session.query_profile(self.id).await?)
    }

    pub async fn query_previous_names(&self) -> ContactResult<PreviousNameList> {
        Ok(self.session.query_previous_names(self.id).await?)
    }

    pub async fn query_remark(&self) -> ContactResult<FriendRemark> {
        Ok(self.session.query_remark(self.id).await?)
    }
}

impl fmt::Display for Individual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Individual({})", self.id)
    }
}
