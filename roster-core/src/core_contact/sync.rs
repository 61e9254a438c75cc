//! Background synchronization of cached contact state
//!
//! Each group owns one task that listens on the session's event bus and folds
//! the events for that group into its snapshot. The task only holds a weak
//! reference, so it never keeps a group alive on its own. Individuals get a
//! lighter task that only watches for the account being unfriended.

use super::group::{EventOutcome, GroupState};
use super::types::{ContactId, GroupId};
use crate::core_events::ContactEvent;
use crate::metrics;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Handle to a contact's background synchronization task.
///
/// Dropping the handle aborts the task; [`Synchronizer::shutdown`] stops it
/// gracefully and waits for it.
pub(crate) struct Synchronizer {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Synchronizer {
    /// A synchronizer with nothing to listen to
    pub(crate) fn idle() -> Self {
        Self {
            stop: None,
            task: None,
        }
    }

    /// Spawn the membership task for one group.
    ///
    /// `events` must have been subscribed before the group's snapshot was
    /// fetched.
    pub(crate) fn spawn_for_group(
        state: Weak<GroupState>,
        group_id: GroupId,
        events: broadcast::Receiver<ContactEvent>,
    ) -> Self {
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(run_group_sync(state, group_id, events, stop_rx));
        Self {
            stop: Some(stop_tx),
            task: Some(task),
        }
    }

    /// Spawn the task that flags `removed` once `id` unfriends the account
    pub(crate) fn spawn_for_individual(
        id: ContactId,
        removed: Arc<AtomicBool>,
        events: broadcast::Receiver<ContactEvent>,
    ) -> Self {
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(run_individual_sync(id, removed, events, stop_rx));
        Self {
            stop: Some(stop_tx),
            task: Some(task),
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Signal the task to stop and wait until it has exited
    pub(crate) async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Synchronizer task ended abnormally");
                }
            }
        }
    }
}

impl Drop for Synchronizer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synchronizer")
            .field("active", &self.is_active())
            .finish()
    }
}

async fn run_group_sync(
    state: Weak<GroupState>,
    group_id: GroupId,
    mut events: broadcast::Receiver<ContactEvent>,
    mut stop: oneshot::Receiver<()>,
) {
    debug!(group_id = %group_id, "Group synchronizer started");

    loop {
        let received = tokio::select! {
            biased;
            _ = &mut stop => break,
            received = events.recv() => received,
        };

        match received {
            Ok(event) => {
                if event.group_id() != Some(group_id) {
                    continue;
                }
                let Some(group) = state.upgrade() else { break };
                match group.apply_event(&event) {
                    EventOutcome::Applied => {
                        metrics::record_counter(metrics::SYNC_EVENTS_APPLIED, 1);
                        debug!(group_id = %group_id, event = event.kind(), "Applied group event");
                    }
                    EventOutcome::NoOp => {
                        debug!(group_id = %group_id, event = event.kind(), "Group event changed nothing");
                    }
                    EventOutcome::Rejected(reason) => {
                        metrics::record_counter(metrics::SYNC_EVENTS_IGNORED, 1);
                        warn!(
                            group_id = %group_id,
                            event = ?event,
                            reason,
                            "Ignoring group event"
                        );
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(group_id = %group_id, skipped, "Event bus lagged, refreshing group");
                let Some(group) = state.upgrade() else { break };
                metrics::record_counter(metrics::SYNC_REFRESHES, 1);
                // Stop wins over an in-flight refresh.
                tokio::select! {
                    biased;
                    _ = &mut stop => break,
                    refreshed = group.refresh() => {
                        if let Err(e) = refreshed {
                            warn!(group_id = %group_id, error = %e, "Refresh after lag failed");
                        }
                    }
                }
            }
            Err(broadcast::error::RecvError::Closed) => {
                info!(group_id = %group_id, "Event bus closed, stopping synchronizer");
                break;
            }
        }
    }

    debug!(group_id = %group_id, "Group synchronizer stopped");
}

async fn run_individual_sync(
    id: ContactId,
    removed: Arc<AtomicBool>,
    mut events: broadcast::Receiver<ContactEvent>,
    mut stop: oneshot::Receiver<()>,
) {
    debug!(contact_id = %id, "Individual synchronizer started");

    loop {
        let received = tokio::select! {
            biased;
            _ = &mut stop => break,
            received = events.recv() => received,
        };

        match received {
            Ok(ContactEvent::FriendDeleted { friend_id }) if friend_id == id => {
                removed.store(true, Ordering::Release);
                metrics::record_counter(metrics::SYNC_EVENTS_APPLIED, 1);
                info!(contact_id = %id, "Removed from friend's contact list");
            }
            Ok(_) => {}
            // Deletions cannot be refetched from the server.
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(contact_id = %id, skipped, "Event bus lagged for individual");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }

    debug!(contact_id = %id, "Individual synchronizer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_idle_synchronizer_is_inactive() {
        let sync = Synchronizer::idle();
        assert!(!sync.is_active());
        sync.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_task_without_group() {
        let (tx, rx) = broadcast::channel(8);
        let sync = Synchronizer::spawn_for_group(Weak::new(), GroupId(1), rx);
        assert!(sync.is_active());

        sync.shutdown().await;
        assert_eq!(tx.receiver_count(), 0);
    }

    #[tokio::test]
    async fn test_task_exits_when_bus_closes() {
        let (tx, rx) = broadcast::channel::<ContactEvent>(8);
        let sync = Synchronizer::spawn_for_group(Weak::new(), GroupId(1), rx);
        drop(tx);

        crate::test_utils::wait_until(std::time::Duration::from_secs(1), || !sync.is_active())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_drop_aborts_task() {
        let (tx, rx) = broadcast::channel::<ContactEvent>(8);
        let sync = Synchronizer::spawn_for_group(Weak::new(), GroupId(1), rx);
        drop(sync);

        crate::test_utils::wait_until(std::time::Duration::from_secs(1), || tx.receiver_count() == 0)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_individual_task_flags_own_deletion_only() {
        let (tx, rx) = broadcast::channel(8);
        let removed = Arc::new(AtomicBool::new(false));
        let sync = Synchronizer::spawn_for_individual(ContactId(5), removed.clone(), rx);

        tx.send(ContactEvent::FriendDeleted { friend_id: ContactId(6) }).unwrap();
        tx.send(ContactEvent::FriendDeleted { friend_id: ContactId(5) }).unwrap();
        crate::test_utils::wait_until(std::time::Duration::from_secs(1), || {
            removed.load(Ordering::Acquire)
        })
        .await
        .unwrap();

        sync.shutdown().await;
        assert_eq!(tx.receiver_count(), 0);
    }
}
