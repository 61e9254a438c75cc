/*
    group_sync.rs - Group lifecycle and membership synchronization

    Drives groups through the public API only: construction against a mock
    gateway, push events on the session bus, refresh and teardown.
*/

use roster_core::core_contact::{construct_group, ContactError, ContactId, GroupId, PermissionLevel};
use roster_core::core_events::{ContactEvent, EventBus};
use roster_core::core_gateway::{RawMember, RpcError, Session};
use roster_core::test_utils::{
    group_info, mock_session, test_session_key, wait_until, MockGateway, TestGroupBuilder,
    DEFAULT_TEST_TIMEOUT,
};
use std::sync::Arc;
use std::time::Duration;

const BOT: u32 = 10;
const GROUP: GroupId = GroupId(3_141_592);

fn joined(id: u32, permission: PermissionLevel) -> ContactEvent {
    ContactEvent::MemberJoined {
        group_id: GROUP,
        member: RawMember::new(id, permission),
    }
}

fn left(id: u32) -> ContactEvent {
    ContactEvent::MemberLeft {
        group_id: GROUP,
        member_id: ContactId(id),
    }
}

async fn setup(members: &[(u32, PermissionLevel)]) -> (Arc<MockGateway>, Session) {
    let gateway = Arc::new(MockGateway::new());
    gateway.set_group_info(GROUP.to_internal_id(), group_info(BOT, members));
    let session = mock_session(BOT, gateway.clone());
    (gateway, session)
}

#[tokio::test]
async fn test_pushed_join_becomes_visible() {
    let (_gateway, session) = setup(&[]).await;
    let group = construct_group(&session, GROUP).await.unwrap();

    session.events().emit(joined(5, PermissionLevel::Member));

    wait_until(DEFAULT_TEST_TIMEOUT, || group.contains_member(ContactId(5)))
        .await
        .unwrap();
    assert_eq!(group.get_member(ContactId(5)).unwrap().group_id(), GROUP);
}

#[tokio::test]
async fn test_join_then_leave_leaves_member_absent() {
    let (_gateway, session) = setup(&[]).await;
    let group = construct_group(&session, GROUP).await.unwrap();

    session.events().emit_many(vec![
        joined(5, PermissionLevel::Member),
        left(5),
        joined(6, PermissionLevel::Member),
    ]);

    wait_until(DEFAULT_TEST_TIMEOUT, || group.contains_member(ContactId(6)))
        .await
        .unwrap();
    assert!(!group.contains_member(ContactId(5)));
    assert!(group.get_member(ContactId(5)).unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_leave_then_join_leaves_member_present() {
    let (_gateway, session) = setup(&[(5, PermissionLevel::Member)]).await;
    let group = construct_group(&session, GROUP).await.unwrap();

    session.events().emit_many(vec![
        left(5),
        joined(5, PermissionLevel::Administrator),
        joined(6, PermissionLevel::Member),
    ]);

    wait_until(DEFAULT_TEST_TIMEOUT, || group.contains_member(ContactId(6)))
        .await
        .unwrap();
    assert_eq!(
        group.get_member(ContactId(5)).unwrap().permission(),
        PermissionLevel::Administrator
    );
}

#[tokio::test]
async fn test_events_for_other_groups_are_skipped() {
    let (_gateway, session) = setup(&[]).await;
    let group = construct_group(&session, GROUP).await.unwrap();

    session.events().emit_many(vec![
        ContactEvent::MemberJoined {
            group_id: GroupId(1),
            member: RawMember::new(7u32, PermissionLevel::Member),
        },
        ContactEvent::FriendDeleted {
            friend_id: ContactId(8),
        },
        joined(9, PermissionLevel::Member),
    ]);

    wait_until(DEFAULT_TEST_TIMEOUT, || group.contains_member(ContactId(9)))
        .await
        .unwrap();
    assert!(!group.contains_member(ContactId(7)));
    assert_eq!(group.member_count(), 2);
}

#[tokio::test]
async fn test_single_owner_survives_hostile_events() {
    let (_gateway, session) = setup(&[(2, PermissionLevel::Administrator)]).await;
    let group = construct_group(&session, GROUP).await.unwrap();

    session.events().emit_many(vec![
        joined(3, PermissionLevel::Owner),
        left(BOT),
        ContactEvent::MemberPermissionChanged {
            group_id: GROUP,
            member_id: ContactId(2),
            permission: PermissionLevel::Owner,
        },
        joined(4, PermissionLevel::Member),
    ]);

    wait_until(DEFAULT_TEST_TIMEOUT, || group.contains_member(ContactId(4)))
        .await
        .unwrap();

    let owners: Vec<ContactId> = group
        .members()
        .iter()
        .filter(|m| m.permission() == PermissionLevel::Owner)
        .map(|m| m.id())
        .collect();
    assert_eq!(owners, vec![ContactId(BOT)]);
    assert_eq!(group.owner().id(), ContactId(BOT));
}

#[tokio::test]
async fn test_member_keys_match_ids_after_churn() {
    let (_gateway, session) = setup(&[(2, PermissionLevel::Member)]).await;
    let group = construct_group(&session, GROUP).await.unwrap();

    let mut events = Vec::new();
    for id in 100..120 {
        events.push(joined(id, PermissionLevel::Member));
        if id % 3 == 0 {
            events.push(left(id));
        }
    }
    events.push(joined(999, PermissionLevel::Member));
    session.events().emit_many(events);

    wait_until(DEFAULT_TEST_TIMEOUT, || group.contains_member(ContactId(999)))
        .await
        .unwrap();
    for (id, member) in group.info().members {
        assert_eq!(id, member.id());
    }
    assert!(!group.contains_member(ContactId(102)));
    assert!(group.contains_member(ContactId(101)));
}

#[tokio::test]
async fn test_event_during_bootstrap_is_not_lost() {
    let (gateway, session) = setup(&[]).await;
    gateway.set_delay(Duration::from_millis(100));

    let constructing = {
        let session = session.clone();
        tokio::spawn(async move { construct_group(&session, GROUP).await })
    };
    wait_until(DEFAULT_TEST_TIMEOUT, || session.events().subscriber_count() == 1)
        .await
        .unwrap();
    session.events().emit(joined(42, PermissionLevel::Member));

    let group = constructing.await.unwrap().unwrap();
    wait_until(DEFAULT_TEST_TIMEOUT, || group.contains_member(ContactId(42)))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_construction_failure_yields_no_group() {
    let gateway = Arc::new(MockGateway::new());
    gateway.fail_with("query_group_info", RpcError::Transport("unreachable".to_string()));
    let session = mock_session(BOT, gateway.clone());

    let err = construct_group(&session, GROUP).await.unwrap_err();

    assert!(matches!(err, ContactError::Construction { group_id: GROUP, .. }));
    assert_eq!(gateway.call_count("query_group_info"), 1);
    assert_eq!(session.events().subscriber_count(), 0);
}

#[tokio::test]
async fn test_unknown_group_fails_construction() {
    let gateway = Arc::new(MockGateway::new());
    let session = mock_session(BOT, gateway);

    let err = construct_group(&session, GroupId(77)).await.unwrap_err();
    assert!(matches!(err, ContactError::Construction { .. }));
}

#[tokio::test]
async fn test_bus_lag_triggers_refresh() {
    let gateway = Arc::new(MockGateway::new());
    gateway.set_group_info(GROUP.to_internal_id(), group_info(BOT, &[]));
    let session = Session::new(ContactId(BOT), test_session_key(), gateway.clone(), EventBus::new(2));
    let group = construct_group(&session, GROUP).await.unwrap();

    gateway.set_group_info(
        GROUP.to_internal_id(),
        TestGroupBuilder::new(BOT).name("after lag").member(55).build(),
    );
    // Flood the bus without yielding so the synchronizer falls behind
    let noise: Vec<ContactEvent> = (0..16)
        .map(|id| ContactEvent::FriendDeleted {
            friend_id: ContactId(id),
        })
        .collect();
    session.events().emit_many(noise);

    wait_until(DEFAULT_TEST_TIMEOUT, || group.contains_member(ContactId(55)))
        .await
        .unwrap();
    assert_eq!(group.name(), "after lag");
    assert_eq!(gateway.call_count("query_group_info"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_close_interrupts_slow_refresh_after_lag() {
    let gateway = Arc::new(MockGateway::new());
    gateway.set_group_info(GROUP.to_internal_id(), group_info(BOT, &[]));
    let session = Session::new(ContactId(BOT), test_session_key(), gateway.clone(), EventBus::new(2))
        .with_rpc_timeout(Duration::from_secs(600));
    let group = construct_group(&session, GROUP).await.unwrap();

    gateway.set_delay(Duration::from_secs(300));
    let noise: Vec<ContactEvent> = (0..16)
        .map(|id| ContactEvent::FriendDeleted {
            friend_id: ContactId(id),
        })
        .collect();
    session.events().emit_many(noise);

    wait_until(DEFAULT_TEST_TIMEOUT, || gateway.call_count("query_group_info") == 2)
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(1), group.close())
        .await
        .expect("close waited on the in-flight refresh");
    assert_eq!(session.events().subscriber_count(), 0);
}

#[tokio::test]
async fn test_close_stops_synchronization() {
    let (_gateway, session) = setup(&[(2, PermissionLevel::Member)]).await;
    let group = construct_group(&session, GROUP).await.unwrap();
    let member = group.get_member(ContactId(2)).unwrap();
    assert_eq!(session.events().subscriber_count(), 1);

    group.close().await;

    assert_eq!(session.events().subscriber_count(), 0);
    assert_eq!(session.events().emit(joined(3, PermissionLevel::Member)), 0);
    assert!(matches!(
        member.group().get_member(ContactId(3)),
        Err(ContactError::GroupClosed { .. })
    ));
}

#[tokio::test]
async fn test_dropping_group_releases_subscription() {
    let (_gateway, session) = setup(&[]).await;
    let group = construct_group(&session, GROUP).await.unwrap();
    drop(group);

    wait_until(DEFAULT_TEST_TIMEOUT, || session.events().subscriber_count() == 0)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_groups_synchronize_independently() {
    let gateway = Arc::new(MockGateway::new());
    let other = GroupId(1234);
    gateway.set_group_info(GROUP.to_internal_id(), group_info(BOT, &[]));
    gateway.set_group_info(other.to_internal_id(), group_info(BOT, &[]));
    let session = mock_session(BOT, gateway);

    let first = construct_group(&session, GROUP).await.unwrap();
    let second = construct_group(&session, other).await.unwrap();

    session.events().emit_many(vec![
        joined(5, PermissionLevel::Member),
        ContactEvent::MemberJoined {
            group_id: other,
            member: RawMember::new(6u32, PermissionLevel::Member),
        },
    ]);

    wait_until(DEFAULT_TEST_TIMEOUT, || {
        first.contains_member(ContactId(5)) && second.contains_member(ContactId(6))
    })
    .await
    .unwrap();
    assert!(!first.contains_member(ContactId(6)));
    assert!(!second.contains_member(ContactId(5)));
}
