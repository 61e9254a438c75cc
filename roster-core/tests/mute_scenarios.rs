/*
    mute_scenarios.rs - Permission-gated moderation end to end

    One group {owner, A: administrator, B: member}, observed from each
    operator's own session.
*/

use roster_core::core_contact::{construct_group, ContactError, ContactId, Group, GroupId, PermissionLevel};
use roster_core::test_utils::{mock_session, MockGateway, TestGroupBuilder};
use std::sync::Arc;

const OWNER: u32 = 1;
const ADMIN: u32 = 2;
const MEMBER: u32 = 3;
const GROUP: GroupId = GroupId(12_345_678);

async fn group_seen_by(operator: u32) -> (Arc<MockGateway>, Group) {
    let gateway = Arc::new(MockGateway::new());
    gateway.set_group_info(
        GROUP.to_internal_id(),
        TestGroupBuilder::new(OWNER).admin(ADMIN).member(MEMBER).build(),
    );
    let group = construct_group(&mock_session(operator, gateway.clone()), GROUP)
        .await
        .unwrap();
    (gateway, group)
}

#[tokio::test]
async fn test_owner_mutes_administrator() {
    let (gateway, group) = group_seen_by(OWNER).await;

    let admin = group.get_member(ContactId(ADMIN)).unwrap();
    assert!(admin.mute(60).await.unwrap());
    assert_eq!(
        gateway.mute_calls(),
        vec![(GROUP.to_internal_id(), ContactId(ADMIN), 60)]
    );
}

#[tokio::test]
async fn test_administrator_cannot_mute_owner() {
    let (gateway, group) = group_seen_by(ADMIN).await;

    assert!(!group.owner().mute(60).await.unwrap());
    assert!(gateway.mute_calls().is_empty());
}

#[tokio::test]
async fn test_administrator_mutes_member() {
    let (gateway, group) = group_seen_by(ADMIN).await;

    let member = group.get_member(ContactId(MEMBER)).unwrap();
    assert!(member.mute(60).await.unwrap());
    assert_eq!(gateway.mute_calls().len(), 1);
}

#[tokio::test]
async fn test_member_operator_never_sends() {
    let (gateway, group) = group_seen_by(MEMBER).await;

    for target in [ADMIN, OWNER] {
        let target = group.get_member(ContactId(target)).unwrap();
        assert!(!target.mute(60).await.unwrap());
    }
    assert!(gateway.mute_calls().is_empty());
}

#[tokio::test]
async fn test_duration_bounds() {
    let (gateway, group) = group_seen_by(OWNER).await;
    let member = group.get_member(ContactId(MEMBER)).unwrap();

    for bad in [0, -1, 2_592_001] {
        assert!(matches!(
            member.mute(bad).await,
            Err(ContactError::Validation(_))
        ));
    }
    assert!(gateway.mute_calls().is_empty());

    assert!(member.mute(2_592_000).await.unwrap());
    assert!(member.mute(1).await.unwrap());
}

#[tokio::test]
async fn test_denial_follows_promotion() {
    use roster_core::core_events::ContactEvent;
    use roster_core::test_utils::{wait_until, DEFAULT_TEST_TIMEOUT};

    let (gateway, group) = group_seen_by(ADMIN).await;
    group.session().events().emit(ContactEvent::MemberPermissionChanged {
        group_id: GROUP,
        member_id: ContactId(MEMBER),
        permission: PermissionLevel::Administrator,
    });

    wait_until(DEFAULT_TEST_TIMEOUT, || {
        group
            .get_member(ContactId(MEMBER))
            .map(|m| m.permission() == PermissionLevel::Administrator)
            .unwrap_or(false)
    })
    .await
    .unwrap();

    let promoted = group.get_member(ContactId(MEMBER)).unwrap();
    assert!(!promoted.mute(60).await.unwrap());
    assert!(gateway.mute_calls().is_empty());
}
