//! Synchronizer wired to the in-memory adapters
//!
//! Covers the interleavings between store calls and auth events that the
//! gated repository makes reproducible.

use std::sync::Arc;
use std::time::Duration;

use accountsync_core::{AuthFlow, ProfileSynchronizer, SyncError, SyncState, SyncView};
use accountsync_domain::constants::{
    MIN_PASSWORD_LENGTH, MSG_LOGIN_SUCCESS, MSG_PROFILE_LOAD_FAILED, MSG_SIGNUP_SUCCESS,
};
use accountsync_domain::{AuthEvent, Identity, ProfileField, ProfileRecord, StoreError, UserId};
use accountsync_infra::memory::{MemoryProfileRepository, MemorySessionOracle, RepositoryCall};
use tokio::sync::watch;

fn u1() -> Identity {
    Identity::new("U1", Some("u1@x.com".into()))
}

fn wire(
    oracle: &Arc<MemorySessionOracle>,
    repo: &Arc<MemoryProfileRepository>,
) -> Arc<ProfileSynchronizer> {
    Arc::new(ProfileSynchronizer::new(oracle.clone(), repo.clone()))
}

async fn wait_for(
    rx: &mut watch::Receiver<SyncView>,
    predicate: impl FnMut(&SyncView) -> bool,
) -> SyncView {
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for state")
        .expect("synchronizer dropped")
        .clone()
}

async fn wait_for_calls(repo: &MemoryProfileRepository, call: RepositoryCall, count: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while repo.calls(call) < count {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("timed out waiting for repository call");
}

fn snapshot_value(sync: &ProfileSynchronizer, field: ProfileField) -> Option<String> {
    sync.state().snapshot().map(|snapshot| snapshot.get(field))
}

#[tokio::test]
async fn sign_out_during_save_is_not_readopted() {
    let oracle = Arc::new(MemorySessionOracle::signed_in(u1()));
    let repo = Arc::new(MemoryProfileRepository::new());
    let sync = wire(&oracle, &repo);
    let mut view = sync.subscribe();

    sync.mount().await.expect("mounted");
    sync.edit("location", "Lagos").expect("edit");

    let gate = repo.hold(RepositoryCall::Upsert);
    let save = tokio::spawn({
        let sync = sync.clone();
        async move { sync.save().await }
    });
    wait_for_calls(&repo, RepositoryCall::Upsert, 1).await;

    oracle.switch_to(None);
    wait_for(&mut view, |v| v.state == SyncState::Idle).await;

    gate.release();
    let result = save.await.expect("save task");

    assert_eq!(result.unwrap_err(), SyncError::Stale);
    assert_eq!(sync.state(), SyncState::Idle);
    assert!(sync.view().notice.is_none());
}

#[tokio::test]
async fn rapid_second_save_is_rejected_and_later_edit_survives() {
    let oracle = Arc::new(MemorySessionOracle::signed_in(u1()));
    let repo = Arc::new(MemoryProfileRepository::new());
    let sync = wire(&oracle, &repo);

    sync.mount().await.expect("mounted");
    sync.edit("full_name", "A").expect("edit A");

    let gate = repo.hold(RepositoryCall::Upsert);
    let first = tokio::spawn({
        let sync = sync.clone();
        async move { sync.save().await }
    });
    wait_for_calls(&repo, RepositoryCall::Upsert, 1).await;

    sync.edit("full_name", "B").expect("edit B while saving");
    assert_eq!(sync.save().await.unwrap_err(), SyncError::Busy);

    gate.release();
    first.await.expect("save task").expect("first save");

    let stored = repo.row(&UserId::new("U1")).expect("row");
    assert_eq!(stored.full_name.as_deref(), Some("A"));
    assert_eq!(repo.calls(RepositoryCall::Upsert), 1);

    let SyncState::Ready(snapshot) = sync.state() else { panic!("expected Ready") };
    assert!(snapshot.is_dirty());
    assert_eq!(snapshot.get(ProfileField::FullName), "B");

    sync.save().await.expect("second save");
    let stored = repo.row(&UserId::new("U1")).expect("row");
    assert_eq!(stored.full_name.as_deref(), Some("B"));
}

#[tokio::test]
async fn concurrent_loads_create_a_single_row() {
    let oracle = Arc::new(MemorySessionOracle::signed_in(u1()));
    let repo = Arc::new(MemoryProfileRepository::new());
    let sync = wire(&oracle, &repo);

    let (mounted, reloaded) = tokio::join!(sync.mount(), sync.load());

    mounted.expect("mount");
    reloaded.expect("load");
    assert_eq!(repo.calls(RepositoryCall::Create), 1);
    assert_eq!(repo.len(), 1);
}

#[tokio::test]
async fn separate_synchronizers_resolve_create_conflict() {
    let oracle = Arc::new(MemorySessionOracle::signed_in(u1()));
    let repo = Arc::new(MemoryProfileRepository::new());
    let first = wire(&oracle, &repo);
    let second = wire(&oracle, &repo);

    let gate = repo.hold(RepositoryCall::Create);
    let (a, b, ()) = tokio::join!(first.mount(), second.mount(), async {
        wait_for_calls(&repo, RepositoryCall::Create, 2).await;
        gate.release();
    });

    a.expect("first mount");
    b.expect("second mount");
    assert_eq!(repo.len(), 1);
    assert_eq!(repo.calls(RepositoryCall::Create), 2);
    assert_eq!(first.state().snapshot(), second.state().snapshot());
}

#[tokio::test]
async fn saved_profile_round_trips_through_a_fresh_fetch() {
    let oracle = Arc::new(MemorySessionOracle::signed_in(u1()));
    let repo = Arc::new(MemoryProfileRepository::new());
    let sync = wire(&oracle, &repo);
    sync.mount().await.expect("mounted");

    for (field, value) in [
        ("full_name", "Ada Obi"),
        ("gender", "female"),
        ("date_of_birth", "1990-04-12"),
        ("location", "Lagos"),
        ("mobile", "+2348000000000"),
        ("alternate_mobile", "+2348111111111"),
        ("hint_name", "Ada"),
    ] {
        sync.edit(field, value).expect("edit");
    }
    let saved = sync.save().await.expect("saved");
    sync.unmount();

    let fresh = wire(&oracle, &repo);
    fresh.mount().await.expect("remounted");

    let SyncState::Ready(snapshot) = fresh.state() else { panic!("expected Ready") };
    assert_eq!(snapshot.record(), &saved);
    assert_eq!(saved.email.as_deref(), Some("u1@x.com"));
    assert!(saved.updated_at.is_some());
}

#[tokio::test]
async fn unmount_discards_in_flight_fetch() {
    let oracle = Arc::new(MemorySessionOracle::signed_in(u1()));
    let repo = Arc::new(MemoryProfileRepository::with_rows([ProfileRecord::new(UserId::new("U1"))]));
    let sync = wire(&oracle, &repo);

    let gate = repo.hold(RepositoryCall::Find);
    let mount = tokio::spawn({
        let sync = sync.clone();
        async move { sync.mount().await }
    });
    wait_for_calls(&repo, RepositoryCall::Find, 1).await;

    sync.unmount();
    assert_eq!(oracle.events().subscriber_count(), 0);

    gate.release();
    assert_eq!(mount.await.expect("mount task").unwrap_err(), SyncError::Stale);
    assert_eq!(sync.state(), SyncState::Idle);
    assert!(!sync.is_mounted());
}

#[tokio::test]
async fn unmount_discards_reload_started_by_sign_in() {
    let oracle = Arc::new(MemorySessionOracle::new());
    let repo = Arc::new(MemoryProfileRepository::new());
    let sync = wire(&oracle, &repo);
    assert_eq!(sync.mount().await.unwrap_err(), SyncError::NotAuthenticated);

    let session = oracle.issue(u1());
    oracle.set_session(Some(session.clone()));
    sync.handle_auth_event(AuthEvent::SignedIn(session));
    sync.unmount();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(sync.state(), SyncState::Idle);
    assert!(!sync.is_mounted());
    assert_eq!(repo.calls(RepositoryCall::Find), 0);
    assert_eq!(repo.calls(RepositoryCall::Create), 0);
    assert!(repo.is_empty());
}

#[tokio::test]
async fn sign_out_right_after_sign_in_cancels_the_reload() {
    let oracle = Arc::new(MemorySessionOracle::new());
    let repo = Arc::new(MemoryProfileRepository::new());
    let sync = wire(&oracle, &repo);
    assert_eq!(sync.mount().await.unwrap_err(), SyncError::NotAuthenticated);

    let session = oracle.issue(u1());
    oracle.set_session(Some(session.clone()));
    sync.handle_auth_event(AuthEvent::SignedIn(session));
    oracle.set_session(None);
    sync.handle_auth_event(AuthEvent::SignedOut);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(sync.state(), SyncState::Idle);
    assert!(sync.is_mounted());
    assert_eq!(repo.calls(RepositoryCall::Find), 0);
    assert!(repo.is_empty());
}

#[tokio::test]
async fn sign_in_during_initial_load_hands_mount_over() {
    let oracle = Arc::new(MemorySessionOracle::signed_in(u1()));
    let repo = Arc::new(MemoryProfileRepository::new());
    let sync = wire(&oracle, &repo);
    let mut view = sync.subscribe();

    // The oracle yields before answering, so the event lands mid-lookup
    let (mounted, ()) = tokio::join!(sync.mount(), async {
        let session = oracle.issue(u1());
        oracle.set_session(Some(session.clone()));
        sync.handle_auth_event(AuthEvent::SignedIn(session));
    });

    mounted.expect("mount succeeds once the reload takes over");
    let view = wait_for(&mut view, |v| matches!(v.state, SyncState::Ready(_))).await;
    let snapshot = view.state.snapshot().expect("snapshot");
    assert_eq!(snapshot.record().id.as_str(), "U1");
    assert_eq!(repo.calls(RepositoryCall::Create), 1);
}

#[tokio::test]
async fn switching_user_while_mounted_loads_the_new_profile() {
    let oracle = Arc::new(MemorySessionOracle::signed_in(u1()));
    let mut other = ProfileRecord::new(UserId::new("U2"));
    other.location = Some("Accra".into());
    let repo = Arc::new(MemoryProfileRepository::with_rows([other]));
    let sync = wire(&oracle, &repo);
    let mut view = sync.subscribe();

    sync.mount().await.expect("mounted");
    sync.edit("location", "Lagos").expect("edit");

    let u2 = oracle.issue(Identity::new("U2", Some("u2@x.com".into())));
    oracle.switch_to(Some(u2));

    let view = wait_for(&mut view, |v| {
        v.state.snapshot().is_some_and(|s| s.record().id.as_str() == "U2")
    })
    .await;
    let snapshot = view.state.snapshot().expect("snapshot");
    assert_eq!(snapshot.get(ProfileField::Location), "Accra");
    assert_eq!(snapshot.record().email.as_deref(), Some("u2@x.com"));
    assert!(!snapshot.is_dirty());
}

#[tokio::test]
async fn token_refresh_keeps_local_edits() {
    let oracle = Arc::new(MemorySessionOracle::signed_in(u1()));
    let repo = Arc::new(MemoryProfileRepository::new());
    let sync = wire(&oracle, &repo);

    sync.mount().await.expect("mounted");
    sync.edit("hint_name", "Ada").expect("edit");

    oracle.refresh().expect("refreshed");
    tokio::task::yield_now().await;

    assert_eq!(snapshot_value(&sync, ProfileField::HintName).as_deref(), Some("Ada"));
    assert_eq!(repo.calls(RepositoryCall::Find), 1);
}

#[tokio::test]
async fn failed_load_can_be_retried() {
    let oracle = Arc::new(MemorySessionOracle::signed_in(u1()));
    let repo = Arc::new(MemoryProfileRepository::new());
    repo.fail_next(RepositoryCall::Find, StoreError::Unknown("connection reset".into()));
    let sync = wire(&oracle, &repo);

    let err = sync.mount().await.unwrap_err();

    assert!(matches!(err, SyncError::Store(StoreError::Unknown(_))));
    assert!(matches!(sync.state(), SyncState::LoadError(reason) if reason.contains("connection reset")));
    assert_eq!(sync.view().notice.map(|n| n.text).as_deref(), Some(MSG_PROFILE_LOAD_FAILED));

    sync.load().await.expect("retry");
    assert!(matches!(sync.state(), SyncState::Ready(_)));
}

#[tokio::test]
async fn silently_expired_session_blocks_save() {
    let oracle = Arc::new(MemorySessionOracle::signed_in(u1()));
    let repo = Arc::new(MemoryProfileRepository::new());
    let sync = wire(&oracle, &repo);

    sync.mount().await.expect("mounted");
    sync.edit("mobile", "+2348000000000").expect("edit");
    let before = sync.state();

    oracle.set_session(None);

    assert_eq!(sync.save().await.unwrap_err(), SyncError::NotAuthenticated);
    assert_eq!(repo.calls(RepositoryCall::Upsert), 0);
    assert_eq!(sync.state(), before);
}

#[tokio::test]
async fn login_flow_drives_a_mounted_profile_view() {
    let oracle = Arc::new(MemorySessionOracle::new());
    let repo = Arc::new(MemoryProfileRepository::new());
    let flow = AuthFlow::new(oracle.clone(), MIN_PASSWORD_LENGTH);
    let sync = wire(&oracle, &repo);
    let mut view = sync.subscribe();

    assert!(!flow.check_session().await);
    assert_eq!(sync.mount().await.unwrap_err(), SyncError::NotAuthenticated);

    assert_eq!(flow.sign_up("new@x.com", "secret1").await.text, MSG_SIGNUP_SUCCESS);
    assert_eq!(sync.state(), SyncState::Idle);

    assert_eq!(flow.sign_in("new@x.com", "secret1").await.text, MSG_LOGIN_SUCCESS);
    assert!(flow.check_session().await);

    let view = wait_for(&mut view, |v| matches!(v.state, SyncState::Ready(_))).await;
    let snapshot = view.state.snapshot().expect("snapshot");
    assert_eq!(snapshot.record().email.as_deref(), Some("new@x.com"));
    assert_eq!(repo.calls(RepositoryCall::Create), 1);
}
