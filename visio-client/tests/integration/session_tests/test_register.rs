use visio_core::{MessageKind, PeerId, Role};

use crate::integration::{create_test_session, init_tracing};
use crate::utils::FakeMediaSource;

#[tokio::test]
async fn test_second_register_is_ignored() {
    init_tracing();

    let mut t = create_test_session(FakeMediaSource::new()).await;

    t.server_sends("me", MessageKind::Register);
    t.server_sends("other", MessageKind::Register);
    t.server_sends("p1", MessageKind::Join);

    // Once p1 is processed, both registers have been handled
    t.expect_joined().await;
    assert_eq!(t.session.local_id().await.unwrap(), PeerId::from("me"));
}

#[tokio::test]
async fn test_local_id_waits_for_register() {
    init_tracing();

    let t = create_test_session(FakeMediaSource::new()).await;

    let session = t.session.clone();
    let pending = tokio::spawn(async move { session.local_id().await });
    tokio::task::yield_now().await;
    assert!(!pending.is_finished());

    t.server_sends("k2j3h4", MessageKind::Register);
    let local_id = pending.await.unwrap().unwrap();
    assert_eq!(local_id, PeerId::from("k2j3h4"));
    assert_eq!(
        Role::for_pair(&local_id, &PeerId::from("zzz")),
        Role::Impolite
    );
}

#[tokio::test]
async fn test_own_id_never_becomes_a_peer() {
    init_tracing();

    let mut t = create_test_session(FakeMediaSource::new()).await;

    t.server_sends("me", MessageKind::Register);
    t.server_sends("me", MessageKind::Join);
    t.server_sends("p1", MessageKind::Join);

    assert_eq!(t.expect_joined().await, PeerId::from("p1"));
    assert_eq!(t.factory.created(), 1);
}
