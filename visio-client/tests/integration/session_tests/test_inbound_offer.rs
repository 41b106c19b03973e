use visio_core::{Message, MessageKind, PeerId, SessionDescription};

use crate::integration::{create_test_session, init_tracing};
use crate::utils::{FakeMediaSource, wait_for_kind};

#[tokio::test]
async fn test_offer_from_unseen_peer_creates_record_and_answers() {
    init_tracing();

    let mut t = create_test_session(FakeMediaSource::new()).await;
    t.server_sends("me", MessageKind::Register);

    // "a3" sorts before "me", so we are polite towards it
    let remote = PeerId::from("a3");
    t.server.send(Message::description(
        &remote,
        &SessionDescription::offer("offer-a3-1"),
    ));

    assert_eq!(t.expect_joined().await, remote);

    let mut answer = None;
    while let Some(msg) = wait_for_kind(&mut t.server, MessageKind::Description).await {
        if msg.params.first().map(String::as_str) == Some("answer") {
            answer = Some(msg);
            break;
        }
    }
    let answer = answer.expect("Answer never reached the server");
    assert_eq!(answer.id, remote);
    assert_eq!(answer.body, "answer-a3");
    let transport = t.factory.transport(&remote).expect("No transport for a3");
    assert_eq!(
        transport.remote(),
        Some(SessionDescription::offer("offer-a3-1"))
    );
}

#[tokio::test]
async fn test_candidate_from_unseen_peer_creates_record() {
    init_tracing();

    let mut t = create_test_session(FakeMediaSource::new()).await;
    t.server_sends("me", MessageKind::Register);

    t.server.send_raw("p9 candidate 0\ncandidate:1 1 UDP 2122252543 10.0.0.9 5000 typ host");

    assert_eq!(t.expect_joined().await, PeerId::from("p9"));
    assert_eq!(t.session.peers().await, vec![PeerId::from("p9")]);
}
