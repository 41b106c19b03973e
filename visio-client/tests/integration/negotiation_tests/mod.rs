
use std::sync::Arc;
use tokio::sync::mpsc;

use visio_client::{Negotiator, TransportEvent};
use visio_core::{Message, PeerId, Role};

use crate::utils::{FakeTransport, MockSignalingOutput};

pub struct TestPeer {
    pub negotiator: Arc<Negotiator>,
    pub transport: Arc<FakeTransport>,
    pub signaling: MockSignalingOutput,
    pub outbox: mpsc::UnboundedReceiver<Message>,
    pub transport_events: mpsc::Receiver<TransportEvent>,
}

/// Negotiator for `local` talking to `remote`, with the role derived from
/// the two ids.
pub fn create_test_peer(local: &str, remote: &str) -> TestPeer {
    create_test_peer_with(local, remote, |transport| transport)
}

pub fn create_test_peer_with(
    local: &str,
    remote: &str,
    configure: impl FnOnce(FakeTransport) -> FakeTransport,
) -> TestPeer {
    let (event_tx, transport_events) = mpsc::channel(16);
    let transport = Arc::new(configure(FakeTransport::new(local, event_tx)));
    let (signaling, outbox) = MockSignalingOutput::new();

    let local = PeerId::from(local);
    let remote = PeerId::from(remote);
    let negotiator = Arc::new(Negotiator::new(
        remote.clone(),
        Role::for_pair(&local, &remote),
        transport.clone(),
        Arc::new(signaling.clone()),
    ));

    TestPeer {
        negotiator,
        transport,
        signaling,
        outbox,
        transport_events,
    }
}
