//! Shared helpers for bridge integration tests.
//!
//! Tests drive a real session task over the scripted [`MockTerminal`]; these
//! helpers cover the recurring setup (bridge start, simulated discovery,
//! connect) and the timing-sensitive assertions (waiting for a connection
//! state, receiving events with a deadline) so individual tests read as the
//! scenario they exercise.

use std::time::Duration;
use tapbridge::{Bridge, Subscription};
use tapbridge_core::{
    BridgeEvent, ConnectionConfig, ConnectionState, DiscoveryConfig, EventKind, EventName, Reader,
    ReaderId,
};
use tapbridge_sdk::{MockTerminal, MockTerminalHandle};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, timeout};

/// How long a test waits for an expected state or event before failing.
pub const TEST_DEADLINE: Duration = Duration::from_secs(2);

/// Quiet window used to assert that an event does NOT arrive.
pub const QUIET_WINDOW: Duration = Duration::from_millis(100);

/// Start a bridge over a fresh mock SDK.
pub fn start_bridge() -> (Bridge, MockTerminalHandle, JoinHandle<()>) {
    let (sdk, control) = MockTerminal::new();
    let (bridge, task) = Bridge::start(sdk).expect("fresh SDK has an unclaimed delegate channel");
    (bridge, control, task)
}

/// Build a validated reader id from a test literal.
pub fn reader_id(id: &str) -> ReaderId {
    ReaderId::new(id).expect("test reader id is valid")
}

/// Build a simulated reader for the mock's discovery script.
pub fn sim_reader(id: &str) -> Reader {
    Reader::simulated(reader_id(id), format!("Test reader {id}"))
}

/// Run a simulated discovery for the given reader ids and return the readers
/// reported by the first `discoveryUpdated` event.
///
/// Discovery is left active; cancel it in the test if the scenario needs
/// another round.
pub async fn discover_simulated(
    bridge: &Bridge,
    control: &MockTerminalHandle,
    ids: &[&str],
) -> Vec<Reader> {
    for id in ids {
        control.add_simulated_reader(sim_reader(id)).await;
    }
    let mut updates = bridge
        .subscribe(EventName::DiscoveryUpdated)
        .await
        .expect("subscribe to discovery updates");
    bridge
        .discover(DiscoveryConfig::simulated())
        .await
        .expect("start simulated discovery");

    match recv_event(&mut updates).await.kind {
        EventKind::DiscoveryUpdated { readers } => readers,
        other => panic!("expected a discovery update, got {other:?}"),
    }
}

/// Discover `id`, end discovery, and connect to it.
pub async fn connect_simulated(
    bridge: &Bridge,
    control: &MockTerminalHandle,
    id: &str,
) -> Reader {
    discover_simulated(bridge, control, &[id]).await;
    bridge.cancel_discovery().await.expect("cancel discovery");
    bridge
        .connect(reader_id(id), ConnectionConfig::default())
        .await
        .expect("connect to simulated reader")
}

/// Poll the session until it reports `expected`, or fail after the deadline.
pub async fn wait_for_connection(bridge: &Bridge, expected: ConnectionState) {
    let deadline = Instant::now() + TEST_DEADLINE;
    loop {
        let snapshot = bridge.current_state().await.expect("session is running");
        if snapshot.connection == expected {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "timed out waiting for connection state {expected}, still {}",
            snapshot.connection
        );
        sleep(Duration::from_millis(10)).await;
    }
}

/// Receive the next event on `subscription`, failing after the deadline.
pub async fn recv_event(subscription: &mut Subscription) -> BridgeEvent {
    timeout(TEST_DEADLINE, subscription.recv())
        .await
        .unwrap_or_else(|_| {
            panic!(
                "timed out waiting for a {} event",
                subscription.event_name()
            )
        })
        .expect("event stream ended unexpectedly")
}

/// Assert that no event arrives on `subscription` within the quiet window.
///
/// A stream that has already ended also counts as quiet.
pub async fn expect_no_event(subscription: &mut Subscription) {
    if let Ok(Some(event)) = timeout(QUIET_WINDOW, subscription.recv()).await {
        panic!(
            "expected no {} event, got {event:?}",
            subscription.event_name()
        );
    }
}
