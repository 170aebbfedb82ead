//! Client-facing bridge handle.
//!
//! [`Bridge`] is a cheap clonable handle over the session task: every method
//! sends a command with a oneshot responder and awaits the outcome. Handles
//! can be called from any task concurrently; the session serializes them.
//!
//! Invalidation is terminal. After [`Bridge::invalidate`] resolves, every
//! handle (including clones) rejects commands with
//! [`BridgeError::BridgeInvalidated`], all subscriptions end, and the session
//! task exits. A new bridge requires a new SDK instance.

use crate::registry::{Subscription, SubscriptionId};
use crate::session::{Command, Session, SessionSnapshot};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tapbridge_core::{
    BridgeError, ConnectionConfig, CorrelationId, DiscoveryConfig, EventName, PaymentIntent,
    PaymentIntentParams, Reader, ReaderId, Result,
};
use tapbridge_sdk::TerminalSdk;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::info;

/// Commands buffered before senders are backpressured.
const COMMAND_BUFFER: usize = 32;

/// Handle to a running terminal session.
///
/// # Examples
///
/// ```
/// use tapbridge::Bridge;
/// use tapbridge_core::DiscoveryConfig;
/// use tapbridge_sdk::MockTerminal;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> tapbridge_core::Result<()> {
///     let (sdk, _control) = MockTerminal::new();
///     let (bridge, _session) = Bridge::start(sdk)?;
///
///     bridge.discover(DiscoveryConfig::simulated()).await?;
///     bridge.invalidate().await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Bridge {
    commands: mpsc::Sender<Command>,
    invalidated: Arc<AtomicBool>,
}

impl Bridge {
    /// Claim the SDK's delegate channel and spawn the session task.
    ///
    /// The returned join handle resolves when the session stops, whether by
    /// invalidation or because the SDK's delegate channel closed.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::InvalidArgument` if the SDK's delegate channel
    /// was already taken; the SDK instance cannot be shared between bridges.
    pub fn start<S: TerminalSdk + 'static>(mut sdk: S) -> Result<(Self, JoinHandle<()>)> {
        let callbacks = sdk.take_delegate().ok_or_else(|| {
            BridgeError::invalid_argument("SDK delegate channel already claimed")
        })?;
        let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let session = Session::new(sdk, callbacks, command_rx);
        let task = tokio::spawn(session.run());
        info!("bridge started");

        let bridge = Self {
            commands,
            invalidated: Arc::new(AtomicBool::new(false)),
        };
        Ok((bridge, task))
    }

    /// Begin reader discovery.
    ///
    /// Candidates arrive through `discoveryUpdated` events; discovery stays
    /// active until cancelled or until the SDK ends it.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::InvalidState` if discovery is already running or
    /// a connect is in flight.
    pub async fn discover(&self, config: DiscoveryConfig) -> Result<()> {
        self.dispatch(|respond| Command::Discover { config, respond })
            .await
    }

    /// Cancel an in-flight discovery. A no-op success when idle.
    pub async fn cancel_discovery(&self) -> Result<()> {
        self.dispatch(|respond| Command::CancelDiscovery { respond })
            .await
    }

    /// Connect to a previously discovered reader.
    ///
    /// Resolves with the connected reader once the SDK confirms; the
    /// `readerConnected` event fires for subscribers at the same moment.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::InvalidState` unless the session is
    /// `NotConnected`, `BridgeError::NotFound` if the reader was never
    /// discovered, or `BridgeError::Sdk` if the SDK rejects or fails the
    /// connect.
    pub async fn connect(&self, reader_id: ReaderId, config: ConnectionConfig) -> Result<Reader> {
        self.dispatch(|respond| Command::Connect {
            reader_id,
            config,
            respond,
        })
        .await
    }

    /// Disconnect from the connected reader.
    ///
    /// Disconnecting while already `NotConnected` succeeds without emitting
    /// anything.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::InvalidState` while a connect is still pending.
    pub async fn disconnect(&self) -> Result<()> {
        self.dispatch(|respond| Command::Disconnect { respond })
            .await
    }

    /// Create a payment intent on the connected reader.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::InvalidState` unless connected.
    pub async fn create_payment_intent(
        &self,
        params: PaymentIntentParams,
    ) -> Result<PaymentIntent> {
        self.dispatch(|respond| Command::CreatePaymentIntent { params, respond })
            .await
    }

    /// Collect a payment method for the given intent.
    ///
    /// Resolves with `Some(intent)` on success and `None` when the collection
    /// was cancelled via [`cancel_collect`](Self::cancel_collect); a
    /// cancelled collection is an expected outcome, not an error.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::InvalidState` unless connected and no collection
    /// is already running, or `BridgeError::Sdk` when collection fails for
    /// any reason other than cancellation.
    pub async fn collect_payment(&self, intent: PaymentIntent) -> Result<Option<PaymentIntent>> {
        self.dispatch(|respond| Command::CollectPayment { intent, respond })
            .await
    }

    /// Process a payment intent whose payment method was collected.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::InvalidState` unless connected, or
    /// `BridgeError::Sdk` when the SDK fails to process (declines, network
    /// failures).
    pub async fn process_payment(&self, intent: PaymentIntent) -> Result<PaymentIntent> {
        self.dispatch(|respond| Command::ProcessPayment { intent, respond })
            .await
    }

    /// Cancel an in-flight payment collection. A no-op success when none is
    /// running.
    pub async fn cancel_collect(&self) -> Result<()> {
        self.dispatch(|respond| Command::CancelCollect { respond })
            .await
    }

    /// Answer a `connectionTokenRequested` event.
    ///
    /// `answer` carries either the fetched token or the host-side failure
    /// message to forward to the SDK.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NotFound` if no request with this correlation id
    /// is pending (already answered, or never issued).
    pub async fn provide_token(
        &self,
        correlation_id: CorrelationId,
        answer: std::result::Result<String, String>,
    ) -> Result<()> {
        self.dispatch(|respond| Command::ProvideToken {
            correlation_id,
            answer,
            respond,
        })
        .await
    }

    /// Register a listener for the named event.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::BridgeInvalidated` once the bridge is torn down.
    pub async fn subscribe(&self, name: EventName) -> Result<Subscription> {
        if self.invalidated.load(Ordering::SeqCst) {
            return Err(BridgeError::BridgeInvalidated);
        }
        let (respond, outcome) = oneshot::channel();
        self.commands
            .send(Command::Subscribe { name, respond })
            .await
            .map_err(|_| self.closed_error())?;
        outcome.await.map_err(|_| self.closed_error())
    }

    /// Unregister a listener by id.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NotFound` for an unknown or already removed id.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        self.dispatch(|respond| Command::Unsubscribe { id, respond })
            .await
    }

    /// Snapshot the session state.
    pub async fn current_state(&self) -> Result<SessionSnapshot> {
        if self.invalidated.load(Ordering::SeqCst) {
            return Err(BridgeError::BridgeInvalidated);
        }
        let (respond, outcome) = oneshot::channel();
        self.commands
            .send(Command::CurrentState { respond })
            .await
            .map_err(|_| self.closed_error())?;
        outcome.await.map_err(|_| self.closed_error())
    }

    /// Tear the bridge down.
    ///
    /// Idempotent: repeated calls (from any clone) succeed. Pending commands
    /// are rejected with `BridgeError::BridgeInvalidated`, all subscriptions
    /// end, and the session task exits.
    pub async fn invalidate(&self) -> Result<()> {
        if self.invalidated.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let (respond, done) = oneshot::channel();
        if self
            .commands
            .send(Command::Invalidate { respond })
            .await
            .is_err()
        {
            // Session already gone; nothing left to tear down.
            return Ok(());
        }
        let _ = done.await;
        Ok(())
    }

    /// Whether this bridge has been invalidated.
    #[must_use]
    pub fn is_invalidated(&self) -> bool {
        self.invalidated.load(Ordering::SeqCst)
    }

    async fn dispatch<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<T>>) -> Command,
    ) -> Result<T> {
        if self.invalidated.load(Ordering::SeqCst) {
            return Err(BridgeError::BridgeInvalidated);
        }
        let (respond, outcome) = oneshot::channel();
        self.commands
            .send(command(respond))
            .await
            .map_err(|_| self.closed_error())?;
        outcome.await.map_err(|_| self.closed_error())?
    }

    /// Session-gone errors are reported as invalidation when this handle
    /// observed one, and as a closed channel otherwise.
    fn closed_error(&self) -> BridgeError {
        if self.invalidated.load(Ordering::SeqCst) {
            BridgeError::BridgeInvalidated
        } else {
            BridgeError::ChannelClosed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapbridge_core::{ConnectionState, DiscoveryState};
    use tapbridge_sdk::MockTerminal;

    #[tokio::test]
    async fn test_start_claims_delegate_once() {
        let (mut sdk, _control) = MockTerminal::new();
        let _ = sdk.take_delegate();

        assert!(matches!(
            Bridge::start(sdk),
            Err(BridgeError::InvalidArgument { .. })
        ));
    }

    #[tokio::test]
    async fn test_initial_state() {
        let (sdk, _control) = MockTerminal::new();
        let (bridge, _task) = Bridge::start(sdk).unwrap();

        let snapshot = bridge.current_state().await.unwrap();
        assert_eq!(snapshot.connection, ConnectionState::NotConnected);
        assert_eq!(snapshot.discovery, DiscoveryState::Idle);
        assert!(snapshot.connected_reader.is_none());
        assert!(snapshot.active_operation.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_rejects_commands_on_all_clones() {
        let (sdk, _control) = MockTerminal::new();
        let (bridge, task) = Bridge::start(sdk).unwrap();
        let clone = bridge.clone();

        bridge.invalidate().await.unwrap();
        assert!(bridge.is_invalidated());

        assert_eq!(
            clone.discover(DiscoveryConfig::simulated()).await,
            Err(BridgeError::BridgeInvalidated)
        );
        assert_eq!(
            clone.subscribe(EventName::Log).await.unwrap_err(),
            BridgeError::BridgeInvalidated
        );

        // Invalidation stops the session task.
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_invalidate_is_idempotent() {
        let (sdk, _control) = MockTerminal::new();
        let (bridge, _task) = Bridge::start(sdk).unwrap();

        bridge.invalidate().await.unwrap();
        bridge.invalidate().await.unwrap();
    }
}
