//! Terminal session state machine.
//!
//! The session is the single logical owner of SDK state. It runs as one task
//! that drains two channels: client commands (with oneshot responders) and
//! SDK delegate callbacks. All `ConnectionState`/`DiscoveryState` mutation
//! happens inside this task, so no lock is held across suspension points and
//! concurrent commands cannot interleave into an inconsistent intermediate
//! state.
//!
//! Connection state only transitions on confirmed SDK callbacks or on the
//! resolution of a connect/disconnect command; accepting a command never
//! implies the state has already changed. Commands whose outcome the SDK
//! reports later (`connect`, `disconnect`, `collect_payment`) park their
//! responder in a pending slot and are resolved when the confirming callback
//! arrives.

use crate::registry::{ListenerRegistry, Subscription, SubscriptionId};
use crate::token::TokenProvider;
use crate::translate::translate;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tapbridge_core::{
    BridgeError, BridgeEvent, ConnectionConfig, ConnectionState, CorrelationId, DEFAULT_CURRENCY,
    DiscoveryConfig, DiscoveryState, EventKind, EventName, OperationToken, PaymentIntent,
    PaymentIntentParams, Reader, ReaderId, Result,
};
use tapbridge_sdk::{DiscoveryOutcome, SdkCallback, TerminalSdk};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

type Responder<T> = oneshot::Sender<Result<T>>;

/// Commands accepted by the session task.
#[derive(Debug)]
pub(crate) enum Command {
    Discover {
        config: DiscoveryConfig,
        respond: Responder<()>,
    },
    CancelDiscovery {
        respond: Responder<()>,
    },
    Connect {
        reader_id: ReaderId,
        config: ConnectionConfig,
        respond: Responder<Reader>,
    },
    Disconnect {
        respond: Responder<()>,
    },
    CreatePaymentIntent {
        params: PaymentIntentParams,
        respond: Responder<PaymentIntent>,
    },
    CollectPayment {
        intent: PaymentIntent,
        respond: Responder<Option<PaymentIntent>>,
    },
    ProcessPayment {
        intent: PaymentIntent,
        respond: Responder<PaymentIntent>,
    },
    CancelCollect {
        respond: Responder<()>,
    },
    ProvideToken {
        correlation_id: CorrelationId,
        answer: std::result::Result<String, String>,
        respond: Responder<()>,
    },
    Subscribe {
        name: EventName,
        respond: oneshot::Sender<Subscription>,
    },
    Unsubscribe {
        id: SubscriptionId,
        respond: Responder<()>,
    },
    CurrentState {
        respond: oneshot::Sender<SessionSnapshot>,
    },
    Invalidate {
        respond: oneshot::Sender<()>,
    },
}

/// Point-in-time view of the session state.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// Connection lifecycle state.
    pub connection: ConnectionState,

    /// Discovery sub-state.
    pub discovery: DiscoveryState,

    /// The connected reader, if any.
    pub connected_reader: Option<Reader>,

    /// Token of the in-flight cancellable operation, if any.
    pub active_operation: Option<OperationToken>,
}

/// A payment collection awaiting its terminal callback.
#[derive(Debug)]
struct PendingCollect {
    token: OperationToken,
    started_at: DateTime<Utc>,
    respond: Responder<Option<PaymentIntent>>,
}

/// Single-writer owner of the SDK handle and session state.
pub(crate) struct Session<S: TerminalSdk> {
    sdk: S,
    callbacks: mpsc::Receiver<SdkCallback>,
    commands: mpsc::Receiver<Command>,
    registry: ListenerRegistry,
    tokens: TokenProvider,

    connection: ConnectionState,
    discovery: DiscoveryState,
    known_readers: HashMap<ReaderId, Reader>,
    connected_reader: Option<Reader>,
    /// Reader we lost track of while `Reconnecting`, for the eventual event.
    dropped_reader: Option<Reader>,

    pending_connect: Option<Responder<Reader>>,
    pending_disconnect: Option<Responder<()>>,
    pending_collect: Option<PendingCollect>,
    discovery_op: Option<OperationToken>,
}

impl<S: TerminalSdk> Session<S> {
    pub(crate) fn new(
        sdk: S,
        callbacks: mpsc::Receiver<SdkCallback>,
        commands: mpsc::Receiver<Command>,
    ) -> Self {
        Self {
            sdk,
            callbacks,
            commands,
            registry: ListenerRegistry::new(),
            tokens: TokenProvider::new(),
            connection: ConnectionState::NotConnected,
            discovery: DiscoveryState::Idle,
            known_readers: HashMap::new(),
            connected_reader: None,
            dropped_reader: None,
            pending_connect: None,
            pending_disconnect: None,
            pending_collect: None,
            discovery_op: None,
        }
    }

    /// Drive the session until invalidation or until both channels close.
    pub(crate) async fn run(mut self) {
        debug!("terminal session started");
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => {
                        if self.handle_command(command).await {
                            debug!("terminal session invalidated");
                            return;
                        }
                    }
                    None => break,
                },
                callback = self.callbacks.recv() => match callback {
                    Some(callback) => self.handle_callback(callback).await,
                    None => {
                        warn!("SDK delegate channel closed");
                        break;
                    }
                },
            }
        }
        self.reject_pending(&BridgeError::ChannelClosed);
        debug!("terminal session stopped");
    }

    // Commands

    /// Returns `true` when the session should stop.
    async fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Discover { config, respond } => {
                let result = self.start_discovery(&config).await;
                let _ = respond.send(result);
            }
            Command::CancelDiscovery { respond } => {
                let result = self.cancel_discovery().await;
                let _ = respond.send(result);
            }
            Command::Connect {
                reader_id,
                config,
                respond,
            } => self.start_connect(reader_id, config, respond).await,
            Command::Disconnect { respond } => self.start_disconnect(respond).await,
            Command::CreatePaymentIntent { params, respond } => {
                let result = self.create_payment_intent(&params).await;
                let _ = respond.send(result);
            }
            Command::CollectPayment { intent, respond } => {
                self.start_collect(intent, respond).await;
            }
            Command::ProcessPayment { intent, respond } => {
                let result = self.process_payment(&intent).await;
                let _ = respond.send(result);
            }
            Command::CancelCollect { respond } => {
                let result = self.cancel_collect().await;
                let _ = respond.send(result);
            }
            Command::ProvideToken {
                correlation_id,
                answer,
                respond,
            } => {
                let result = self.provide_token(correlation_id, answer).await;
                let _ = respond.send(result);
            }
            Command::Subscribe { name, respond } => {
                let _ = respond.send(self.registry.subscribe(name));
            }
            Command::Unsubscribe { id, respond } => {
                let result = if self.registry.unsubscribe(id) {
                    Ok(())
                } else {
                    Err(BridgeError::not_found("subscription"))
                };
                let _ = respond.send(result);
            }
            Command::CurrentState { respond } => {
                let _ = respond.send(self.snapshot());
            }
            Command::Invalidate { respond } => {
                self.invalidate();
                let _ = respond.send(());
                return true;
            }
        }
        false
    }

    async fn start_discovery(&mut self, config: &DiscoveryConfig) -> Result<()> {
        if self.discovery == DiscoveryState::Discovering {
            return Err(BridgeError::invalid_state(self.discovery, "discover"));
        }
        if self.connection == ConnectionState::Connecting {
            return Err(BridgeError::invalid_state(self.connection, "discover"));
        }
        self.sdk.discover_readers(config).await?;
        self.discovery = DiscoveryState::Discovering;
        self.discovery_op = Some(OperationToken::new());
        debug!(simulated = config.simulated, "discovery started");
        Ok(())
    }

    async fn cancel_discovery(&mut self) -> Result<()> {
        if self.discovery == DiscoveryState::Idle {
            return Ok(());
        }
        // Idle is entered when the terminal discovery callback arrives, so a
        // cancel racing a completion still converges on a single Idle.
        self.sdk.cancel_discovery().await?;
        Ok(())
    }

    async fn start_connect(
        &mut self,
        reader_id: ReaderId,
        config: ConnectionConfig,
        respond: Responder<Reader>,
    ) {
        if self.connection != ConnectionState::NotConnected {
            let _ = respond.send(Err(BridgeError::invalid_state(self.connection, "connect")));
            return;
        }
        if !self.known_readers.contains_key(&reader_id) {
            let _ = respond.send(Err(BridgeError::not_found(format!("reader {reader_id}"))));
            return;
        }
        match self.sdk.connect_reader(&reader_id, &config).await {
            Ok(()) => {
                self.transition(ConnectionState::Connecting, "connect accepted by SDK");
                self.pending_connect = Some(respond);
            }
            Err(error) => {
                let _ = respond.send(Err(error.into()));
            }
        }
    }

    async fn start_disconnect(&mut self, respond: Responder<()>) {
        match self.connection {
            // Idempotent: success with no events.
            ConnectionState::NotConnected => {
                let _ = respond.send(Ok(()));
            }
            ConnectionState::Connecting => {
                let _ = respond.send(Err(BridgeError::invalid_state(
                    self.connection,
                    "disconnect",
                )));
            }
            ConnectionState::Connected | ConnectionState::Reconnecting => {
                if self.pending_disconnect.is_some() {
                    let _ = respond.send(Err(BridgeError::invalid_state(
                        self.connection,
                        "disconnect",
                    )));
                    return;
                }
                match self.sdk.disconnect_reader().await {
                    Ok(()) => self.pending_disconnect = Some(respond),
                    Err(error) => {
                        let _ = respond.send(Err(error.into()));
                    }
                }
            }
        }
    }

    async fn create_payment_intent(
        &mut self,
        params: &PaymentIntentParams,
    ) -> Result<PaymentIntent> {
        if self.connection != ConnectionState::Connected {
            return Err(BridgeError::invalid_state(
                self.connection,
                "create_payment_intent",
            ));
        }
        if params.currency.is_none() {
            warn!(
                "no currency provided to create_payment_intent, defaulting to {}",
                DEFAULT_CURRENCY
            );
        }
        Ok(self.sdk.create_payment_intent(params).await?)
    }

    async fn start_collect(
        &mut self,
        intent: PaymentIntent,
        respond: Responder<Option<PaymentIntent>>,
    ) {
        if self.connection != ConnectionState::Connected {
            let _ = respond.send(Err(BridgeError::invalid_state(
                self.connection,
                "collect_payment",
            )));
            return;
        }
        if self.pending_collect.is_some() {
            let _ = respond.send(Err(BridgeError::invalid_state(
                "CollectingPayment",
                "collect_payment",
            )));
            return;
        }
        match self.sdk.collect_payment(&intent).await {
            Ok(()) => {
                self.pending_collect = Some(PendingCollect {
                    token: OperationToken::new(),
                    started_at: Utc::now(),
                    respond,
                });
            }
            Err(error) => {
                let _ = respond.send(Err(error.into()));
            }
        }
    }

    async fn process_payment(&mut self, intent: &PaymentIntent) -> Result<PaymentIntent> {
        if self.connection != ConnectionState::Connected {
            return Err(BridgeError::invalid_state(self.connection, "process_payment"));
        }
        Ok(self.sdk.process_payment(intent).await?)
    }

    async fn cancel_collect(&mut self) -> Result<()> {
        // Cancelling with nothing in flight is not an error.
        if self.pending_collect.is_none() {
            return Ok(());
        }
        self.sdk.cancel_collect().await?;
        Ok(())
    }

    async fn provide_token(
        &mut self,
        correlation_id: CorrelationId,
        answer: std::result::Result<String, String>,
    ) -> Result<()> {
        let request = self.tokens.resolve(correlation_id)?;
        let age_ms = (Utc::now() - request.created_at).num_milliseconds();
        debug!(%correlation_id, age_ms, "token request answered");
        self.sdk.submit_connection_token(answer).await?;
        Ok(())
    }

    fn invalidate(&mut self) {
        info!("bridge invalidated, clearing listeners and rejecting pending commands");
        self.registry.clear();
        self.tokens.clear();
        self.reject_pending(&BridgeError::BridgeInvalidated);
    }

    fn reject_pending(&mut self, error: &BridgeError) {
        if let Some(respond) = self.pending_connect.take() {
            let _ = respond.send(Err(error.clone()));
        }
        if let Some(respond) = self.pending_disconnect.take() {
            let _ = respond.send(Err(error.clone()));
        }
        if let Some(pending) = self.pending_collect.take() {
            let _ = pending.respond.send(Err(error.clone()));
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            connection: self.connection,
            discovery: self.discovery,
            connected_reader: self.connected_reader.clone(),
            active_operation: self
                .discovery_op
                .or_else(|| self.pending_collect.as_ref().map(|p| p.token)),
        }
    }

    // Delegate callbacks

    async fn handle_callback(&mut self, callback: SdkCallback) {
        match callback {
            SdkCallback::ReadersDiscovered { readers } => {
                for reader in &readers {
                    self.known_readers.insert(reader.id.clone(), reader.clone());
                }
                if self.discovery != DiscoveryState::Discovering {
                    // Late candidate racing a cancel: remember the readers so
                    // a follow-up connect still works, but the discovery
                    // stream is over for listeners.
                    debug!("discovery update received while idle");
                    return;
                }
                self.surface(SdkCallback::ReadersDiscovered { readers });
            }

            SdkCallback::DiscoveryCompleted { outcome } => {
                self.discovery = DiscoveryState::Idle;
                self.discovery_op = None;
                match outcome {
                    DiscoveryOutcome::Failed(error) => {
                        warn!(%error, "discovery ended with SDK failure");
                        self.publish(BridgeEvent::new(EventKind::Log {
                            message: format!("discovery failed: {error}"),
                        }));
                    }
                    other => debug!(?other, "discovery ended"),
                }
            }

            SdkCallback::ReaderConnected { reader } => {
                self.transition(ConnectionState::Connected, "SDK confirmed connect");
                self.connected_reader = Some(reader.clone());
                // A fresh discovery is required before the next connect.
                self.known_readers.clear();
                match self.pending_connect.take() {
                    Some(respond) => {
                        let _ = respond.send(Ok(reader.clone()));
                    }
                    None => warn!(reader = %reader.id, "reader connected with no pending connect"),
                }
                self.surface(SdkCallback::ReaderConnected { reader });
            }

            SdkCallback::ConnectFailed { error } => {
                self.transition(ConnectionState::NotConnected, "SDK reported connect failure");
                match self.pending_connect.take() {
                    Some(respond) => {
                        let _ = respond.send(Err(error.into()));
                    }
                    None => warn!(%error, "connect failure with no pending connect"),
                }
            }

            SdkCallback::DisconnectCompleted => {
                self.transition(ConnectionState::NotConnected, "SDK confirmed disconnect");
                let reader_id = self.connected_reader.take().map(|reader| reader.id);
                self.dropped_reader = None;
                if let Some(respond) = self.pending_disconnect.take() {
                    let _ = respond.send(Ok(()));
                }
                if let Some(mut event) = translate(&SdkCallback::DisconnectCompleted) {
                    // The callback carries no reader; enrich from session state.
                    if let EventKind::ReaderDisconnected { reader_id: slot } = &mut event.kind {
                        *slot = reader_id;
                    }
                    self.publish(event);
                }
            }

            SdkCallback::UnexpectedDisconnect { reader } => {
                if self.connection == ConnectionState::Connected {
                    self.dropped_reader = reader.or_else(|| self.connected_reader.clone());
                    self.transition(
                        ConnectionState::Reconnecting,
                        "unsolicited disconnect, SDK recovering",
                    );
                    // Surfaced to listeners once recovery resolves.
                } else {
                    warn!(state = %self.connection, "unsolicited disconnect ignored");
                }
            }

            SdkCallback::ReconnectSucceeded { reader } => {
                if self.connection != ConnectionState::Reconnecting {
                    warn!(state = %self.connection, "reconnect success ignored");
                    return;
                }
                self.transition(ConnectionState::Connected, "SDK recovered connection");
                let reader = reader.or_else(|| self.dropped_reader.take());
                self.dropped_reader = None;
                if let Some(reader) = &reader {
                    self.connected_reader = Some(reader.clone());
                }
                self.surface(SdkCallback::ReconnectSucceeded { reader });
            }

            SdkCallback::ReconnectFailed { reader } => {
                match self.connection {
                    ConnectionState::Connected | ConnectionState::Reconnecting => {
                        self.transition(
                            ConnectionState::NotConnected,
                            "recovery failed or abandoned",
                        );
                        let lost = reader
                            .or_else(|| self.dropped_reader.take())
                            .or_else(|| self.connected_reader.take());
                        self.connected_reader = None;
                        self.dropped_reader = None;
                        self.surface(SdkCallback::ReconnectFailed { reader: lost });
                    }
                    // Already NotConnected: the loss was reported once.
                    other => warn!(state = %other, "reconnect failure ignored"),
                }
            }

            SdkCallback::PaymentCollected { intent } => match self.pending_collect.take() {
                Some(pending) => {
                    let elapsed_ms = (Utc::now() - pending.started_at).num_milliseconds();
                    debug!(intent = %intent.id, elapsed_ms, "payment collection finished");
                    let _ = pending.respond.send(Ok(Some(intent)));
                }
                None => warn!(intent = %intent.id, "payment collected with no pending collect"),
            },

            SdkCallback::PaymentFailed { error } => match self.pending_collect.take() {
                Some(pending) => {
                    let result = if error.is_canceled() {
                        // A cancelled collection is not an error.
                        Ok(None)
                    } else {
                        Err(error.into())
                    };
                    let _ = pending.respond.send(result);
                }
                None => warn!(%error, "payment failure with no pending collect"),
            },

            SdkCallback::ConnectionTokenNeeded => match self.tokens.begin() {
                Ok(event) => {
                    info!("SDK requested a connection token");
                    self.publish(event);
                }
                Err(_) => {
                    warn!("SDK requested a connection token while one is already pending");
                    self.publish(BridgeEvent::new(EventKind::Log {
                        message: "rejected concurrent connection token request".to_string(),
                    }));
                }
            },

            // Status updates, update progress, prompts, log lines, and any
            // callback this bridge version does not know.
            other => self.surface(other),
        }
    }

    fn surface(&mut self, callback: SdkCallback) {
        if let Some(event) = translate(&callback) {
            self.publish(event);
        }
    }

    fn publish(&mut self, event: BridgeEvent) {
        debug!(event = %event.name(), "emitting event");
        self.registry.publish(&event);
    }

    /// Apply a connection state transition, ignoring (with a warning) any
    /// transition the state machine does not allow.
    fn transition(&mut self, target: ConnectionState, why: &str) {
        if self.connection == target {
            return;
        }
        if !self.connection.can_transition_to(target) {
            warn!(from = %self.connection, to = %target, why, "invalid connection state transition ignored");
            return;
        }
        info!(from = %self.connection, to = %target, why, "connection state changed");
        self.connection = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapbridge_sdk::MockTerminal;

    fn new_session() -> Session<MockTerminal> {
        let (mut sdk, _handle) = MockTerminal::new();
        let callbacks = sdk.take_delegate().expect("delegate");
        let (_tx, commands) = mpsc::channel(8);
        Session::new(sdk, callbacks, commands)
    }

    #[tokio::test]
    async fn test_transition_rejects_invalid_jump() {
        let mut session = new_session();
        assert_eq!(session.connection, ConnectionState::NotConnected);

        // NotConnected -> Connected is not a legal transition.
        session.transition(ConnectionState::Connected, "test");
        assert_eq!(session.connection, ConnectionState::NotConnected);

        session.transition(ConnectionState::Connecting, "test");
        session.transition(ConnectionState::Connected, "test");
        assert_eq!(session.connection, ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_unsolicited_disconnect_only_from_connected() {
        let mut session = new_session();
        session
            .handle_callback(SdkCallback::UnexpectedDisconnect { reader: None })
            .await;
        assert_eq!(session.connection, ConnectionState::NotConnected);
    }

    #[tokio::test]
    async fn test_snapshot_reports_discovery_operation() {
        let mut session = new_session();
        assert!(session.snapshot().active_operation.is_none());

        session
            .start_discovery(&DiscoveryConfig::simulated())
            .await
            .unwrap();
        let snapshot = session.snapshot();
        assert_eq!(snapshot.discovery, DiscoveryState::Discovering);
        assert!(snapshot.active_operation.is_some());
    }

    #[tokio::test]
    async fn test_reconnect_failure_reported_once() {
        let mut session = new_session();
        session.transition(ConnectionState::Connecting, "test");
        session.transition(ConnectionState::Connected, "test");

        let mut events = session.registry.subscribe(EventName::UnexpectedReaderDisconnect);

        session
            .handle_callback(SdkCallback::UnexpectedDisconnect { reader: None })
            .await;
        assert_eq!(session.connection, ConnectionState::Reconnecting);

        session
            .handle_callback(SdkCallback::ReconnectFailed { reader: None })
            .await;
        session
            .handle_callback(SdkCallback::ReconnectFailed { reader: None })
            .await;

        assert_eq!(session.connection, ConnectionState::NotConnected);
        assert!(events.try_recv().is_some());
        assert!(events.try_recv().is_none());
    }
}
