//! Mock terminal SDK for testing and development.
//!
//! This module provides a simulated SDK that can be scripted programmatically
//! to exercise the bridge without physical hardware or a vendor SDK. The mock
//! follows the device/handle split: the [`MockTerminal`] is handed to the
//! session, while the [`MockTerminalHandle`] stays with the test and injects
//! delegate callbacks (unsolicited disconnects, token requests, log lines) and
//! scripts operation outcomes.

use crate::callback::{DiscoveryOutcome, SdkCallback};
use crate::error::{Result, SdkError, codes};
use crate::traits::TerminalSdk;
use std::sync::Arc;
use tapbridge_core::{
    ConnectionConfig, DiscoveryConfig, PaymentIntent, PaymentIntentParams, Reader, ReaderId,
};
use tokio::sync::{Mutex, mpsc};

/// Scripted behavior shared between the mock and its handle.
#[derive(Debug, Default)]
struct Script {
    /// Readers reported when a simulated discovery starts.
    simulated_readers: Vec<Reader>,

    /// One-shot failure for the next connect operation.
    connect_failure: Option<SdkError>,

    /// One-shot failure for the next collect operation.
    collect_failure: Option<SdkError>,

    /// One-shot failure for the next process operation.
    process_failure: Option<SdkError>,

    /// Accept connect operations without confirming them, leaving the
    /// connection in flight until the handle emits the outcome callback.
    hold_connect: bool,

    /// Emit the terminal collect callback automatically. Disable to keep a
    /// collection in flight so it can be cancelled.
    hold_collect: bool,

    /// Intent currently being collected, if any.
    collecting: Option<PaymentIntent>,

    /// Token answers submitted back to the SDK, oldest first.
    submitted_tokens: Vec<std::result::Result<String, String>>,

    /// Operation names in issue order, for assertions on SDK traffic.
    operations: Vec<String>,
}

/// Mock terminal SDK.
///
/// # Examples
///
/// ```
/// use tapbridge_sdk::{MockTerminal, TerminalSdk};
/// use tapbridge_core::{DiscoveryConfig, Reader, ReaderId};
///
/// #[tokio::main]
/// async fn main() -> tapbridge_sdk::Result<()> {
///     let (mut sdk, handle) = MockTerminal::new();
///     let id = ReaderId::new("SIM-1").expect("valid id");
///     handle
///         .add_simulated_reader(Reader::simulated(id, "Front desk"))
///         .await;
///
///     let mut delegate = sdk.take_delegate().expect("delegate not yet taken");
///     sdk.discover_readers(&DiscoveryConfig::simulated()).await?;
///
///     let callback = delegate.recv().await.expect("callback");
///     // callback is SdkCallback::ReadersDiscovered listing SIM-1
///     # drop(callback);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockTerminal {
    callback_tx: mpsc::Sender<SdkCallback>,
    delegate_rx: Option<mpsc::Receiver<SdkCallback>>,
    script: Arc<Mutex<Script>>,
}

impl MockTerminal {
    /// Create a mock SDK along with its control handle.
    pub fn new() -> (Self, MockTerminalHandle) {
        let (callback_tx, delegate_rx) = mpsc::channel(64);
        let script = Arc::new(Mutex::new(Script::default()));

        let sdk = Self {
            callback_tx: callback_tx.clone(),
            delegate_rx: Some(delegate_rx),
            script: Arc::clone(&script),
        };
        let handle = MockTerminalHandle {
            callback_tx,
            script,
        };
        (sdk, handle)
    }

    async fn fire(&self, callback: SdkCallback) -> Result<()> {
        self.callback_tx
            .send(callback)
            .await
            .map_err(|_| SdkError::new(codes::DELEGATE_GONE, "Delegate channel closed"))
    }

    async fn record(&self, operation: &str) {
        self.script.lock().await.operations.push(operation.into());
    }
}

impl TerminalSdk for MockTerminal {
    fn take_delegate(&mut self) -> Option<mpsc::Receiver<SdkCallback>> {
        self.delegate_rx.take()
    }

    async fn discover_readers(&mut self, config: &DiscoveryConfig) -> Result<()> {
        self.record("discover_readers").await;
        if config.simulated {
            let readers = self.script.lock().await.simulated_readers.clone();
            self.fire(SdkCallback::ReadersDiscovered { readers }).await?;
        }
        // Physical discovery reports candidates only when the handle injects
        // them; discovery stays active until cancelled either way.
        Ok(())
    }

    async fn cancel_discovery(&mut self) -> Result<()> {
        self.record("cancel_discovery").await;
        self.fire(SdkCallback::DiscoveryCompleted {
            outcome: DiscoveryOutcome::Canceled,
        })
        .await
    }

    async fn connect_reader(
        &mut self,
        reader_id: &ReaderId,
        config: &ConnectionConfig,
    ) -> Result<()> {
        self.record("connect_reader").await;
        let scripted = {
            let mut script = self.script.lock().await;
            if script.hold_connect {
                return Ok(());
            }
            match script.connect_failure.take() {
                Some(error) => Err(error),
                None => {
                    let mut reader = script
                        .simulated_readers
                        .iter()
                        .find(|r| &r.id == reader_id)
                        .cloned()
                        .unwrap_or_else(|| Reader::new(reader_id.clone()));
                    if reader.location_id.is_none() {
                        reader.location_id = config.location_id.clone();
                    }
                    Ok(reader)
                }
            }
        };
        match scripted {
            Ok(reader) => self.fire(SdkCallback::ReaderConnected { reader }).await,
            Err(error) => self.fire(SdkCallback::ConnectFailed { error }).await,
        }
    }

    async fn disconnect_reader(&mut self) -> Result<()> {
        self.record("disconnect_reader").await;
        self.fire(SdkCallback::DisconnectCompleted).await
    }

    async fn create_payment_intent(
        &mut self,
        params: &PaymentIntentParams,
    ) -> Result<PaymentIntent> {
        self.record("create_payment_intent").await;
        Ok(PaymentIntent {
            id: format!("pi_mock_{}", uuid::Uuid::new_v4().simple()),
            amount: params.amount,
            currency: params.currency_or_default().to_string(),
        })
    }

    async fn collect_payment(&mut self, intent: &PaymentIntent) -> Result<()> {
        self.record("collect_payment").await;
        let (failure, hold) = {
            let mut script = self.script.lock().await;
            script.collecting = Some(intent.clone());
            (script.collect_failure.take(), script.hold_collect)
        };

        self.fire(SdkCallback::PaymentStatusChanged {
            status: tapbridge_core::PaymentStatus::WaitingForInput,
        })
        .await?;

        if let Some(error) = failure {
            self.script.lock().await.collecting = None;
            return self.fire(SdkCallback::PaymentFailed { error }).await;
        }
        if hold {
            return Ok(());
        }

        self.fire(SdkCallback::PaymentStatusChanged {
            status: tapbridge_core::PaymentStatus::Processing,
        })
        .await?;
        self.script.lock().await.collecting = None;
        self.fire(SdkCallback::PaymentCollected {
            intent: intent.clone(),
        })
        .await
    }

    async fn process_payment(&mut self, intent: &PaymentIntent) -> Result<PaymentIntent> {
        self.record("process_payment").await;
        match self.script.lock().await.process_failure.take() {
            Some(error) => Err(error),
            None => Ok(intent.clone()),
        }
    }

    async fn cancel_collect(&mut self) -> Result<()> {
        self.record("cancel_collect").await;
        if self.script.lock().await.collecting.take().is_none() {
            return Ok(());
        }
        self.fire(SdkCallback::PaymentFailed {
            error: SdkError::new(codes::OPERATION_CANCELED, "The command was canceled"),
        })
        .await
    }

    async fn submit_connection_token(
        &mut self,
        answer: std::result::Result<String, String>,
    ) -> Result<()> {
        self.record("submit_connection_token").await;
        self.script.lock().await.submitted_tokens.push(answer);
        Ok(())
    }
}

/// Handle for scripting a [`MockTerminal`].
///
/// Clones share the same script and delegate channel.
#[derive(Debug, Clone)]
pub struct MockTerminalHandle {
    callback_tx: mpsc::Sender<SdkCallback>,
    script: Arc<Mutex<Script>>,
}

impl MockTerminalHandle {
    /// Register a reader reported by simulated discovery.
    pub async fn add_simulated_reader(&self, reader: Reader) {
        self.script.lock().await.simulated_readers.push(reader);
    }

    /// Make the next connect operation fail with the given error.
    pub async fn fail_next_connect(&self, error: SdkError) {
        self.script.lock().await.connect_failure = Some(error);
    }

    /// Make the next collect operation fail with the given error.
    pub async fn fail_next_collect(&self, error: SdkError) {
        self.script.lock().await.collect_failure = Some(error);
    }

    /// Make the next process operation fail with the given error.
    pub async fn fail_next_process(&self, error: SdkError) {
        self.script.lock().await.process_failure = Some(error);
    }

    /// Keep the next collect operation in flight instead of auto-completing,
    /// so it can be cancelled.
    pub async fn hold_collect(&self, hold: bool) {
        self.script.lock().await.hold_collect = hold;
    }

    /// Accept connect operations without confirming them; pair with
    /// [`emit`](Self::emit) to deliver the outcome later.
    pub async fn hold_connect(&self, hold: bool) {
        self.script.lock().await.hold_connect = hold;
    }

    /// Inject a discovery candidate callback (physical discovery scripting).
    pub async fn discovered(&self, readers: Vec<Reader>) {
        self.emit(SdkCallback::ReadersDiscovered { readers }).await;
    }

    /// Simulate the reader dropping without a disconnect command.
    pub async fn unexpected_disconnect(&self, reader: Option<Reader>) {
        self.emit(SdkCallback::UnexpectedDisconnect { reader }).await;
    }

    /// Report recovery of a dropped connection as succeeded.
    pub async fn reconnect_succeeded(&self, reader: Option<Reader>) {
        self.emit(SdkCallback::ReconnectSucceeded { reader }).await;
    }

    /// Report recovery of a dropped connection as failed.
    pub async fn reconnect_failed(&self, reader: Option<Reader>) {
        self.emit(SdkCallback::ReconnectFailed { reader }).await;
    }

    /// Simulate the SDK asking the host for a connection token.
    pub async fn request_connection_token(&self) {
        self.emit(SdkCallback::ConnectionTokenNeeded).await;
    }

    /// Emit a diagnostic log callback.
    pub async fn log(&self, message: impl Into<String>) {
        self.emit(SdkCallback::Log {
            message: message.into(),
        })
        .await;
    }

    /// Emit an arbitrary delegate callback.
    ///
    /// Sends are best-effort: once the delegate receiver is dropped the
    /// callback goes nowhere, exactly like a vendor SDK firing into a torn
    /// down host.
    pub async fn emit(&self, callback: SdkCallback) {
        let _ = self.callback_tx.send(callback).await;
    }

    /// Token answers the bridge submitted back to the SDK, oldest first.
    pub async fn submitted_tokens(&self) -> Vec<std::result::Result<String, String>> {
        self.script.lock().await.submitted_tokens.clone()
    }

    /// Names of the SDK operations issued so far, in order.
    pub async fn operations(&self) -> Vec<String> {
        self.script.lock().await.operations.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapbridge_core::PaymentStatus;

    fn sim_reader(id: &str) -> Reader {
        Reader::simulated(ReaderId::new(id).unwrap(), format!("Reader {id}"))
    }

    #[tokio::test]
    async fn test_simulated_discovery_reports_readers() {
        let (mut sdk, handle) = MockTerminal::new();
        handle.add_simulated_reader(sim_reader("SIM-1")).await;
        handle.add_simulated_reader(sim_reader("SIM-2")).await;

        let mut delegate = sdk.take_delegate().unwrap();
        sdk.discover_readers(&DiscoveryConfig::simulated())
            .await
            .unwrap();

        match delegate.recv().await.unwrap() {
            SdkCallback::ReadersDiscovered { readers } => {
                assert_eq!(readers.len(), 2);
                assert_eq!(readers[0].id.as_str(), "SIM-1");
            }
            other => panic!("unexpected callback: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delegate_taken_once() {
        let (mut sdk, _handle) = MockTerminal::new();
        assert!(sdk.take_delegate().is_some());
        assert!(sdk.take_delegate().is_none());
    }

    #[tokio::test]
    async fn test_connect_confirms_with_callback() {
        let (mut sdk, handle) = MockTerminal::new();
        handle.add_simulated_reader(sim_reader("SIM-1")).await;
        let mut delegate = sdk.take_delegate().unwrap();

        let id = ReaderId::new("SIM-1").unwrap();
        sdk.connect_reader(&id, &ConnectionConfig::default())
            .await
            .unwrap();

        match delegate.recv().await.unwrap() {
            SdkCallback::ReaderConnected { reader } => assert_eq!(reader.id, id),
            other => panic!("unexpected callback: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_scripted_connect_failure() {
        let (mut sdk, handle) = MockTerminal::new();
        handle
            .fail_next_connect(SdkError::new(codes::READER_BUSY, "busy"))
            .await;
        let mut delegate = sdk.take_delegate().unwrap();

        let id = ReaderId::new("R1").unwrap();
        sdk.connect_reader(&id, &ConnectionConfig::default())
            .await
            .unwrap();

        match delegate.recv().await.unwrap() {
            SdkCallback::ConnectFailed { error } => assert_eq!(error.code, codes::READER_BUSY),
            other => panic!("unexpected callback: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_collect_auto_completes() {
        let (mut sdk, _handle) = MockTerminal::new();
        let mut delegate = sdk.take_delegate().unwrap();

        let intent = sdk
            .create_payment_intent(&PaymentIntentParams::new(500, None).unwrap())
            .await
            .unwrap();
        assert!(intent.id.starts_with("pi_mock_"));
        assert_eq!(intent.currency, "usd");

        sdk.collect_payment(&intent).await.unwrap();

        let mut statuses = Vec::new();
        loop {
            match delegate.recv().await.unwrap() {
                SdkCallback::PaymentStatusChanged { status } => statuses.push(status),
                SdkCallback::PaymentCollected { intent: done } => {
                    assert_eq!(done.id, intent.id);
                    break;
                }
                other => panic!("unexpected callback: {other:?}"),
            }
        }
        assert_eq!(
            statuses,
            vec![PaymentStatus::WaitingForInput, PaymentStatus::Processing]
        );
    }

    #[tokio::test]
    async fn test_cancel_collect_reports_canceled() {
        let (mut sdk, handle) = MockTerminal::new();
        handle.hold_collect(true).await;
        let mut delegate = sdk.take_delegate().unwrap();

        let intent = sdk
            .create_payment_intent(&PaymentIntentParams::new(500, None).unwrap())
            .await
            .unwrap();
        sdk.collect_payment(&intent).await.unwrap();
        sdk.cancel_collect().await.unwrap();

        // Status first, then the cancellation outcome.
        let mut saw_canceled = false;
        while let Ok(cb) = delegate.try_recv() {
            if let SdkCallback::PaymentFailed { error } = cb {
                assert!(error.is_canceled());
                saw_canceled = true;
            }
        }
        assert!(saw_canceled);
    }

    #[tokio::test]
    async fn test_cancel_collect_without_collect_is_noop() {
        let (mut sdk, _handle) = MockTerminal::new();
        let mut delegate = sdk.take_delegate().unwrap();

        sdk.cancel_collect().await.unwrap();
        assert!(delegate.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_submitted_tokens_recorded() {
        let (mut sdk, handle) = MockTerminal::new();
        sdk.submit_connection_token(Ok("tok_123".to_string()))
            .await
            .unwrap();
        sdk.submit_connection_token(Err("fetch failed".to_string()))
            .await
            .unwrap();

        let tokens = handle.submitted_tokens().await;
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0], Ok("tok_123".to_string()));
    }

    #[tokio::test]
    async fn test_handle_injects_unsolicited_callbacks() {
        let (mut sdk, handle) = MockTerminal::new();
        let mut delegate = sdk.take_delegate().unwrap();

        handle.unexpected_disconnect(Some(sim_reader("SIM-1"))).await;
        handle.reconnect_failed(Some(sim_reader("SIM-1"))).await;

        assert!(matches!(
            delegate.recv().await.unwrap(),
            SdkCallback::UnexpectedDisconnect { .. }
        ));
        assert!(matches!(
            delegate.recv().await.unwrap(),
            SdkCallback::ReconnectFailed { .. }
        ));
    }
}
