//! Terminal SDK trait definition.
//!
//! This module defines the contract between the bridge and the opaque
//! payment-terminal SDK. The trait uses native `async fn` methods
//! (Edition 2024 RPITIT), so implementations are used through generic type
//! parameters rather than trait objects.
//!
//! Operations are accepted or rejected immediately; their *outcome* arrives
//! later as a delegate callback on the channel handed out by
//! [`take_delegate`](TerminalSdk::take_delegate). The bridge never treats an
//! accepted operation as completed until the confirming callback arrives.

#![allow(async_fn_in_trait)]

use crate::callback::SdkCallback;
use crate::error::Result;
use tapbridge_core::{
    ConnectionConfig, DiscoveryConfig, PaymentIntent, PaymentIntentParams, ReaderId,
};
use tokio::sync::mpsc;

/// The payment-terminal SDK as seen by the bridge.
///
/// # Delegate registration
///
/// The SDK reports asynchronous events by sending [`SdkCallback`] values on a
/// channel created alongside the SDK handle. The bridge claims that channel
/// exactly once via [`take_delegate`](TerminalSdk::take_delegate) when the
/// session starts.
///
/// # Examples
///
/// ```no_run
/// use tapbridge_sdk::{TerminalSdk, SdkCallback};
/// use tapbridge_core::DiscoveryConfig;
///
/// async fn start_discovery<S: TerminalSdk>(sdk: &mut S) -> tapbridge_sdk::Result<()> {
///     sdk.discover_readers(&DiscoveryConfig::simulated()).await
/// }
/// ```
pub trait TerminalSdk: Send + Sync {
    /// Claim the delegate callback stream.
    ///
    /// Returns `None` if the stream was already taken. The SDK keeps firing
    /// callbacks into this channel for as long as the handle lives.
    fn take_delegate(&mut self) -> Option<mpsc::Receiver<SdkCallback>>;

    /// Start discovering readers.
    ///
    /// Candidate readers arrive as [`SdkCallback::ReadersDiscovered`];
    /// discovery runs until cancelled or until the SDK reports
    /// [`SdkCallback::DiscoveryCompleted`].
    ///
    /// # Errors
    ///
    /// Returns an error if the SDK rejects the operation (e.g. busy with
    /// another command).
    fn discover_readers(
        &mut self,
        config: &DiscoveryConfig,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Cancel an in-flight discovery operation.
    ///
    /// The SDK confirms with `DiscoveryCompleted { outcome: Canceled }`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cancel request cannot be issued.
    fn cancel_discovery(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Connect to a previously discovered reader.
    ///
    /// The outcome arrives as `ReaderConnected` or `ConnectFailed`; an `Ok`
    /// return only means the SDK accepted the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the SDK rejects the request outright.
    fn connect_reader(
        &mut self,
        reader_id: &ReaderId,
        config: &ConnectionConfig,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Disconnect the currently connected reader.
    ///
    /// Confirmed by `DisconnectCompleted`.
    ///
    /// # Errors
    ///
    /// Returns an error if the SDK rejects the request.
    fn disconnect_reader(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Create a payment intent for later collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the SDK cannot create the intent.
    fn create_payment_intent(
        &mut self,
        params: &PaymentIntentParams,
    ) -> impl Future<Output = Result<PaymentIntent>> + Send;

    /// Start collecting a payment method for the given intent.
    ///
    /// Progress surfaces as `PaymentStatusChanged`; the terminal outcome is
    /// `PaymentCollected` or `PaymentFailed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the SDK rejects the request.
    fn collect_payment(&mut self, intent: &PaymentIntent) -> impl Future<Output = Result<()>> + Send;

    /// Confirm a payment intent whose payment method was collected.
    ///
    /// Unlike collection, processing completes synchronously from the
    /// bridge's point of view: the SDK returns the processed intent directly.
    ///
    /// # Errors
    ///
    /// Returns an error if processing fails (declines, network failures).
    fn process_payment(
        &mut self,
        intent: &PaymentIntent,
    ) -> impl Future<Output = Result<PaymentIntent>> + Send;

    /// Cancel an in-flight payment collection.
    ///
    /// The SDK confirms with `PaymentFailed` carrying the
    /// [`operation_canceled`](crate::error::codes::OPERATION_CANCELED) code.
    ///
    /// # Errors
    ///
    /// Returns an error if the cancel request cannot be issued.
    fn cancel_collect(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Resume the SDK with the host's answer to a connection token request.
    ///
    /// `Ok(token)` supplies the token; `Err(message)` tells the SDK the fetch
    /// failed.
    ///
    /// # Errors
    ///
    /// Returns an error if the SDK is not waiting for a token or cannot accept
    /// the answer.
    fn submit_connection_token(
        &mut self,
        answer: std::result::Result<String, String>,
    ) -> impl Future<Output = Result<()>> + Send;
}
