//! Delegate callback shapes reported by the terminal SDK.
//!
//! The SDK notifies the bridge of asynchronous events through these values,
//! delivered over the mpsc channel obtained from
//! [`TerminalSdk::take_delegate`](crate::traits::TerminalSdk::take_delegate).
//! The bridge assumes at-least-once delivery of the terminal
//! (success/failure/cancel) callback for every operation it starts.

use crate::error::SdkError;
use tapbridge_core::{PaymentIntent, PaymentStatus, Reader};

/// Terminal outcome of a discovery operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryOutcome {
    /// Discovery ran to completion on its own.
    Completed,

    /// Discovery was cancelled on request.
    Canceled,

    /// Discovery aborted with an SDK failure.
    Failed(SdkError),
}

/// A delegate callback fired by the SDK.
///
/// Callbacks either confirm the outcome of an operation the bridge started
/// (`ReaderConnected`, `ConnectFailed`, `DisconnectCompleted`,
/// `PaymentCollected`, `PaymentFailed`, `DiscoveryCompleted`) or report state
/// observed independently of any command (everything else).
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SdkCallback {
    /// Candidate readers found during discovery.
    ReadersDiscovered { readers: Vec<Reader> },

    /// Discovery reached a terminal state.
    DiscoveryCompleted { outcome: DiscoveryOutcome },

    /// A connect operation was confirmed.
    ReaderConnected { reader: Reader },

    /// A connect operation failed.
    ConnectFailed { error: SdkError },

    /// A solicited disconnect completed.
    DisconnectCompleted,

    /// The reader dropped without a disconnect command; the SDK starts a
    /// recovery attempt.
    UnexpectedDisconnect { reader: Option<Reader> },

    /// Recovery of a dropped connection succeeded.
    ReconnectSucceeded { reader: Option<Reader> },

    /// Recovery of a dropped connection failed or was abandoned.
    ReconnectFailed { reader: Option<Reader> },

    /// Payment collection status changed.
    PaymentStatusChanged { status: PaymentStatus },

    /// Payment collection finished successfully.
    PaymentCollected { intent: PaymentIntent },

    /// Payment collection failed (or was cancelled, see
    /// [`SdkError::is_canceled`]).
    PaymentFailed { error: SdkError },

    /// The SDK needs a connection token from the host.
    ConnectionTokenNeeded,

    /// Reader software update started installing.
    UpdateStarted,

    /// Reader software update progress, `0.0..=1.0`.
    UpdateProgress { progress: f32 },

    /// Reader software update finished installing.
    UpdateFinished,

    /// The reader asked to display a message to the cardholder.
    DisplayMessage { text: String },

    /// The reader is waiting for cardholder input.
    InputRequested { prompt: String },

    /// Diagnostic log line from the SDK.
    Log { message: String },
}
