//! Delegate-callback to named-event translation.
//!
//! A stateless, total mapping from SDK callbacks to the event surface hosts
//! subscribe to. Translation never fails: malformed or partially-populated
//! callbacks are normalized to a best-effort payload with a populated
//! `warning` field rather than dropped, because losing a lifecycle event is
//! worse than delivering a partially-filled one.
//!
//! Callbacks that confirm the outcome of a command the session started
//! (connect/disconnect/collect terminals, discovery completion, token needs)
//! translate to `None`: their result is returned to the command's caller, not
//! broadcast as an event.

use tapbridge_core::{BridgeEvent, EventKind, UpdatePhase};
use tapbridge_sdk::SdkCallback;

/// Translate one delegate callback into the event it surfaces as, if any.
pub fn translate(callback: &SdkCallback) -> Option<BridgeEvent> {
    match callback {
        SdkCallback::ReadersDiscovered { readers } => Some(BridgeEvent::new(
            EventKind::DiscoveryUpdated {
                readers: readers.clone(),
            },
        )),

        SdkCallback::ReaderConnected { reader } => Some(BridgeEvent::new(
            EventKind::ReaderConnected {
                reader: reader.clone(),
            },
        )),

        SdkCallback::DisconnectCompleted => Some(BridgeEvent::new(
            EventKind::ReaderDisconnected { reader_id: None },
        )),

        SdkCallback::ReconnectSucceeded { reader } => {
            let kind = EventKind::ReaderReconnectSucceeded {
                reader: reader.clone(),
            };
            Some(match reader {
                Some(_) => BridgeEvent::new(kind),
                None => {
                    BridgeEvent::with_warning(kind, "reconnect notice carried no reader details")
                }
            })
        }

        SdkCallback::ReconnectFailed { reader } => {
            let kind = EventKind::UnexpectedReaderDisconnect {
                reader: reader.clone(),
            };
            Some(match reader {
                Some(_) => BridgeEvent::new(kind),
                None => {
                    BridgeEvent::with_warning(kind, "disconnect notice carried no reader details")
                }
            })
        }

        SdkCallback::PaymentStatusChanged { status } => Some(BridgeEvent::new(
            EventKind::PaymentStatusChanged { status: *status },
        )),

        SdkCallback::UpdateStarted => Some(BridgeEvent::new(EventKind::ReaderSoftwareUpdate {
            phase: UpdatePhase::Started,
            progress: None,
        })),

        SdkCallback::UpdateProgress { progress } => {
            let kind = EventKind::ReaderSoftwareUpdate {
                phase: UpdatePhase::Progress,
                progress: Some(progress.clamp(0.0, 1.0)),
            };
            Some(if (0.0..=1.0).contains(progress) {
                BridgeEvent::new(kind)
            } else {
                BridgeEvent::with_warning(
                    kind,
                    format!("update progress {progress} outside 0.0..=1.0, clamped"),
                )
            })
        }

        SdkCallback::UpdateFinished => Some(BridgeEvent::new(EventKind::ReaderSoftwareUpdate {
            phase: UpdatePhase::Finished,
            progress: None,
        })),

        SdkCallback::DisplayMessage { text } => {
            let kind = EventKind::ReaderDisplayMessage { text: text.clone() };
            Some(if text.is_empty() {
                BridgeEvent::with_warning(kind, "display message callback carried empty text")
            } else {
                BridgeEvent::new(kind)
            })
        }

        SdkCallback::InputRequested { prompt } => {
            let kind = EventKind::ReaderInputRequested {
                prompt: prompt.clone(),
            };
            Some(if prompt.is_empty() {
                BridgeEvent::with_warning(kind, "input request callback carried empty prompt")
            } else {
                BridgeEvent::new(kind)
            })
        }

        SdkCallback::Log { message } => Some(BridgeEvent::new(EventKind::Log {
            message: message.clone(),
        })),

        // Command-confirming callbacks resolve the suspended command instead
        // of surfacing as events. ConnectionTokenNeeded is turned into an
        // event by the token provider, which owns the correlation id.
        SdkCallback::DiscoveryCompleted { .. }
        | SdkCallback::ConnectFailed { .. }
        | SdkCallback::UnexpectedDisconnect { .. }
        | SdkCallback::PaymentCollected { .. }
        | SdkCallback::PaymentFailed { .. }
        | SdkCallback::ConnectionTokenNeeded => None,

        // SdkCallback is non_exhaustive; unknown future callbacks surface as
        // warning-annotated log events rather than vanishing.
        other => Some(BridgeEvent::with_warning(
            EventKind::Log {
                message: format!("unrecognized SDK callback: {other:?}"),
            },
            "callback shape unknown to this bridge version",
        )),
    }
}
