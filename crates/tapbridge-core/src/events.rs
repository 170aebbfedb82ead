//! The named event model delivered to bridge listeners.
//!
//! Every event is an immutable `(name, payload)` pair. Payloads are typed
//! ([`EventKind`]) but can be rendered to JSON for hosts that consume events
//! generically. Events produced by normalizing a malformed delegate callback
//! carry a populated `warning` instead of being dropped.

use crate::error::BridgeError;
use crate::types::{CorrelationId, PaymentStatus, Reader, ReaderId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Stable wire names for every event the bridge can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventName {
    /// The set of discovered readers changed.
    DiscoveryUpdated,

    /// A reader connection was confirmed.
    ReaderConnected,

    /// A reader was disconnected (solicited).
    ReaderDisconnected,

    /// Connectivity was lost and recovery failed or was abandoned.
    UnexpectedReaderDisconnect,

    /// Connectivity was lost but the SDK recovered the connection.
    ReaderReconnectSucceeded,

    /// The SDK needs a connection token from the host.
    ConnectionTokenRequested,

    /// Payment collection status changed.
    PaymentStatusChanged,

    /// Reader firmware/software update progress.
    ReaderSoftwareUpdate,

    /// The reader asked to show a message to the cardholder.
    ReaderDisplayMessage,

    /// The reader is waiting for cardholder input.
    ReaderInputRequested,

    /// Diagnostic log line from the SDK.
    Log,
}

impl EventName {
    /// The wire name of this event, as subscribed to by hosts.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::DiscoveryUpdated => "discoveryUpdated",
            EventName::ReaderConnected => "readerConnected",
            EventName::ReaderDisconnected => "readerDisconnected",
            EventName::UnexpectedReaderDisconnect => "unexpectedReaderDisconnect",
            EventName::ReaderReconnectSucceeded => "readerReconnectSucceeded",
            EventName::ConnectionTokenRequested => "connectionTokenRequested",
            EventName::PaymentStatusChanged => "paymentStatusChanged",
            EventName::ReaderSoftwareUpdate => "readerSoftwareUpdate",
            EventName::ReaderDisplayMessage => "readerDisplayMessage",
            EventName::ReaderInputRequested => "readerInputRequested",
            EventName::Log => "log",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EventName {
    type Err = BridgeError;

    /// Parse a wire name back into an event name, for hosts that subscribe
    /// by string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discoveryUpdated" => Ok(EventName::DiscoveryUpdated),
            "readerConnected" => Ok(EventName::ReaderConnected),
            "readerDisconnected" => Ok(EventName::ReaderDisconnected),
            "unexpectedReaderDisconnect" => Ok(EventName::UnexpectedReaderDisconnect),
            "readerReconnectSucceeded" => Ok(EventName::ReaderReconnectSucceeded),
            "connectionTokenRequested" => Ok(EventName::ConnectionTokenRequested),
            "paymentStatusChanged" => Ok(EventName::PaymentStatusChanged),
            "readerSoftwareUpdate" => Ok(EventName::ReaderSoftwareUpdate),
            "readerDisplayMessage" => Ok(EventName::ReaderDisplayMessage),
            "readerInputRequested" => Ok(EventName::ReaderInputRequested),
            "log" => Ok(EventName::Log),
            other => Err(BridgeError::invalid_argument(format!(
                "Unknown event name '{other}'"
            ))),
        }
    }
}

/// Phase of a reader software update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePhase {
    /// Update installation started.
    Started,

    /// Installation progress report.
    Progress,

    /// Installation finished.
    Finished,
}

/// Typed payload for each event name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
#[non_exhaustive]
pub enum EventKind {
    /// Current set of discovered readers.
    DiscoveryUpdated { readers: Vec<Reader> },

    /// A reader connection was confirmed by the SDK.
    ReaderConnected { reader: Reader },

    /// A solicited disconnect completed.
    ReaderDisconnected { reader_id: Option<ReaderId> },

    /// Connectivity was lost for good; the session is back to not-connected.
    UnexpectedReaderDisconnect { reader: Option<Reader> },

    /// The SDK recovered a dropped connection.
    ReaderReconnectSucceeded { reader: Option<Reader> },

    /// The SDK needs a connection token; answer with `provide_token`.
    ConnectionTokenRequested { correlation_id: CorrelationId },

    /// Payment collection status update.
    PaymentStatusChanged { status: PaymentStatus },

    /// Reader software update progress.
    ReaderSoftwareUpdate {
        phase: UpdatePhase,
        /// Completion in `0.0..=1.0` for `Progress`, absent otherwise.
        progress: Option<f32>,
    },

    /// Message the reader wants shown to the cardholder.
    ReaderDisplayMessage { text: String },

    /// Input prompt the reader is waiting on.
    ReaderInputRequested { prompt: String },

    /// Diagnostic log line.
    Log { message: String },
}

impl EventKind {
    /// The event name this payload is delivered under.
    #[must_use]
    pub fn name(&self) -> EventName {
        match self {
            EventKind::DiscoveryUpdated { .. } => EventName::DiscoveryUpdated,
            EventKind::ReaderConnected { .. } => EventName::ReaderConnected,
            EventKind::ReaderDisconnected { .. } => EventName::ReaderDisconnected,
            EventKind::UnexpectedReaderDisconnect { .. } => EventName::UnexpectedReaderDisconnect,
            EventKind::ReaderReconnectSucceeded { .. } => EventName::ReaderReconnectSucceeded,
            EventKind::ConnectionTokenRequested { .. } => EventName::ConnectionTokenRequested,
            EventKind::PaymentStatusChanged { .. } => EventName::PaymentStatusChanged,
            EventKind::ReaderSoftwareUpdate { .. } => EventName::ReaderSoftwareUpdate,
            EventKind::ReaderDisplayMessage { .. } => EventName::ReaderDisplayMessage,
            EventKind::ReaderInputRequested { .. } => EventName::ReaderInputRequested,
            EventKind::Log { .. } => EventName::Log,
        }
    }
}

/// An event as delivered to listeners.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeEvent {
    /// Typed payload.
    #[serde(flatten)]
    pub kind: EventKind,

    /// Set when the source callback was malformed and the payload is
    /// best-effort rather than complete.
    pub warning: Option<String>,

    /// When the event was translated.
    pub at: DateTime<Utc>,
}

impl BridgeEvent {
    /// Wrap a payload into an event with no warning.
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            warning: None,
            at: Utc::now(),
        }
    }

    /// Wrap a best-effort payload along with a normalization warning.
    #[must_use]
    pub fn with_warning(kind: EventKind, warning: impl Into<String>) -> Self {
        Self {
            kind,
            warning: Some(warning.into()),
            at: Utc::now(),
        }
    }

    /// The name this event is delivered under.
    #[must_use]
    pub fn name(&self) -> EventName {
        self.kind.name()
    }

    /// Render the event payload as JSON for generic consumers.
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReaderId;

    #[test]
    fn test_event_names_are_stable() {
        assert_eq!(EventName::DiscoveryUpdated.as_str(), "discoveryUpdated");
        assert_eq!(
            EventName::UnexpectedReaderDisconnect.as_str(),
            "unexpectedReaderDisconnect"
        );
        assert_eq!(
            EventName::ConnectionTokenRequested.as_str(),
            "connectionTokenRequested"
        );
        assert_eq!(EventName::Log.as_str(), "log");
    }

    #[test]
    fn test_event_name_round_trips_through_wire_name() {
        let name: EventName = "readerSoftwareUpdate".parse().unwrap();
        assert_eq!(name, EventName::ReaderSoftwareUpdate);
        assert!("readersDiscovered".parse::<EventName>().is_err());
    }

    #[test]
    fn test_kind_maps_to_name() {
        let kind = EventKind::PaymentStatusChanged {
            status: PaymentStatus::Processing,
        };
        assert_eq!(kind.name(), EventName::PaymentStatusChanged);

        let kind = EventKind::ReaderDisconnected { reader_id: None };
        assert_eq!(kind.name(), EventName::ReaderDisconnected);
    }

    #[test]
    fn test_event_payload_includes_warning() {
        let event = BridgeEvent::with_warning(
            EventKind::UnexpectedReaderDisconnect { reader: None },
            "disconnect notice carried no reader details",
        );
        let payload = event.payload();
        assert_eq!(
            payload["warning"],
            "disconnect notice carried no reader details"
        );
        assert_eq!(payload["event"], "unexpectedReaderDisconnect");
    }

    #[test]
    fn test_event_payload_serializes_reader() {
        let reader = Reader::simulated(ReaderId::new("SIM-1").unwrap(), "Front desk");
        let event = BridgeEvent::new(EventKind::ReaderConnected { reader });
        let payload = event.payload();
        assert_eq!(payload["reader"]["id"], "SIM-1");
        assert_eq!(payload["reader"]["simulated"], true);
        assert!(payload["warning"].is_null());
    }
}
