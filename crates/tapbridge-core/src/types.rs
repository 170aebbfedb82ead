//! Core domain types for the terminal bridge.
//!
//! Defines the session state machine states, reader identity and metadata,
//! command configuration types, and the payment intent model shared by the
//! SDK seam and the bridge itself.

use crate::{Result, error::BridgeError};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Default currency applied when a payment intent omits one.
pub const DEFAULT_CURRENCY: &str = "usd";

/// Reader serial number / identifier.
///
/// Normalized (trimmed) and validated to be non-empty ASCII on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReaderId(String);

impl ReaderId {
    /// Create a new reader id with validation.
    ///
    /// The id is trimmed before validation.
    ///
    /// # Errors
    /// Returns `BridgeError::InvalidArgument` if the id is empty or contains
    /// non-ASCII characters.
    pub fn new(id: &str) -> Result<Self> {
        let id = id.trim();
        if id.is_empty() {
            return Err(BridgeError::invalid_argument("Reader id cannot be empty"));
        }
        if !id.is_ascii() {
            return Err(BridgeError::invalid_argument(format!(
                "Reader id must be ASCII, got '{id}'"
            )));
        }
        Ok(ReaderId(id.to_string()))
    }

    /// Get the raw id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ReaderId {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        ReaderId::new(s)
    }
}

/// A payment reader discovered by (or connected through) the SDK.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reader {
    /// Reader serial number.
    pub id: ReaderId,

    /// Human-readable label, if the SDK reported one.
    pub label: Option<String>,

    /// Location the reader is registered to, if any.
    pub location_id: Option<String>,

    /// Whether this is a simulated reader.
    pub simulated: bool,

    /// Battery level in `0.0..=1.0`, if the reader reports one.
    pub battery_level: Option<f32>,
}

impl Reader {
    /// Create a reader with just an id; remaining fields default to empty.
    pub fn new(id: ReaderId) -> Self {
        Self {
            id,
            label: None,
            location_id: None,
            simulated: false,
            battery_level: None,
        }
    }

    /// Create a simulated reader with the given id and label.
    pub fn simulated(id: ReaderId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: Some(label.into()),
            location_id: None,
            simulated: true,
            battery_level: None,
        }
    }
}

/// Connection lifecycle state of the session.
///
/// Transitions happen only in response to confirmed SDK callbacks or a
/// resolved `connect`/`disconnect` command, never optimistically on command
/// issuance. Validity of a transition is checked with
/// [`can_transition_to`](ConnectionState::can_transition_to).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No reader connected.
    NotConnected,

    /// A connect command has been accepted by the SDK; awaiting confirmation.
    Connecting,

    /// A reader is connected and usable.
    Connected,

    /// The reader dropped unexpectedly; the SDK is attempting recovery.
    Reconnecting,
}

impl ConnectionState {
    /// Check if transition to target state is valid from this state.
    ///
    /// # Examples
    ///
    /// ```
    /// use tapbridge_core::ConnectionState;
    ///
    /// assert!(ConnectionState::NotConnected.can_transition_to(ConnectionState::Connecting));
    /// assert!(!ConnectionState::NotConnected.can_transition_to(ConnectionState::Connected));
    /// ```
    pub fn can_transition_to(self, target: ConnectionState) -> bool {
        matches!(
            (self, target),
            // From NotConnected
            (ConnectionState::NotConnected, ConnectionState::Connecting)
            // From Connecting
            | (ConnectionState::Connecting, ConnectionState::Connected | ConnectionState::NotConnected)
            // From Connected
            | (ConnectionState::Connected, ConnectionState::Reconnecting | ConnectionState::NotConnected)
            // From Reconnecting
            | (ConnectionState::Reconnecting, ConnectionState::Connected | ConnectionState::NotConnected)
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::NotConnected => "NotConnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Reconnecting => "Reconnecting",
        };
        write!(f, "{s}")
    }
}

/// Discovery sub-state, orthogonal to [`ConnectionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryState {
    /// No discovery in progress.
    Idle,

    /// The SDK is actively enumerating readers.
    Discovering,
}

impl fmt::Display for DiscoveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiscoveryState::Idle => "Idle",
            DiscoveryState::Discovering => "Discovering",
        };
        write!(f, "{s}")
    }
}

/// How readers should be discovered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    /// Scan for nearby Bluetooth readers.
    #[default]
    BluetoothScan,

    /// Connect to the closest Bluetooth reader only.
    BluetoothProximity,

    /// Enumerate internet-connected (smart) readers.
    Internet,
}

/// Configuration for a discovery operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Discovery transport.
    pub method: DiscoveryMethod,

    /// Discover simulated readers instead of physical ones.
    pub simulated: bool,
}

impl DiscoveryConfig {
    /// Configuration for simulated discovery (development and tests).
    pub fn simulated() -> Self {
        Self {
            method: DiscoveryMethod::BluetoothScan,
            simulated: true,
        }
    }
}

/// Configuration for connecting to a discovered reader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Location to register the reader to.
    pub location_id: Option<String>,

    /// Fail the connect instead of stealing the reader from another client.
    pub fail_if_in_use: bool,
}

/// Parameters for creating a payment intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntentParams {
    /// Amount in the smallest currency unit (e.g. cents).
    pub amount: u64,

    /// ISO currency code; defaults to [`DEFAULT_CURRENCY`] when omitted.
    pub currency: Option<String>,
}

impl PaymentIntentParams {
    /// Create parameters with validation.
    ///
    /// # Errors
    /// Returns `BridgeError::InvalidArgument` if the amount is zero.
    pub fn new(amount: u64, currency: Option<String>) -> Result<Self> {
        if amount == 0 {
            return Err(BridgeError::invalid_argument(
                "You must provide a non-zero amount to create a payment intent",
            ));
        }
        Ok(Self { amount, currency })
    }

    /// The currency to charge in, falling back to [`DEFAULT_CURRENCY`].
    #[must_use]
    pub fn currency_or_default(&self) -> &str {
        self.currency.as_deref().unwrap_or(DEFAULT_CURRENCY)
    }
}

/// A payment intent created through the SDK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// SDK-assigned intent identifier.
    pub id: String,

    /// Amount in the smallest currency unit.
    pub amount: u64,

    /// ISO currency code.
    pub currency: String,
}

/// Payment collection status reported by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// No reader connected or reader busy.
    NotReady,

    /// Reader is ready to collect.
    Ready,

    /// Waiting for the cardholder to present a payment method.
    WaitingForInput,

    /// Payment method collected; processing.
    Processing,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::NotReady => "NotReady",
            PaymentStatus::Ready => "Ready",
            PaymentStatus::WaitingForInput => "WaitingForInput",
            PaymentStatus::Processing => "Processing",
        };
        write!(f, "{s}")
    }
}

/// Opaque identifier pairing an asynchronous token request with its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate a fresh correlation id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies an in-flight cancellable SDK operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationToken(Uuid);

impl OperationToken {
    /// Generate a fresh operation token.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OperationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_id_validation() {
        assert!(ReaderId::new("R1").is_ok());
        assert!(ReaderId::new("  SIM-001  ").is_ok());
        assert!(ReaderId::new("").is_err());
        assert!(ReaderId::new("   ").is_err());
        assert!(ReaderId::new("lecteur-é").is_err());
    }

    #[test]
    fn test_reader_id_normalizes_whitespace() {
        let id = ReaderId::new("  R1  ").unwrap();
        assert_eq!(id.as_str(), "R1");
        assert_eq!(id.to_string(), "R1");
    }

    #[test]
    fn test_reader_id_from_str() {
        let id: ReaderId = "R2".parse().unwrap();
        assert_eq!(id.as_str(), "R2");
        assert!("".parse::<ReaderId>().is_err());
    }

    #[test]
    fn test_connection_state_transitions() {
        use ConnectionState::*;

        assert!(NotConnected.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(Connected));
        assert!(Connecting.can_transition_to(NotConnected));
        assert!(Connected.can_transition_to(Reconnecting));
        assert!(Connected.can_transition_to(NotConnected));
        assert!(Reconnecting.can_transition_to(Connected));
        assert!(Reconnecting.can_transition_to(NotConnected));

        // No optimistic jumps
        assert!(!NotConnected.can_transition_to(Connected));
        assert!(!NotConnected.can_transition_to(Reconnecting));
        assert!(!Connecting.can_transition_to(Reconnecting));
        assert!(!Reconnecting.can_transition_to(Connecting));
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::NotConnected.to_string(), "NotConnected");
        assert_eq!(ConnectionState::Reconnecting.to_string(), "Reconnecting");
    }

    #[test]
    fn test_payment_intent_params_validation() {
        assert!(PaymentIntentParams::new(0, None).is_err());

        let params = PaymentIntentParams::new(1250, None).unwrap();
        assert_eq!(params.currency_or_default(), "usd");

        let params = PaymentIntentParams::new(1250, Some("brl".to_string())).unwrap();
        assert_eq!(params.currency_or_default(), "brl");
    }

    #[test]
    fn test_correlation_id_uniqueness() {
        let a = CorrelationId::new();
        let b = CorrelationId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_reader_simulated_constructor() {
        let reader = Reader::simulated(ReaderId::new("SIM-1").unwrap(), "Front desk");
        assert!(reader.simulated);
        assert_eq!(reader.label.as_deref(), Some("Front desk"));
        assert!(reader.location_id.is_none());
    }

    #[test]
    fn test_connection_state_serde_snake_case() {
        let json = serde_json::to_string(&ConnectionState::NotConnected).unwrap();
        assert_eq!(json, "\"not_connected\"");
    }
}
