//! Shared types for the tapbridge terminal bridge.
//!
//! This crate holds everything both sides of the bridge agree on: the session
//! state machine states, the reader and payment models, the named event
//! surface delivered to listeners, and the error types commands resolve with.
//! It contains no async code; the SDK seam lives in `tapbridge-sdk` and the
//! bridge logic in `tapbridge`.

pub mod error;
pub mod events;
pub mod types;

pub use error::{BridgeError, Result};
pub use events::{BridgeEvent, EventKind, EventName, UpdatePhase};
pub use types::{
    ConnectionConfig, ConnectionState, CorrelationId, DEFAULT_CURRENCY, DiscoveryConfig,
    DiscoveryMethod, DiscoveryState, OperationToken, PaymentIntent, PaymentIntentParams,
    PaymentStatus, Reader, ReaderId,
};

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
