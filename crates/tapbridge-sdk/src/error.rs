//! Error type for SDK operations.
//!
//! The terminal SDK is an opaque external collaborator; its failures are
//! carried verbatim as a stable code plus message and wrapped into
//! `BridgeError::Sdk` at the bridge boundary.

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, SdkError>;

/// Stable SDK failure codes the bridge gives special treatment.
pub mod codes {
    /// The in-flight operation was cancelled on request; not an error for
    /// payment collection.
    pub const OPERATION_CANCELED: &str = "operation_canceled";

    /// The SDK is busy with another command.
    pub const READER_BUSY: &str = "reader_busy";

    /// No reader is connected.
    pub const NOT_CONNECTED: &str = "not_connected";

    /// The delegate channel was dropped; callbacks can no longer be delivered.
    pub const DELEGATE_GONE: &str = "delegate_channel_closed";
}

/// An opaque failure reported by the terminal SDK.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct SdkError {
    /// Stable machine-readable code.
    pub code: String,

    /// Human-readable description, surfaced verbatim.
    pub message: String,
}

impl SdkError {
    /// Create a new SDK error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether this failure reports a cancelled operation.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.code == codes::OPERATION_CANCELED
    }
}

impl From<SdkError> for tapbridge_core::BridgeError {
    fn from(error: SdkError) -> Self {
        tapbridge_core::BridgeError::Sdk {
            code: error.code,
            message: error.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sdk_error_display() {
        let error = SdkError::new(codes::READER_BUSY, "SDK is busy with: discoverReaders");
        assert_eq!(
            error.to_string(),
            "[reader_busy] SDK is busy with: discoverReaders"
        );
    }

    #[test]
    fn test_is_canceled() {
        assert!(SdkError::new(codes::OPERATION_CANCELED, "The command was canceled").is_canceled());
        assert!(!SdkError::new(codes::NOT_CONNECTED, "No reader connected").is_canceled());
    }
}
