//! Error types for bridge operations.
//!
//! This module defines the error surface shared by every bridge component.
//! Errors returned from a command always go back to that command's caller;
//! failures observed asynchronously (a reader dropping mid-session) are
//! surfaced as events, never as errors on unrelated code paths.

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors that can occur while driving the terminal bridge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// Command is not valid in the current session state.
    #[error("Command '{command}' not valid in state {current}")]
    InvalidState { current: String, command: String },

    /// Unknown reader id or correlation id.
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// A connection token request is already pending.
    #[error("A connection token request is already pending")]
    ConcurrentTokenRequest,

    /// The bridge has been invalidated by the host and accepts no commands.
    #[error("Bridge has been invalidated")]
    BridgeInvalidated,

    /// A command argument failed validation before reaching the SDK.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Opaque failure surfaced verbatim from the terminal SDK.
    #[error("SDK error [{code}]: {message}")]
    Sdk { code: String, message: String },

    /// The session task is gone and cannot accept commands.
    #[error("Session channel closed")]
    ChannelClosed,
}

impl BridgeError {
    /// Create a new invalid state error.
    pub fn invalid_state(current: impl ToString, command: impl Into<String>) -> Self {
        Self::InvalidState {
            current: current.to_string(),
            command: command.into(),
        }
    }

    /// Create a new not found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Wrap an SDK failure with a stable code and message.
    pub fn sdk(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Sdk {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_state_error() {
        let error = BridgeError::invalid_state("Connecting", "connect");
        assert!(matches!(error, BridgeError::InvalidState { .. }));
        assert_eq!(
            error.to_string(),
            "Command 'connect' not valid in state Connecting"
        );
    }

    #[test]
    fn test_not_found_error() {
        let error = BridgeError::not_found("reader R9");
        assert_eq!(error.to_string(), "Not found: reader R9");
    }

    #[test]
    fn test_sdk_error() {
        let error = BridgeError::sdk("bluetooth_unavailable", "Bluetooth is powered off");
        assert!(matches!(error, BridgeError::Sdk { .. }));
        assert_eq!(
            error.to_string(),
            "SDK error [bluetooth_unavailable]: Bluetooth is powered off"
        );
    }

    #[test]
    fn test_error_display() {
        let errors = vec![
            BridgeError::ConcurrentTokenRequest,
            BridgeError::BridgeInvalidated,
            BridgeError::ChannelClosed,
        ];

        for error in errors {
            let _ = format!("{}", error);
            let _ = format!("{:?}", error);
        }
    }
}
