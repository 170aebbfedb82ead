//! Connection token provisioning.
//!
//! The SDK asks the host for a short-lived connection token whenever it needs
//! to authenticate with backend services. That request/response exchange runs
//! over the otherwise one-directional event channel, so it is modeled as a
//! correlation-id'd pending-request slot: registering a request emits a
//! `connectionTokenRequested` event, and the host answers with
//! `provide_token(correlation_id, ...)`. The slot structurally enforces
//! exactly-once resolution and leaves no dangling state behind.
//!
//! No timeout is imposed here; an unanswered request stays pending until the
//! host answers or the bridge is invalidated.

use chrono::{DateTime, Utc};
use tapbridge_core::{BridgeError, BridgeEvent, CorrelationId, EventKind, Result};

/// An outstanding connection-token fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTokenRequest {
    /// Identifier the host's answer must carry.
    pub correlation_id: CorrelationId,

    /// When the SDK asked, for watchdogs layered on top of the bridge.
    pub created_at: DateTime<Utc>,
}

/// Single-slot registry of pending connection-token requests.
///
/// At most one request may be outstanding; the SDK is not expected to issue
/// overlapping requests, and a second one is rejected rather than allowed to
/// silently orphan the first.
#[derive(Debug, Default)]
pub struct TokenProvider {
    pending: Option<PendingTokenRequest>,
}

impl TokenProvider {
    /// Create an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pending request.
    ///
    /// Returns the `connectionTokenRequested` event to broadcast, carrying a
    /// fresh correlation id.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::ConcurrentTokenRequest` if a request is already
    /// pending; the existing request is left untouched.
    pub fn begin(&mut self) -> Result<BridgeEvent> {
        if self.pending.is_some() {
            return Err(BridgeError::ConcurrentTokenRequest);
        }
        let correlation_id = CorrelationId::new();
        self.pending = Some(PendingTokenRequest {
            correlation_id,
            created_at: Utc::now(),
        });
        Ok(BridgeEvent::new(EventKind::ConnectionTokenRequested {
            correlation_id,
        }))
    }

    /// Resolve the pending request matching `correlation_id`, exactly once.
    ///
    /// On success the slot is cleared and the request returned so the caller
    /// can resume the SDK with the host's answer.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NotFound` if no request is pending or the id does
    /// not match; a mismatched id leaves the pending request undisturbed.
    pub fn resolve(&mut self, correlation_id: CorrelationId) -> Result<PendingTokenRequest> {
        match self.pending.take() {
            Some(request) if request.correlation_id == correlation_id => Ok(request),
            other => {
                self.pending = other;
                Err(BridgeError::not_found(format!(
                    "token request {correlation_id}"
                )))
            }
        }
    }

    /// The currently pending request, if any.
    #[must_use]
    pub fn pending(&self) -> Option<&PendingTokenRequest> {
        self.pending.as_ref()
    }

    /// Drop any pending request without resolving it (bridge teardown).
    pub fn clear(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapbridge_core::EventName;

    #[test]
    fn test_begin_emits_token_requested_event() {
        let mut provider = TokenProvider::new();
        let event = provider.begin().unwrap();
        assert_eq!(event.name(), EventName::ConnectionTokenRequested);
        assert!(provider.pending().is_some());
    }

    #[test]
    fn test_second_request_fails_without_disturbing_first() {
        let mut provider = TokenProvider::new();
        provider.begin().unwrap();
        let first = provider.pending().cloned().unwrap();

        let err = provider.begin().unwrap_err();
        assert_eq!(err, BridgeError::ConcurrentTokenRequest);
        assert_eq!(provider.pending(), Some(&first));
    }

    #[test]
    fn test_resolve_round_trip() {
        let mut provider = TokenProvider::new();
        let event = provider.begin().unwrap();
        let correlation_id = match event.kind {
            EventKind::ConnectionTokenRequested { correlation_id } => correlation_id,
            other => panic!("unexpected event: {other:?}"),
        };

        let request = provider.resolve(correlation_id).unwrap();
        assert_eq!(request.correlation_id, correlation_id);
        assert!(provider.pending().is_none());

        // Exactly once: a second resolve finds nothing.
        assert!(matches!(
            provider.resolve(correlation_id),
            Err(BridgeError::NotFound { .. })
        ));
    }

    #[test]
    fn test_unmatched_correlation_id_leaves_pending_intact() {
        let mut provider = TokenProvider::new();
        provider.begin().unwrap();
        let pending = provider.pending().cloned().unwrap();

        let stranger = CorrelationId::new();
        assert!(matches!(
            provider.resolve(stranger),
            Err(BridgeError::NotFound { .. })
        ));
        assert_eq!(provider.pending(), Some(&pending));

        // The real id still resolves afterwards.
        assert!(provider.resolve(pending.correlation_id).is_ok());
    }

    #[test]
    fn test_clear_drops_pending() {
        let mut provider = TokenProvider::new();
        provider.begin().unwrap();
        provider.clear();
        assert!(provider.pending().is_none());
        // And a new request can begin again.
        assert!(provider.begin().is_ok());
    }
}
