//! Host-facing bridge over an embedded payment terminal SDK.
//!
//! The SDK underneath is callback-driven and stateful; this crate wraps it in
//! a small async surface:
//!
//! - [`Bridge`]: clonable handle whose methods resolve when the SDK confirms
//!   the outcome, not when it merely accepts the command.
//! - [`Subscription`] streams: named lifecycle events (`discoveryUpdated`,
//!   `readerConnected`, `unexpectedReaderDisconnect`, ...) fanned out to
//!   registered listeners in emission order.
//! - Connection token provisioning: the SDK's token requests surface as
//!   `connectionTokenRequested` events carrying a correlation id, answered
//!   via [`Bridge::provide_token`].
//!
//! All SDK state lives in one session task; `Bridge` handles from any number
//! of tasks are serialized through it, so observed connection state is always
//! one the session actually passed through.
//!
//! ```
//! use tapbridge::Bridge;
//! use tapbridge_core::{ConnectionConfig, DiscoveryConfig, EventKind, EventName};
//! use tapbridge_sdk::MockTerminal;
//! use tapbridge_core::{Reader, ReaderId};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> tapbridge_core::Result<()> {
//!     let (sdk, control) = MockTerminal::new();
//!     let (bridge, _session) = Bridge::start(sdk)?;
//!
//!     let reader_id = ReaderId::new("SIM-1")?;
//!     control
//!         .add_simulated_reader(Reader::simulated(reader_id.clone(), "Front desk"))
//!         .await;
//!
//!     let mut discoveries = bridge.subscribe(EventName::DiscoveryUpdated).await?;
//!     bridge.discover(DiscoveryConfig::simulated()).await?;
//!
//!     if let Some(event) = discoveries.recv().await {
//!         if let EventKind::DiscoveryUpdated { readers } = &event.kind {
//!             assert_eq!(readers[0].id, reader_id);
//!         }
//!     }
//!
//!     let reader = bridge.connect(reader_id, ConnectionConfig::default()).await?;
//!     assert!(reader.simulated);
//!
//!     bridge.invalidate().await?;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod registry;
pub mod session;
pub mod token;
pub mod translate;

pub use bridge::Bridge;
pub use registry::{Subscription, SubscriptionId};
pub use session::SessionSnapshot;
pub use token::{PendingTokenRequest, TokenProvider};
pub use translate::translate;

pub use tapbridge_core as core;
pub use tapbridge_sdk as sdk;
