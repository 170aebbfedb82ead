//! SDK seam for the tapbridge terminal bridge.
//!
//! This crate defines the contract the bridge expects from the opaque
//! payment-terminal SDK: a set of async operations ([`TerminalSdk`]) plus a
//! delegate callback stream ([`SdkCallback`]) the SDK fires events into. It
//! also ships a scriptable [`MockTerminal`] so the bridge can be developed and
//! tested without a vendor SDK or physical reader.
//!
//! # Design
//!
//! The vendor SDK's inversion-of-control delegate dispatch maps here to an
//! mpsc channel created alongside the SDK handle: the bridge claims the
//! receiver once with [`TerminalSdk::take_delegate`] and drains it from a
//! single coordination task. Operations are accepted immediately; outcomes
//! always arrive as callbacks, matching the at-least-once terminal-callback
//! contract the bridge relies on.

pub mod callback;
pub mod error;
pub mod mock;
pub mod traits;

pub use callback::{DiscoveryOutcome, SdkCallback};
pub use error::{Result, SdkError, codes};
pub use mock::{MockTerminal, MockTerminalHandle};
pub use traits::TerminalSdk;
