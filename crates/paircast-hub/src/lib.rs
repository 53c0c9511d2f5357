//! # paircast-hub
//!
//! Concurrent broadcast and transport-selection hub between one paired-device
//! session and any number of independent consumers.
//!
//! ## Components
//!
//! - [`registry`]: per-kind sink sets with ordered, lock-scoped broadcast
//! - [`subscription`]: cancellable consumer streams with per-kind replay
//! - [`state`]: the atomically replaced connectivity snapshot
//! - [`router`]: interactive, queued or failed delivery selection
//! - [`distributor`]: raw and typed fan-out of incoming payloads
//! - [`observer`]: the façade owning all of the above and driving the session
//! - [`network`]: a small network-path observer
//! - [`testing`]: in-memory session and path monitor
//!
//! ## Crate Position
//!
//! Top of the stack. Depends on `paircast-core` and `paircast-settings`.

#![deny(unsafe_code)]

pub mod distributor;
pub mod network;
pub mod observer;
pub mod registry;
pub mod router;
pub mod state;
pub mod subscription;
pub mod testing;

pub use network::{NetworkObserver, PathMonitor, PathStatus};
pub use observer::{LifecyclePhase, Observer};
pub use registry::{StreamKind, SubscriptionRegistry};
pub use router::{Route, select_route};
pub use subscription::Subscription;

/// Install the stderr `tracing` subscriber at the configured level.
/// `RUST_LOG` still takes precedence.
pub fn init_logging(settings: &paircast_settings::HubSettings) {
    paircast_core::logging::init_subscriber(&settings.logging.level);
}
