//! State snapshot manager.
//!
//! Owns the single current [`ConnectivityState`]. Updates are serialized by a
//! writer lock; each one builds a new snapshot, swaps it in under a short
//! `RwLock` write, and then broadcasts the changed fields. The snapshot lock
//! is never held while broadcasting, so a subscriber replaying the snapshot
//! from inside a sink set's lock cannot deadlock against an update.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use paircast_core::{ActivationState, ConnectivityState, DeviceSide, SessionFlags, TransportError};

use crate::registry::StateStreams;

/// Owner of the connectivity snapshot.
pub struct StateManager {
    side: DeviceSide,
    snapshot: RwLock<Arc<ConnectivityState>>,
    writer: Mutex<()>,
    streams: Arc<StateStreams>,
}

impl StateManager {
    /// Create a manager holding the initial snapshot. The wearable side is
    /// paired from the start.
    pub fn new(side: DeviceSide, streams: Arc<StateStreams>) -> Self {
        let initial = if side.tracks_pairing() {
            ConnectivityState::initial()
        } else {
            ConnectivityState::initial().with_companion_state(false, true)
        };
        Self {
            side,
            snapshot: RwLock::new(Arc::new(initial)),
            writer: Mutex::new(()),
            streams,
        }
    }

    /// Side of the pairing this manager tracks.
    pub fn side(&self) -> DeviceSide {
        self.side
    }

    /// The latest snapshot.
    pub fn snapshot(&self) -> Arc<ConnectivityState> {
        Arc::clone(&self.snapshot.read())
    }

    /// Latest activation state.
    pub fn activation_state(&self) -> Option<ActivationState> {
        self.snapshot.read().activation_state()
    }

    /// Latest activation error.
    pub fn activation_error(&self) -> Option<TransportError> {
        self.snapshot.read().activation_error().cloned()
    }

    /// Latest reachability.
    pub fn is_reachable(&self) -> bool {
        self.snapshot.read().is_reachable()
    }

    /// Latest companion-app install flag.
    pub fn is_paired_app_installed(&self) -> bool {
        self.snapshot.read().is_paired_app_installed()
    }

    /// Latest paired flag.
    pub fn is_paired(&self) -> bool {
        self.snapshot.read().is_paired()
    }

    /// Apply an activation event.
    ///
    /// `flags` must be read from the session when the event arrives: the
    /// transport does not fire separate reachability or install events for
    /// the first activation.
    pub fn handle_activation(
        &self,
        flags: SessionFlags,
        activation_state: ActivationState,
        error: Option<TransportError>,
    ) {
        let _writer = self.writer.lock();

        let activation_state = if activation_state == ActivationState::Activated && error.is_some() {
            warn!(?error, "activation reported both success and an error, treating as not activated");
            ActivationState::NotActivated
        } else {
            activation_state
        };
        let flags = SessionFlags {
            is_paired: flags.is_paired || !self.side.tracks_pairing(),
            ..flags
        };

        let next = self.replace(ConnectivityState::activated(activation_state, error, flags));
        debug!(
            state = %activation_state,
            reachable = next.is_reachable(),
            installed = next.is_paired_app_installed(),
            paired = next.is_paired(),
            "activation applied"
        );

        let _ = self.streams.activation_state.broadcast(&activation_state);
        if let Some(result) = next.activation_result() {
            let _ = self.streams.activation_result.broadcast(&result);
        }
        let _ = self.streams.reachability.broadcast(&next.is_reachable());
        let _ = self
            .streams
            .companion_install
            .broadcast(&next.is_paired_app_installed());
        if self.side.tracks_pairing() {
            let _ = self.streams.paired.broadcast(&next.is_paired());
        }
    }

    /// Replace only the reachability flag.
    pub fn update_reachability(&self, is_reachable: bool) {
        let _writer = self.writer.lock();
        let next = self.replace(self.snapshot().with_reachability(is_reachable));
        debug!(reachable = is_reachable, "reachability applied");
        let _ = self.streams.reachability.broadcast(&next.is_reachable());
    }

    /// Replace only the companion install and paired flags. The paired flag
    /// stays `true` on the wearable side.
    pub fn update_companion_state(&self, is_paired_app_installed: bool, is_paired: bool) {
        let _writer = self.writer.lock();
        let is_paired = is_paired || !self.side.tracks_pairing();
        let next = self.replace(
            self.snapshot()
                .with_companion_state(is_paired_app_installed, is_paired),
        );
        debug!(
            installed = is_paired_app_installed,
            paired = is_paired,
            "companion state applied"
        );
        let _ = self
            .streams
            .companion_install
            .broadcast(&next.is_paired_app_installed());
        if self.side.tracks_pairing() {
            let _ = self.streams.paired.broadcast(&next.is_paired());
        }
    }

    fn replace(&self, next: ConnectivityState) -> Arc<ConnectivityState> {
        let next = Arc::new(next);
        *self.snapshot.write() = Arc::clone(&next);
        next
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
