//! Network path observer.
//!
//! A much simpler sibling of the session hub: it wraps a platform
//! [`PathMonitor`], remembers the latest [`PathStatus`] and replays it to new
//! subscribers. The monitor is cancelled when the observer is dropped.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::registry::{SinkSet, StreamKind};
use crate::subscription::Subscription;

/// Availability of the device's network path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathStatus {
    /// A usable path exists.
    Satisfied,
    /// No usable path.
    Unsatisfied,
    /// A path exists once a connection is established (e.g. on demand VPN).
    RequiresConnection,
}

impl PathStatus {
    /// Whether traffic can flow right now.
    pub fn is_connected(self) -> bool {
        self == Self::Satisfied
    }
}

impl fmt::Display for PathStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Satisfied => write!(f, "satisfied"),
            Self::Unsatisfied => write!(f, "unsatisfied"),
            Self::RequiresConnection => write!(f, "requires_connection"),
        }
    }
}

/// Callback receiving every path update.
pub type PathHandler = Box<dyn Fn(PathStatus) + Send + Sync>;

/// Platform network path monitor.
pub trait PathMonitor: Send + Sync {
    /// Start delivering updates to `handler`.
    fn start(&self, handler: PathHandler);

    /// Stop delivering updates.
    fn cancel(&self);
}

struct PathState {
    status: RwLock<Option<PathStatus>>,
    writer: Mutex<()>,
    sinks: Arc<SinkSet<PathStatus>>,
}

impl PathState {
    /// Updates from concurrent monitor threads are serialized so subscribers
    /// see changes in the order the stored status took them.
    fn apply(&self, status: PathStatus) {
        let _writer = self.writer.lock();
        let previous = self.status.write().replace(status);
        if previous == Some(status) {
            return;
        }
        let delivered = self.sinks.broadcast(&status);
        debug!(%status, delivered, "network path changed");
    }
}

/// Tracks network availability through a [`PathMonitor`].
pub struct NetworkObserver {
    monitor: Arc<dyn PathMonitor>,
    state: Arc<PathState>,
}

impl NetworkObserver {
    /// Start `monitor` and observe it.
    pub fn new(monitor: Arc<dyn PathMonitor>) -> Self {
        let state = Arc::new(PathState {
            status: RwLock::new(None),
            writer: Mutex::new(()),
            sinks: Arc::new(SinkSet::new(StreamKind::NetworkPath)),
        });
        let weak: Weak<PathState> = Arc::downgrade(&state);
        monitor.start(Box::new(move |status| {
            if let Some(state) = weak.upgrade() {
                state.apply(status);
            }
        }));
        Self { monitor, state }
    }

    /// Latest reported status, `None` before the first update.
    pub fn status(&self) -> Option<PathStatus> {
        *self.state.status.read()
    }

    /// Whether the latest status is [`PathStatus::Satisfied`].
    pub fn is_connected(&self) -> bool {
        self.status().is_some_and(PathStatus::is_connected)
    }

    /// Subscribe to status changes. The current status, if any, comes first.
    pub fn subscribe(&self) -> Subscription<PathStatus> {
        let state = Arc::clone(&self.state);
        Subscription::attach(&self.state.sinks, move || *state.status.read())
    }
}

impl Drop for NetworkObserver {
    fn drop(&mut self) {
        self.monitor.cancel();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePathMonitor;

    fn observer() -> (Arc<FakePathMonitor>, NetworkObserver) {
        let monitor = Arc::new(FakePathMonitor::new());
        let observer = NetworkObserver::new(Arc::clone(&monitor) as Arc<dyn PathMonitor>);
        (monitor, observer)
    }

    #[test]
    fn starts_without_status() {
        let (monitor, observer) = observer();
        assert!(monitor.is_started());
        assert_eq!(observer.status(), None);
        assert!(!observer.is_connected());
    }

    #[test]
    fn tracks_latest_status() {
        let (monitor, observer) = observer();
        monitor.emit(PathStatus::Satisfied);
        assert!(observer.is_connected());
        monitor.emit(PathStatus::RequiresConnection);
        assert!(!observer.is_connected());
        assert_eq!(observer.status(), Some(PathStatus::RequiresConnection));
    }

    #[tokio::test]
    async fn subscriber_gets_current_status_first() {
        let (monitor, observer) = observer();
        monitor.emit(PathStatus::Unsatisfied);

        let mut sub = observer.subscribe();
        monitor.emit(PathStatus::Satisfied);

        assert_eq!(sub.recv().await, Some(PathStatus::Unsatisfied));
        assert_eq!(sub.recv().await, Some(PathStatus::Satisfied));
    }

    #[test]
    fn repeated_status_is_not_rebroadcast() {
        let (monitor, observer) = observer();
        let mut sub = observer.subscribe();
        monitor.emit(PathStatus::Satisfied);
        monitor.emit(PathStatus::Satisfied);

        assert_eq!(sub.try_recv(), Some(PathStatus::Satisfied));
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn concurrent_updates_end_on_the_stored_status() {
        const STATUSES: [PathStatus; 3] = [
            PathStatus::Satisfied,
            PathStatus::Unsatisfied,
            PathStatus::RequiresConnection,
        ];
        let (monitor, observer) = observer();
        let mut sub = observer.subscribe();

        let threads: Vec<_> = (0..4)
            .map(|offset| {
                let monitor = Arc::clone(&monitor);
                std::thread::spawn(move || {
                    for i in 0..500 {
                        monitor.emit(STATUSES[(i + offset) % STATUSES.len()]);
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        let mut seen = Vec::new();
        while let Some(status) = sub.try_recv() {
            seen.push(status);
        }
        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|pair| pair[0] != pair[1]));
        assert_eq!(seen.last().copied(), observer.status());
    }

    #[tokio::test]
    async fn drop_cancels_monitor_and_ends_streams() {
        let (monitor, observer) = observer();
        let mut sub = observer.subscribe();
        drop(observer);

        assert!(monitor.is_cancelled());
        assert_eq!(sub.recv().await, None);
        monitor.emit(PathStatus::Satisfied);
    }
}
