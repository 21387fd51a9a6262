//! The in-flight registry backing [`crate::SingleFlight`].

use cadence_core::GatewayError;
use hashbrown::HashMap;
use parking_lot::Mutex;
use tokio::sync::broadcast;

#[cfg(feature = "tracing")]
use tracing::debug;

pub(crate) type SharedResult<Res> = Result<Res, GatewayError>;

/// Map from key to the broadcast sender that will carry that key's result
/// to every arriver who joined before it resolved.
///
/// Entries are removed as soon as the leader's computation completes, so a
/// later call for the same key starts a fresh computation rather than
/// replaying a stale result.
pub(crate) struct InFlight<Res> {
    requests: Mutex<HashMap<String, broadcast::Sender<SharedResult<Res>>>>,
}

/// Whether a call became the leader (and must drive the computation) or
/// joined one already running.
pub(crate) enum Role {
    Leader,
    Waiter,
}

impl<Res: Clone> InFlight<Res> {
    pub(crate) fn new() -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
        }
    }

    /// Joins `key`'s in-flight computation, creating it if none exists.
    ///
    /// The returned receiver is always subscribed before this call returns,
    /// so a leader can hand off to a spawned task immediately after: no
    /// waiter that joins concurrently can miss the eventual broadcast.
    pub(crate) fn join(&self, key: &str) -> (Role, broadcast::Receiver<SharedResult<Res>>) {
        let mut requests = self.requests.lock();
        if let Some(sender) = requests.get(key) {
            #[cfg(feature = "tracing")]
            debug!(key, "single-flight: joined as waiter");
            (Role::Waiter, sender.subscribe())
        } else {
            let (sender, receiver) = broadcast::channel(1);
            requests.insert(key.to_string(), sender);
            #[cfg(feature = "tracing")]
            debug!(key, "single-flight: became leader");
            (Role::Leader, receiver)
        }
    }

    /// Delivers the leader's result to every waiter and forgets the key.
    pub(crate) fn complete(&self, key: &str, result: SharedResult<Res>) {
        let mut requests = self.requests.lock();
        if let Some(sender) = requests.remove(key) {
            let _ = sender.send(result);
        }
    }
}
