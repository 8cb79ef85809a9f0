// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use async_lock::MutexGuard;
// self
use crate::_prelude::*;

/// Per-cache-key single-flight guards.
#[derive(Debug, Default)]
pub(crate) struct FlightRegistry(Mutex<HashMap<String, Arc<Flight>>>);
impl FlightRegistry {
	/// Returns (and creates on demand) the guard for `key`.
	pub(crate) fn flight(&self, key: &str) -> Arc<Flight> {
		self.0.lock().entry(key.to_owned()).or_default().clone()
	}
}

/// Async lock plus a counter of completed refreshes for one cache key.
///
/// A caller records [`Flight::epoch`] before waiting on [`Flight::lock`]; a different epoch
/// once the lock is held means another caller refreshed in the meantime.
#[derive(Debug, Default)]
pub(crate) struct Flight {
	lock: AsyncMutex<()>,
	epoch: AtomicU64,
}
impl Flight {
	pub(crate) fn epoch(&self) -> u64 {
		self.epoch.load(Ordering::Acquire)
	}

	pub(crate) async fn lock(&self) -> MutexGuard<'_, ()> {
		self.lock.lock().await
	}

	pub(crate) fn complete(&self) {
		self.epoch.fetch_add(1, Ordering::AcqRel);
	}
}
