//! Resolution counters and token-source labels.

// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Where a resolved token came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenSource {
	/// Cache port hit.
	Cache,
	/// In-process last-known value, used after a cache miss.
	Fallback,
	/// Fresh server round trip.
	Server,
}
impl TokenSource {
	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenSource::Cache => "cache",
			TokenSource::Fallback => "fallback",
			TokenSource::Server => "server",
		}
	}
}

/// Thread-safe counters for token resolution.
#[derive(Debug, Default)]
pub struct TokenMetrics {
	cache_hits: AtomicU64,
	fallback_hits: AtomicU64,
	server_fetches: AtomicU64,
	coalesced: AtomicU64,
	failures: AtomicU64,
}
impl TokenMetrics {
	/// Returns the number of tokens served from the cache port.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Returns the number of tokens served from the in-process fallback.
	pub fn fallback_hits(&self) -> u64 {
		self.fallback_hits.load(Ordering::Relaxed)
	}

	/// Returns the number of server round trips started.
	pub fn server_fetches(&self) -> u64 {
		self.server_fetches.load(Ordering::Relaxed)
	}

	/// Returns the number of callers that reused another caller's refresh.
	pub fn coalesced(&self) -> u64 {
		self.coalesced.load(Ordering::Relaxed)
	}

	/// Returns the number of failed resolutions.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_source(&self, source: TokenSource) {
		match source {
			TokenSource::Cache => self.cache_hits.fetch_add(1, Ordering::Relaxed),
			TokenSource::Fallback => self.fallback_hits.fetch_add(1, Ordering::Relaxed),
			TokenSource::Server => self.server_fetches.fetch_add(1, Ordering::Relaxed),
		};
	}

	pub(crate) fn record_coalesced(&self) {
		self.coalesced.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
