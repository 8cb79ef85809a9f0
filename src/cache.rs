//! Cache port contracts and built-in cache implementations for credential values.

pub mod file;
pub mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

// self
use crate::_prelude::*;

/// Boxed future returned by [`CacheStore`] operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + 'a + Send>>;

/// Key-value store with per-entry TTL used to persist credentials across calls and restarts.
///
/// `save` with `ttl = None` stores the value without expiry. Expired entries must behave as
/// absent on `fetch`.
pub trait CacheStore
where
	Self: Send + Sync,
{
	/// Persists or replaces the value stored under `key`.
	fn save<'a>(
		&'a self,
		key: &'a str,
		value: &'a str,
		ttl: Option<Duration>,
	) -> CacheFuture<'a, ()>;

	/// Fetches the live value stored under `key`, if any.
	fn fetch<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<String>>;
}

/// Error type produced by [`CacheStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CacheError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Stored value plus its optional expiry instant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
	/// Cached value.
	pub value: String,
	/// Instant after which the entry is treated as absent.
	#[serde(with = "time::serde::timestamp::option")]
	pub expires_at: Option<OffsetDateTime>,
}
impl CacheEntry {
	/// Builds an entry that expires `ttl` after `now`.
	///
	/// The entry never expires when `ttl` is `None` or when `now + ttl` lies beyond the
	/// representable date range.
	pub fn new(value: impl Into<String>, ttl: Option<Duration>, now: OffsetDateTime) -> Self {
		Self { value: value.into(), expires_at: ttl.and_then(|ttl| now.checked_add(ttl)) }
	}

	/// Returns `true` once the entry's expiry instant has been reached.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| now >= expires_at)
	}
}
