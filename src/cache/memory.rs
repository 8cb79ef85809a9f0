//! Thread-safe in-memory [`CacheStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	cache::{CacheEntry, CacheError, CacheFuture, CacheStore},
};

type CacheMap = Arc<RwLock<HashMap<String, CacheEntry>>>;

/// Thread-safe cache backend that keeps entries in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryCache(CacheMap);
impl MemoryCache {
	/// Returns the number of entries currently held, expired ones included.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no entries are held.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn save_now(
		map: &CacheMap,
		key: &str,
		value: &str,
		ttl: Option<Duration>,
		now: OffsetDateTime,
	) -> Result<(), CacheError> {
		map.write().insert(key.to_owned(), CacheEntry::new(value, ttl, now));

		Ok(())
	}

	fn fetch_now(map: &CacheMap, key: &str, now: OffsetDateTime) -> Option<String> {
		let expired = match map.read().get(key) {
			Some(entry) if !entry.is_expired_at(now) => return Some(entry.value.clone()),
			Some(_) => true,
			None => false,
		};

		if expired {
			map.write().remove(key);
		}

		None
	}
}
impl CacheStore for MemoryCache {
	fn save<'a>(
		&'a self,
		key: &'a str,
		value: &'a str,
		ttl: Option<Duration>,
	) -> CacheFuture<'a, ()> {
		Box::pin(async move { Self::save_now(&self.0, key, value, ttl, OffsetDateTime::now_utc()) })
	}

	fn fetch<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<String>> {
		Box::pin(async move { Ok(Self::fetch_now(&self.0, key, OffsetDateTime::now_utc())) })
	}
}
