//! Filesystem-backed [`CacheStore`]; the manager's default when no cache is injected.

// std
use std::{
	env,
	fs::{self, File},
	io::{ErrorKind, Write},
	path::{Path, PathBuf},
};
// crates.io
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	cache::{CacheEntry, CacheError, CacheFuture, CacheStore},
};

/// Persists each cache entry as a JSON file named after the SHA-256 digest of its key.
#[derive(Clone, Debug)]
pub struct FileCache {
	dir: PathBuf,
	write_guard: Arc<Mutex<()>>,
}
impl FileCache {
	/// Directory name used below the system temp directory by [`FileCache::in_temp_dir`].
	pub const TEMP_DIR_NAME: &'static str = "token-foundation";

	/// Opens (or creates) a cache rooted at `dir`.
	pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
		let dir = dir.into();

		fs::create_dir_all(&dir).map_err(|e| CacheError::Backend {
			message: format!("Failed to create cache directory {}: {e}", dir.display()),
		})?;

		Ok(Self { dir, write_guard: Default::default() })
	}

	/// Opens a cache rooted at the system temp directory.
	pub fn in_temp_dir() -> Result<Self, CacheError> {
		Self::open(env::temp_dir().join(Self::TEMP_DIR_NAME))
	}

	/// Returns the directory holding the cache files.
	pub fn dir(&self) -> &Path {
		&self.dir
	}

	fn entry_path(&self, key: &str) -> PathBuf {
		let digest = Sha256::digest(key.as_bytes());
		let name = digest.iter().map(|b| format!("{b:02x}")).collect::<String>();

		self.dir.join(format!("{name}.json"))
	}

	fn read_entry(path: &Path) -> Result<Option<StoredEntry>, CacheError> {
		let bytes = match fs::read(path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) =>
				return Err(CacheError::Backend {
					message: format!("Failed to read {}: {e}", path.display()),
				}),
		};

		if bytes.is_empty() {
			return Ok(None);
		}

		serde_json::from_slice(&bytes).map(Some).map_err(|e| CacheError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn write_entry(&self, path: &Path, entry: &StoredEntry) -> Result<(), CacheError> {
		let serialized = serde_json::to_vec(entry).map_err(|e| CacheError::Serialization {
			message: format!("Failed to serialize cache entry: {e}"),
		})?;
		let mut tmp_path = path.to_path_buf();

		tmp_path.set_extension("tmp");

		let _guard = self.write_guard.lock();

		{
			let mut file = File::create(&tmp_path).map_err(|e| CacheError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| CacheError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| CacheError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, path).map_err(|e| CacheError::Backend {
			message: format!("Failed to replace {}: {e}", path.display()),
		})
	}

	fn fetch_now(&self, key: &str, now: OffsetDateTime) -> Result<Option<String>, CacheError> {
		let path = self.entry_path(key);
		let Some(stored) = Self::read_entry(&path)? else {
			return Ok(None);
		};

		// Digest collisions are treated as misses.
		if stored.key != key {
			return Ok(None);
		}
		// Expired files read as misses and are only ever replaced by `save_now`.
		if stored.entry.is_expired_at(now) {
			return Ok(None);
		}

		Ok(Some(stored.entry.value))
	}

	fn save_now(
		&self,
		key: &str,
		value: &str,
		ttl: Option<Duration>,
		now: OffsetDateTime,
	) -> Result<(), CacheError> {
		let stored = StoredEntry { key: key.to_owned(), entry: CacheEntry::new(value, ttl, now) };

		self.write_entry(&self.entry_path(key), &stored)
	}
}
impl CacheStore for FileCache {
	fn save<'a>(
		&'a self,
		key: &'a str,
		value: &'a str,
		ttl: Option<Duration>,
	) -> CacheFuture<'a, ()> {
		Box::pin(async move { self.save_now(key, value, ttl, OffsetDateTime::now_utc()) })
	}

	fn fetch<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<String>> {
		Box::pin(async move { self.fetch_now(key, OffsetDateTime::now_utc()) })
	}
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
	key: String,
	entry: CacheEntry,
}
