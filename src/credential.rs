//! Credential lifecycle: cache lookup, single-flight refresh, and persistence.
//!
//! [`CredentialManager`] resolves a token in three tiers. The cache port is consulted first,
//! then the in-process last-known value, and only then the vendor [`CredentialSource`]. Server
//! fetches run inside a per-cache-key single-flight section, so concurrent callers that find
//! nothing (or force a refresh) share one round trip. The extracted token and lifetime are
//! persisted through [`CredentialManager::set_token`].
//!
//! Without an injected cache the manager lazily opens a [`FileCache`] in the system temp
//! directory; without an injected pipeline it lazily builds a [`RequestPipeline`]. Both defaults
//! are built once per manager.

pub mod config;
pub mod metrics;
pub mod signer;
pub mod source;

mod flight;

pub use config::*;
pub use metrics::*;
pub use signer::*;
pub use source::*;

// self
use crate::{
	_prelude::*,
	auth::{Identity, Secret},
	cache::{CacheStore, FileCache},
	credential::flight::FlightRegistry,
	error::TransportError,
	http::RequestPipeline,
	obs::{self, OpKind, OpOutcome, OpSpan},
};

/// Conventional one-day lifetime for tokens persisted by hand.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::seconds(86_400);

/// Parameters for one token resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenRequest {
	/// Skips the cache and fallback tiers when true.
	pub force: bool,
	/// Deadline for the whole resolution.
	pub timeout: Option<Duration>,
}
impl TokenRequest {
	/// Creates a non-forced request without a deadline.
	pub fn new() -> Self {
		Self::default()
	}

	/// Forces a server round trip.
	pub fn force_refresh(mut self) -> Self {
		self.force = true;

		self
	}

	/// Overrides the force flag.
	pub fn with_force(mut self, force: bool) -> Self {
		self.force = force;

		self
	}

	/// Bounds the resolution; negative values are clamped to zero.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(if timeout.is_negative() { Duration::ZERO } else { timeout });

		self
	}
}

/// Caches and refreshes the token issued by one [`CredentialSource`].
///
/// The manager is `Send + Sync`; share it behind an [`Arc`] to let concurrent tasks coalesce
/// their refreshes.
pub struct CredentialManager {
	source: Arc<dyn CredentialSource>,
	config: CredentialConfig,
	identity: RwLock<Identity>,
	cache: Option<Arc<dyn CacheStore>>,
	default_cache: OnceCell<Arc<dyn CacheStore>>,
	http: Option<Arc<RequestPipeline>>,
	default_http: OnceCell<Arc<RequestPipeline>>,
	fallback: RwLock<Option<Secret>>,
	flights: FlightRegistry,
	metrics: Arc<TokenMetrics>,
}
impl CredentialManager {
	/// Creates a manager for `source` with default configuration and lazy defaults.
	pub fn new(source: Arc<dyn CredentialSource>) -> Self {
		Self {
			source,
			config: CredentialConfig::default(),
			identity: Default::default(),
			cache: None,
			default_cache: OnceCell::new(),
			http: None,
			default_http: OnceCell::new(),
			fallback: Default::default(),
			flights: Default::default(),
			metrics: Default::default(),
		}
	}

	/// Replaces the whole configuration.
	pub fn with_config(mut self, config: CredentialConfig) -> Self {
		self.config = config;

		self
	}

	/// Sets the cache-key prefix.
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.config.prefix = prefix.into();

		self
	}

	/// Pins the cache key, ignoring prefix and app id.
	pub fn with_cache_key(mut self, cache_key: impl Into<String>) -> Self {
		self.config.cache_key = Some(cache_key.into());

		self
	}

	/// Sets the response field holding the token.
	pub fn with_token_field(mut self, field: impl Into<String>) -> Self {
		self.config.token_field = field.into();

		self
	}

	/// Sets (or clears, with `None`) the response field holding the lifetime.
	pub fn with_expires_field(mut self, field: Option<impl Into<String>>) -> Self {
		self.config.expires_field = field.map(Into::into);

		self
	}

	/// Sets the application identifier.
	pub fn with_app_id(self, app_id: impl Into<String>) -> Self {
		self.set_app_id(app_id);

		self
	}

	/// Sets the application secret.
	pub fn with_secret(self, secret: impl Into<Secret>) -> Self {
		self.set_secret(secret);

		self
	}

	/// Injects the cache port.
	pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
		self.cache = Some(cache);

		self
	}

	/// Injects the request pipeline handed to the source.
	pub fn with_http(mut self, http: Arc<RequestPipeline>) -> Self {
		self.http = Some(http);

		self
	}

	/// Returns the active configuration.
	pub fn config(&self) -> &CredentialConfig {
		&self.config
	}

	/// Returns the resolution counters.
	pub fn metrics(&self) -> Arc<TokenMetrics> {
		self.metrics.clone()
	}

	/// Replaces the application identifier.
	///
	/// The in-process last-known token is kept per manager, not per cache key: after switching
	/// apps, a cache miss still serves the previous app's token until the next refresh.
	pub fn set_app_id(&self, app_id: impl Into<String>) {
		self.identity.write().app_id = app_id.into();
	}

	/// Returns the application identifier.
	pub fn app_id(&self) -> String {
		self.identity.read().app_id.clone()
	}

	/// Replaces the application secret.
	pub fn set_secret(&self, secret: impl Into<Secret>) {
		self.identity.write().secret = secret.into();
	}

	/// Returns the application secret.
	pub fn secret(&self) -> Secret {
		self.identity.read().secret.clone()
	}

	/// Returns a snapshot of the identity.
	pub fn identity(&self) -> Identity {
		self.identity.read().clone()
	}

	/// Returns the explicit cache key when configured, else `prefix + app_id`.
	pub fn cache_key(&self) -> String {
		self.config.cache_key_for(&self.identity.read().app_id)
	}

	/// Returns the cache port, opening the temp-dir [`FileCache`] on first use.
	pub async fn cache(&self) -> Result<Arc<dyn CacheStore>> {
		if let Some(cache) = &self.cache {
			return Ok(cache.clone());
		}

		self.default_cache
			.get_or_try_init(|| async {
				let cache: Arc<dyn CacheStore> = Arc::new(FileCache::in_temp_dir()?);

				Ok::<_, Error>(cache)
			})
			.await
			.cloned()
	}

	/// Returns the request pipeline, building a default one on first use.
	pub async fn http(&self) -> Arc<RequestPipeline> {
		if let Some(http) = &self.http {
			return http.clone();
		}

		self.default_http.get_or_init(|| async { Arc::new(RequestPipeline::new()) }).await.clone()
	}

	/// Returns the current token, refreshing it when absent or when `force_refresh` is set.
	pub async fn get_token(&self, force_refresh: bool) -> Result<Secret> {
		self.get_token_with(TokenRequest::new().with_force(force_refresh)).await
	}

	/// Resolves a token according to `request`.
	///
	/// When a timeout is set and elapses, the in-flight fetch is dropped and
	/// [`TransportError::Timeout`] is returned. Deadlines need a Tokio runtime with timers.
	pub async fn get_token_with(&self, request: TokenRequest) -> Result<Secret> {
		const KIND: OpKind = OpKind::GetToken;

		let span = OpSpan::new(KIND, "get_token");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let Some(after) = request.timeout else {
					return self.resolve(request.force).await;
				};
				let limit = std::time::Duration::try_from(after).unwrap_or_default();

				tokio::time::timeout(limit, self.resolve(request.force))
					.await
					.map_err(|_| TransportError::Timeout { after })?
			})
			.await;

		if result.is_err() {
			self.metrics.record_failure();
		}

		obs::record_op_result(KIND, &result);

		result
	}

	/// Stores `token` as the current credential.
	///
	/// `Some(ttl)` with a positive `ttl` persists with that lifetime, `None` persists without
	/// expiry, and a zero or negative `ttl` skips the cache port. The in-process last-known
	/// value is always updated.
	pub async fn set_token(&self, token: impl Into<Secret>, ttl: Option<Duration>) -> Result<()> {
		const KIND: OpKind = OpKind::SetToken;

		let span = OpSpan::new(KIND, "set_token");
		let token = token.into();

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result =
			span.instrument(async move { self.store_token(&self.cache_key(), token, ttl).await }).await;

		obs::record_op_result(KIND, &result);

		result
	}

	async fn resolve(&self, force: bool) -> Result<Secret> {
		let key = self.cache_key();

		if !force {
			if let Some(token) = self.lookup(&key).await? {
				return Ok(token);
			}
		}

		let flight = self.flights.flight(&key);
		let observed = flight.epoch();
		let _singleflight = flight.lock().await;

		// Non-forced callers may have missed a refresh that landed before the lock was taken;
		// forced callers only reuse one that finished while they waited.
		if !force || flight.epoch() != observed {
			if let Some(token) = self.lookup(&key).await? {
				self.metrics.record_coalesced();

				return Ok(token);
			}
		}

		let token = self.fetch_from_server(&key).await?;

		flight.complete();

		Ok(token)
	}

	async fn lookup(&self, key: &str) -> Result<Option<Secret>> {
		let cache = self.cache().await?;
		let (token, source) = match cache.fetch(key).await? {
			Some(value) if !value.is_empty() => (Secret::new(value), TokenSource::Cache),
			_ => {
				let fallback = self.fallback.read().clone();

				match fallback {
					Some(token) if !token.is_empty() => (token, TokenSource::Fallback),
					_ => return Ok(None),
				}
			},
		};

		self.metrics.record_source(source);
		obs::log_token_source(key, source);

		Ok(Some(token))
	}

	async fn fetch_from_server(&self, key: &str) -> Result<Secret> {
		let context = FetchContext::new(self.identity(), key, self.http().await);

		self.metrics.record_source(TokenSource::Server);

		let response = self.source.fetch_token(&context).await?;

		self.source.check_response(&response)?;

		let token = response.token(&self.config.token_field)?;
		let ttl = match &self.config.expires_field {
			Some(field) => Some(response.expires_in(field)?),
			None => None,
		};

		self.store_token(key, token.clone(), ttl).await?;
		obs::log_token_source(key, TokenSource::Server);

		Ok(token)
	}

	async fn store_token(&self, key: &str, token: Secret, ttl: Option<Duration>) -> Result<()> {
		let persist = ttl.is_none_or(|ttl| ttl.is_positive());

		if persist {
			self.cache().await?.save(key, token.expose(), ttl).await?;
		}

		*self.fallback.write() = Some(token);

		Ok(())
	}
}
impl Debug for CredentialManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialManager")
			.field("config", &self.config)
			.field("identity", &*self.identity.read())
			.field("cache_injected", &self.cache.is_some())
			.field("http_injected", &self.http.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::cache::MemoryCache;

	struct FixedSource {
		body: Value,
		calls: AtomicUsize,
	}
	impl FixedSource {
		fn new(body: Value) -> Arc<Self> {
			Arc::new(Self { body, calls: AtomicUsize::new(0) })
		}
	}
	impl CredentialSource for FixedSource {
		fn fetch_token<'a>(
			&'a self,
			_context: &'a FetchContext,
		) -> SourceFuture<'a, ServerResponse> {
			Box::pin(async move {
				self.calls.fetch_add(1, Ordering::SeqCst);

				ServerResponse::try_from(self.body.clone())
			})
		}

		fn check_response(&self, _response: &ServerResponse) -> Result<()> {
			Ok(())
		}
	}

	#[test]
	fn token_request_builders_compose() {
		let request = TokenRequest::new().force_refresh().with_timeout(Duration::seconds(-3));

		assert!(request.force);
		assert_eq!(request.timeout, Some(Duration::ZERO));
		assert!(!TokenRequest::new().with_force(false).force);
	}

	#[test]
	fn cache_key_tracks_identity_changes() {
		let manager =
			CredentialManager::new(FixedSource::new(json!({}))).with_prefix("tok:").with_app_id("a");

		assert_eq!(manager.cache_key(), "tok:a");

		manager.set_app_id("b");

		assert_eq!(manager.cache_key(), "tok:b");
	}

	#[tokio::test]
	async fn fetched_token_is_served_from_cache_afterwards() {
		let source = FixedSource::new(json!({ "access_token": "XYZ", "expires_in": 3600 }));
		let cache = Arc::new(MemoryCache::default());
		let manager = CredentialManager::new(source.clone())
			.with_prefix("tok:")
			.with_app_id("app1")
			.with_cache(cache.clone());

		let first = manager.get_token(false).await.expect("First resolution should fetch.");
		let second = manager.get_token(false).await.expect("Second resolution should hit.");

		assert_eq!(first.expose(), "XYZ");
		assert_eq!(second, first);
		assert_eq!(source.calls.load(Ordering::SeqCst), 1);
		assert_eq!(manager.metrics().cache_hits(), 1);
		assert_eq!(manager.metrics().server_fetches(), 1);
	}

	#[tokio::test]
	async fn without_expiry_field_tokens_persist_forever() {
		let source = FixedSource::new(json!({ "token": "T" }));
		let cache = Arc::new(MemoryCache::default());
		let manager = CredentialManager::new(source)
			.with_cache_key("fixed")
			.with_token_field("token")
			.with_expires_field(None::<String>)
			.with_cache(cache.clone());

		manager.get_token(false).await.expect("Resolution should succeed.");

		assert_eq!(cache.fetch("fixed").await.expect("Fetch should succeed.").as_deref(), Some("T"));
	}

	#[tokio::test]
	async fn zero_ttl_keeps_token_in_memory_only() {
		let source = FixedSource::new(json!({ "access_token": "XYZ", "expires_in": 0 }));
		let cache = Arc::new(MemoryCache::default());
		let manager =
			CredentialManager::new(source.clone()).with_app_id("app1").with_cache(cache.clone());

		manager.get_token(false).await.expect("First resolution should fetch.");

		assert!(cache.is_empty());
		assert_eq!(manager.get_token(false).await.expect("Fallback should serve.").expose(), "XYZ");
		assert_eq!(source.calls.load(Ordering::SeqCst), 1);
		assert_eq!(manager.metrics().fallback_hits(), 1);
	}

	#[tokio::test]
	async fn out_of_range_expiry_is_stored_without_deadline() {
		let source =
			FixedSource::new(json!({ "access_token": "XYZ", "expires_in": 9_000_000_000_000_u64 }));
		let cache = Arc::new(MemoryCache::default());
		let manager =
			CredentialManager::new(source.clone()).with_app_id("app1").with_cache(cache.clone());
		let token = manager.get_token(false).await.expect("Huge lifetimes should not fail.");

		assert_eq!(token.expose(), "XYZ");
		assert_eq!(cache.fetch("app1").await.expect("Fetch should succeed.").as_deref(), Some("XYZ"));
		assert_eq!(source.calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn fallback_is_shared_across_app_ids() {
		let source = FixedSource::new(json!({ "access_token": "FRESH", "expires_in": 60 }));
		let manager = CredentialManager::new(source.clone())
			.with_app_id("a")
			.with_cache(Arc::new(MemoryCache::default()));

		manager.set_token("TOKEN-A", Some(Duration::ZERO)).await.expect("Token should set.");
		manager.set_app_id("b");

		let token = manager.get_token(false).await.expect("Fallback should serve.");

		assert_eq!(manager.cache_key(), "b");
		assert_eq!(token.expose(), "TOKEN-A");
		assert_eq!(source.calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn lazy_defaults_are_built_once() {
		let manager = CredentialManager::new(FixedSource::new(json!({})));
		let first_cache = manager.cache().await.expect("Default cache should open.");
		let second_cache = manager.cache().await.expect("Default cache should be reused.");
		let first_http = manager.http().await;
		let second_http = manager.http().await;

		assert!(Arc::ptr_eq(&first_cache, &second_cache));
		assert!(Arc::ptr_eq(&first_http, &second_http));
	}

	#[tokio::test]
	async fn injected_defaults_win() {
		let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::default());
		let http = Arc::new(RequestPipeline::new());
		let manager = CredentialManager::new(FixedSource::new(json!({})))
			.with_cache(cache.clone())
			.with_http(http.clone());

		assert!(Arc::ptr_eq(&manager.cache().await.expect("Injected cache should resolve."), &cache));
		assert!(Arc::ptr_eq(&manager.http().await, &http));
	}
}
