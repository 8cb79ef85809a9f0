// std
use std::{
	collections::HashMap,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use parking_lot::Mutex;
use serde_json::{Value, json};
use time::Duration;
// self
use token_foundation::{
	cache::{CacheFuture, CacheStore},
	credential::{
		CredentialManager, CredentialSource, FetchContext, ServerResponse, SourceFuture,
		TokenRequest,
	},
	error::{Error, Result, TransportError},
};

type SaveLog = Vec<(String, String, Option<Duration>)>;

/// Cache port double that records every `save` call.
#[derive(Default)]
struct RecordingCache {
	values: Mutex<HashMap<String, String>>,
	saves: Mutex<SaveLog>,
}
impl RecordingCache {
	fn saves(&self) -> SaveLog {
		self.saves.lock().clone()
	}

	fn value(&self, key: &str) -> Option<String> {
		self.values.lock().get(key).cloned()
	}
}
impl CacheStore for RecordingCache {
	fn save<'a>(
		&'a self,
		key: &'a str,
		value: &'a str,
		ttl: Option<Duration>,
	) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			self.saves.lock().push((key.to_owned(), value.to_owned(), ttl));
			self.values.lock().insert(key.to_owned(), value.to_owned());

			Ok(())
		})
	}

	fn fetch<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<String>> {
		Box::pin(async move { Ok(self.value(key)) })
	}
}

/// Credential source double returning a fixed body after an optional delay.
struct ScriptedSource {
	body: Value,
	delay: Option<std::time::Duration>,
	fetches: AtomicUsize,
	checks: AtomicUsize,
	seen_app_ids: Mutex<Vec<String>>,
}
impl ScriptedSource {
	fn new(body: Value) -> Self {
		Self {
			body,
			delay: None,
			fetches: AtomicUsize::new(0),
			checks: AtomicUsize::new(0),
			seen_app_ids: Mutex::new(Vec::new()),
		}
	}

	fn with_delay(mut self, delay: std::time::Duration) -> Self {
		self.delay = Some(delay);

		self
	}

	fn fetches(&self) -> usize {
		self.fetches.load(Ordering::SeqCst)
	}

	fn checks(&self) -> usize {
		self.checks.load(Ordering::SeqCst)
	}
}
impl CredentialSource for ScriptedSource {
	fn fetch_token<'a>(&'a self, context: &'a FetchContext) -> SourceFuture<'a, ServerResponse> {
		Box::pin(async move {
			self.fetches.fetch_add(1, Ordering::SeqCst);
			self.seen_app_ids.lock().push(context.app_id().to_owned());

			if let Some(delay) = self.delay {
				tokio::time::sleep(delay).await;
			}

			ServerResponse::try_from(self.body.clone())
		})
	}

	fn check_response(&self, response: &ServerResponse) -> Result<()> {
		self.checks.fetch_add(1, Ordering::SeqCst);

		match response.get("errcode") {
			Some(code) => Err(Error::invalid_credential_response(format!("errcode {code}"))),
			None => Ok(()),
		}
	}
}

fn build_manager(source: &Arc<ScriptedSource>, cache: &Arc<RecordingCache>) -> CredentialManager {
	CredentialManager::new(source.clone())
		.with_prefix("tok:")
		.with_app_id("app1")
		.with_secret("s3cr3t")
		.with_cache(cache.clone())
}

fn success_body() -> Value {
	json!({ "access_token": "XYZ", "expires_in": 3600 })
}

#[test]
fn cache_key_concatenates_prefix_and_app_id_unless_overridden() {
	let source = Arc::new(ScriptedSource::new(success_body()));
	let cache = Arc::new(RecordingCache::default());
	let manager = build_manager(&source, &cache);

	assert_eq!(manager.cache_key(), "tok:app1");

	let pinned = build_manager(&source, &cache).with_cache_key("pinned");

	assert_eq!(pinned.cache_key(), "pinned");
}

#[tokio::test]
async fn first_fetch_persists_token_under_cache_key_with_ttl() {
	let source = Arc::new(ScriptedSource::new(success_body()));
	let cache = Arc::new(RecordingCache::default());
	let manager = build_manager(&source, &cache);
	let token = manager.get_token(false).await.expect("Cold resolution should succeed.");

	assert_eq!(token.expose(), "XYZ");
	assert_eq!(
		cache.saves(),
		vec![("tok:app1".to_owned(), "XYZ".to_owned(), Some(Duration::seconds(3600)))]
	);
	assert_eq!(source.fetches(), 1);
	assert_eq!(source.checks(), 1);
	assert_eq!(*source.seen_app_ids.lock(), vec!["app1".to_owned()]);
}

#[tokio::test]
async fn set_token_is_served_without_calling_the_source() {
	let source = Arc::new(ScriptedSource::new(success_body()));
	let cache = Arc::new(RecordingCache::default());
	let manager = build_manager(&source, &cache);

	manager
		.set_token("MANUAL", Some(Duration::seconds(60)))
		.await
		.expect("Manual token should persist.");

	let token = manager.get_token(false).await.expect("Cached resolution should succeed.");

	assert_eq!(token.expose(), "MANUAL");
	assert_eq!(source.fetches(), 0);
	assert_eq!(manager.metrics().cache_hits(), 1);
}

#[tokio::test]
async fn forced_refresh_fetches_once_and_overwrites_cache() {
	let source = Arc::new(ScriptedSource::new(success_body()));
	let cache = Arc::new(RecordingCache::default());
	let manager = build_manager(&source, &cache);

	manager.set_token("OLD", None).await.expect("Seed token should persist.");

	let token = manager.get_token(true).await.expect("Forced resolution should succeed.");

	assert_eq!(token.expose(), "XYZ");
	assert_eq!(source.fetches(), 1);
	assert_eq!(source.checks(), 1);
	assert_eq!(cache.value("tok:app1").as_deref(), Some("XYZ"));
}

#[tokio::test]
async fn zero_ttl_skips_the_cache_port_but_still_serves_the_token() {
	let source = Arc::new(ScriptedSource::new(success_body()));
	let cache = Arc::new(RecordingCache::default());
	let manager = build_manager(&source, &cache);

	manager.set_token("MEM", Some(Duration::ZERO)).await.expect("Memory-only token should set.");

	assert!(cache.saves().is_empty());

	let token = manager.get_token(false).await.expect("Fallback resolution should succeed.");

	assert_eq!(token.expose(), "MEM");
	assert_eq!(source.fetches(), 0);
	assert_eq!(manager.metrics().fallback_hits(), 1);
}

#[tokio::test]
async fn rejected_response_propagates_and_leaves_cache_untouched() {
	let source = Arc::new(ScriptedSource::new(json!({ "errcode": 40001, "errmsg": "invalid" })));
	let cache = Arc::new(RecordingCache::default());
	let manager = build_manager(&source, &cache);

	manager.set_token("OLD", None).await.expect("Seed token should persist.");

	let err = manager.get_token(true).await.expect_err("Rejected responses should fail.");

	assert!(matches!(err, Error::InvalidCredentialResponse { .. }));
	assert_eq!(cache.saves().len(), 1);
	assert_eq!(cache.value("tok:app1").as_deref(), Some("OLD"));
	assert_eq!(manager.metrics().failures(), 1);
}

#[tokio::test]
async fn missing_token_field_is_reported_by_name() {
	let source = Arc::new(ScriptedSource::new(json!({ "expires_in": 3600 })));
	let cache = Arc::new(RecordingCache::default());
	let manager = build_manager(&source, &cache);
	let err = manager.get_token(false).await.expect_err("Missing token field should fail.");

	assert!(matches!(err, Error::MissingField { ref field } if field == "access_token"));
	assert!(cache.saves().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cold_callers_share_one_fetch() {
	let source = Arc::new(
		ScriptedSource::new(success_body()).with_delay(std::time::Duration::from_millis(100)),
	);
	let cache = Arc::new(RecordingCache::default());
	let manager = Arc::new(build_manager(&source, &cache));
	let tasks = (0..8)
		.map(|_| {
			let manager = manager.clone();

			tokio::spawn(async move { manager.get_token(false).await })
		})
		.collect::<Vec<_>>();

	for task in tasks {
		let token = task
			.await
			.expect("Resolution task should not panic.")
			.expect("Concurrent resolution should succeed.");

		assert_eq!(token.expose(), "XYZ");
	}

	assert_eq!(source.fetches(), 1);
	assert_eq!(cache.saves().len(), 1);
}

#[tokio::test]
async fn resolution_deadline_returns_timeout_and_releases_the_flight() {
	let source = Arc::new(
		ScriptedSource::new(success_body()).with_delay(std::time::Duration::from_millis(500)),
	);
	let cache = Arc::new(RecordingCache::default());
	let manager = build_manager(&source, &cache);
	let err = manager
		.get_token_with(TokenRequest::new().with_timeout(Duration::milliseconds(20)))
		.await
		.expect_err("Slow sources should time out.");

	assert!(matches!(err, Error::Transport(TransportError::Timeout { .. })));
	assert!(cache.saves().is_empty());

	manager.set_token("LATER", None).await.expect("Manual token should persist.");

	let token = manager
		.get_token_with(TokenRequest::new().with_timeout(Duration::seconds(1)))
		.await
		.expect("Cached resolution should finish within the deadline.");

	assert_eq!(token.expose(), "LATER");
}

#[tokio::test]
async fn no_expiry_field_persists_without_ttl() {
	let source = Arc::new(ScriptedSource::new(json!({ "ticket": "T-1" })));
	let cache = Arc::new(RecordingCache::default());
	let manager = build_manager(&source, &cache)
		.with_token_field("ticket")
		.with_expires_field(None::<String>);

	manager.get_token(false).await.expect("Resolution should succeed.");

	assert_eq!(cache.saves(), vec![("tok:app1".to_owned(), "T-1".to_owned(), None)]);
}
