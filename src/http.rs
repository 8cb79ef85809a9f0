//! Request pipeline that routes every outbound call through one instrumented client.
//!
//! [`RequestPipeline`] exposes verb-shaped helpers ([`get`](RequestPipeline::get),
//! [`post`](RequestPipeline::post), [`json`](RequestPipeline::json),
//! [`upload`](RequestPipeline::upload)) that only shape their arguments into
//! [`RequestOptions`] before calling [`RequestPipeline::request`]. The primitive merges the
//! pipeline's default options with the call options, logs the request, builds a [`Handler`]
//! from the registered middlewares (plus the default `handler` override), dispatches through the
//! [`RequestExecutor`], and logs the response.
//!
//! Default options are scoped to one pipeline unless a [`SharedOptions`] handle is passed to
//! several pipelines through [`RequestPipeline::with_shared_defaults`].

mod executor;
mod middleware;
mod multipart;
mod options;
mod response;

pub use executor::*;
pub use middleware::*;
pub use multipart::*;
pub use options::*;
pub use response::*;

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	obs::{self, OpKind, OpOutcome, OpSpan},
};

/// Cloneable handle to a default option set shared by any number of pipelines.
#[derive(Clone, Debug, Default)]
pub struct SharedOptions(Arc<RwLock<RequestOptions>>);
impl SharedOptions {
	/// Wraps `options` in a new shared handle.
	pub fn new(options: RequestOptions) -> Self {
		Self(Arc::new(RwLock::new(options)))
	}

	/// Returns a snapshot of the current options.
	pub fn get(&self) -> RequestOptions {
		self.0.read().clone()
	}

	/// Replaces the current options.
	pub fn set(&self, options: RequestOptions) {
		*self.0.write() = options;
	}
}

/// Middleware-aware HTTP pipeline with default-option merging and request/response logging.
pub struct RequestPipeline {
	executor: Option<Arc<dyn RequestExecutor>>,
	default_executor: OnceCell<Arc<dyn RequestExecutor>>,
	middlewares: RwLock<Vec<Arc<dyn Middleware>>>,
	defaults: SharedOptions,
}
impl RequestPipeline {
	/// Creates a pipeline with no middlewares, empty defaults, and a lazily built executor.
	pub fn new() -> Self {
		Self {
			executor: None,
			default_executor: OnceCell::new(),
			middlewares: Default::default(),
			defaults: Default::default(),
		}
	}

	/// Uses `executor` instead of the lazily built default transport.
	pub fn with_executor(mut self, executor: Arc<dyn RequestExecutor>) -> Self {
		self.executor = Some(executor);

		self
	}

	/// Appends a middleware, returning the updated pipeline.
	pub fn with_middleware(self, middleware: impl Middleware) -> Self {
		self.add_middleware(middleware);

		self
	}

	/// Replaces the default options.
	pub fn with_default_options(self, options: RequestOptions) -> Self {
		self.set_default_options(options);

		self
	}

	/// Reads and writes defaults through `shared`, which other pipelines may also hold.
	pub fn with_shared_defaults(mut self, shared: SharedOptions) -> Self {
		self.defaults = shared;

		self
	}

	/// Appends a middleware; the chain runs in registration order.
	pub fn add_middleware(&self, middleware: impl Middleware) -> &Self {
		self.middlewares.write().push(Arc::new(middleware));

		self
	}

	/// Returns the registered middlewares in registration order.
	pub fn middlewares(&self) -> Vec<Arc<dyn Middleware>> {
		self.middlewares.read().clone()
	}

	/// Replaces the default options.
	pub fn set_default_options(&self, options: RequestOptions) {
		self.defaults.set(options);
	}

	/// Returns a snapshot of the default options.
	pub fn default_options(&self) -> RequestOptions {
		self.defaults.get()
	}

	/// Returns the handle backing this pipeline's default options.
	pub fn shared_defaults(&self) -> SharedOptions {
		self.defaults.clone()
	}

	/// Builds the execution handler: registered middlewares, then the default `handler` option.
	pub fn handler(&self) -> Handler {
		self.build_handler(&self.defaults.get())
	}

	/// Returns the injected executor, building the default one on first use.
	pub async fn executor(&self) -> Result<Arc<dyn RequestExecutor>> {
		if let Some(executor) = &self.executor {
			return Ok(executor.clone());
		}

		self.default_executor.get_or_try_init(|| async { default_executor() }).await.cloned()
	}

	/// Sends a `GET` request with `query` parameters.
	pub async fn get(&self, url: &str, query: Value) -> Result<Response> {
		self.request(url, "GET", RequestOptions::new().with_query(query)).await
	}

	/// Sends a `POST` request with URL-encoded `form_params`.
	pub async fn post(&self, url: &str, form_params: Value) -> Result<Response> {
		self.request(url, "POST", RequestOptions::new().with_form_params(form_params)).await
	}

	/// Sends a `POST` request with a JSON body.
	pub async fn json(&self, url: &str, json: Value) -> Result<Response> {
		self.request(url, "POST", RequestOptions::new().with_json(json)).await
	}

	/// Sends a multipart `POST` request built from `files` and `form`.
	pub async fn upload(
		&self,
		url: &str,
		queries: Value,
		files: &BTreeMap<String, UploadFile>,
		form: &BTreeMap<String, String>,
	) -> Result<Response> {
		let options =
			RequestOptions::new().with_query(queries).with_multipart(build_multipart(files, form));

		self.request(url, "POST", options).await
	}

	/// Dispatches a request through the middleware chain and the executor.
	///
	/// A `handler` entry in the call options is ignored; only the default options may supply
	/// one.
	pub async fn request(
		&self,
		url: &str,
		method: &str,
		options: RequestOptions,
	) -> Result<Response> {
		const KIND: OpKind = OpKind::Request;

		let span = OpSpan::new(KIND, "request");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let method = normalize_method(method)?;
				let url = Url::parse(url).map_err(|source| ConfigError::InvalidUrl { source })?;
				let defaults = self.defaults.get();
				let handler = self.build_handler(&defaults);
				let mut options = defaults.merge(options);

				options.remove(HANDLER);
				obs::log_request(&url, &method, &options);

				let executor = self.executor().await?;
				let response = handler
					.dispatch(PendingRequest::new(method, url, options), executor.as_ref())
					.await?;

				obs::log_response(&response);

				Ok(response)
			})
			.await;

		obs::record_op_result(KIND, &result);

		result
	}

	fn build_handler(&self, defaults: &RequestOptions) -> Handler {
		let mut handler = Handler::new(self.middlewares());

		if let Some(handler_override) = defaults.handler() {
			handler.push(handler_override.clone());
		}

		handler
	}
}
impl Default for RequestPipeline {
	fn default() -> Self {
		Self::new()
	}
}
impl Debug for RequestPipeline {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestPipeline")
			.field("middlewares", &self.middlewares.read().len())
			.field("defaults", &self.defaults)
			.field("executor_injected", &self.executor.is_some())
			.finish()
	}
}

fn normalize_method(method: &str) -> Result<String> {
	let method = method.to_ascii_uppercase();

	if method.is_empty() || !method.bytes().all(|b| b.is_ascii_alphabetic() || b == b'-') {
		return Err(ConfigError::InvalidMethod { method }.into());
	}

	Ok(method)
}

#[cfg(feature = "reqwest")]
fn default_executor() -> Result<Arc<dyn RequestExecutor>> {
	Ok(Arc::new(ReqwestExecutor::new()?))
}

#[cfg(not(feature = "reqwest"))]
fn default_executor() -> Result<Arc<dyn RequestExecutor>> {
	Err(ConfigError::MissingExecutor.into())
}
