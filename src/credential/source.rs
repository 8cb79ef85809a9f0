//! Adapter contract implemented once per vendor.
//!
//! A [`CredentialSource`] knows how to ask one remote authority for a token
//! ([`fetch_token`](CredentialSource::fetch_token)) and how to recognize that authority's error
//! payloads ([`check_response`](CredentialSource::check_response)). Everything else (caching,
//! single-flight, field extraction, persistence) lives in
//! [`CredentialManager`](crate::credential::CredentialManager).

// self
use crate::{
	_prelude::*,
	auth::{Identity, Secret},
	http::{RequestPipeline, Response},
};

/// Boxed future returned by [`CredentialSource::fetch_token`].
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Vendor adapter that fetches and validates raw token responses.
pub trait CredentialSource
where
	Self: Send + Sync,
{
	/// Requests a fresh token from the remote authority.
	fn fetch_token<'a>(&'a self, context: &'a FetchContext) -> SourceFuture<'a, ServerResponse>;

	/// Rejects responses that signal an error, typically with
	/// [`Error::invalid_credential_response`].
	fn check_response(&self, response: &ServerResponse) -> Result<()>;
}

/// Inputs handed to [`CredentialSource::fetch_token`].
#[derive(Clone, Debug)]
pub struct FetchContext {
	identity: Identity,
	cache_key: String,
	http: Arc<RequestPipeline>,
}
impl FetchContext {
	/// Creates a context from an identity snapshot and the manager's pipeline.
	pub fn new(identity: Identity, cache_key: impl Into<String>, http: Arc<RequestPipeline>) -> Self {
		Self { identity, cache_key: cache_key.into(), http }
	}

	/// Identity snapshot taken when the refresh started.
	pub fn identity(&self) -> &Identity {
		&self.identity
	}

	/// Application identifier.
	pub fn app_id(&self) -> &str {
		&self.identity.app_id
	}

	/// Application secret.
	pub fn secret(&self) -> &Secret {
		&self.identity.secret
	}

	/// Cache key the fetched token will be stored under.
	pub fn cache_key(&self) -> &str {
		&self.cache_key
	}

	/// Request pipeline shared with the manager.
	pub fn http(&self) -> &RequestPipeline {
		&self.http
	}
}

/// JSON object returned by a credential server.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerResponse(JsonMap<String, Value>);
impl ServerResponse {
	/// Wraps a decoded JSON object.
	pub fn new(fields: JsonMap<String, Value>) -> Self {
		Self(fields)
	}

	/// Decodes a pipeline response body as a JSON object.
	pub fn from_response(response: &Response) -> Result<Self> {
		response.json()
	}

	/// Returns the raw value of `field`.
	pub fn get(&self, field: &str) -> Option<&Value> {
		self.0.get(field)
	}

	/// Returns `true` when `field` is present.
	pub fn contains(&self, field: &str) -> bool {
		self.0.contains_key(field)
	}

	/// Returns the underlying JSON object.
	pub fn fields(&self) -> &JsonMap<String, Value> {
		&self.0
	}

	/// Reads the token stored under `field`; it must be a non-empty string.
	pub fn token(&self, field: &str) -> Result<Secret> {
		match self.require(field)? {
			Value::String(token) if !token.is_empty() => Ok(Secret::new(token.as_str())),
			_ => Err(Error::InvalidField { field: field.into(), expected: "a non-empty string" }),
		}
	}

	/// Reads the lifetime stored under `field`: whole seconds as a number or a numeric string.
	pub fn expires_in(&self, field: &str) -> Result<Duration> {
		let seconds = match self.require(field)? {
			Value::Number(number) => number.as_u64(),
			Value::String(text) => text.trim().parse::<u64>().ok(),
			_ => None,
		};

		seconds
			.and_then(|seconds| i64::try_from(seconds).ok())
			.map(Duration::seconds)
			.ok_or_else(|| Error::InvalidField {
				field: field.into(),
				expected: "a non-negative integer of seconds",
			})
	}

	fn require(&self, field: &str) -> Result<&Value> {
		self.0.get(field).ok_or_else(|| Error::MissingField { field: field.into() })
	}
}
impl From<JsonMap<String, Value>> for ServerResponse {
	fn from(fields: JsonMap<String, Value>) -> Self {
		Self(fields)
	}
}
impl TryFrom<Value> for ServerResponse {
	type Error = Error;

	fn try_from(value: Value) -> Result<Self> {
		match value {
			Value::Object(fields) => Ok(Self(fields)),
			_ => Err(Error::invalid_credential_response("response is not a JSON object")),
		}
	}
}
impl Debug for ServerResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServerResponse").field("fields", &self.0.keys().collect::<Vec<_>>()).finish()
	}
}
