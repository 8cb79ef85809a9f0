//! Request option maps and their shallow merge semantics.

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::{Middleware, MultipartPart},
};

/// Query-string parameters (object of scalars).
pub const QUERY: &str = "query";
/// URL-encoded form parameters (object of scalars).
pub const FORM_PARAMS: &str = "form_params";
/// JSON request body (any JSON value).
pub const JSON: &str = "json";
/// Multipart parts built by [`RequestPipeline::upload`](crate::http::RequestPipeline::upload).
pub const MULTIPART: &str = "multipart";
/// Request headers (object of scalars).
pub const HEADERS: &str = "headers";
/// Per-request timeout in seconds.
pub const TIMEOUT: &str = "timeout";
/// Middleware appended after the registered chain when present in the default options.
pub const HANDLER: &str = "handler";

/// Single option value.
#[derive(Clone)]
pub enum OptionValue {
	/// Plain JSON-shaped value.
	Value(Value),
	/// Multipart part list.
	Multipart(Vec<MultipartPart>),
	/// Handler override.
	Handler(Arc<dyn Middleware>),
}
impl OptionValue {
	/// Returns the JSON value, if this option holds one.
	pub fn as_value(&self) -> Option<&Value> {
		match self {
			Self::Value(value) => Some(value),
			_ => None,
		}
	}
}
impl Debug for OptionValue {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
			Self::Multipart(parts) => f.debug_tuple("Multipart").field(parts).finish(),
			Self::Handler(_) => f.write_str("Handler(..)"),
		}
	}
}
impl From<Value> for OptionValue {
	fn from(value: Value) -> Self {
		Self::Value(value)
	}
}
impl From<Vec<MultipartPart>> for OptionValue {
	fn from(parts: Vec<MultipartPart>) -> Self {
		Self::Multipart(parts)
	}
}
impl From<Arc<dyn Middleware>> for OptionValue {
	fn from(handler: Arc<dyn Middleware>) -> Self {
		Self::Handler(handler)
	}
}

/// Ordered option-name → value mapping passed through the request pipeline.
///
/// [`RequestOptions::merge`] is a one-level merge: a key present on both sides takes the
/// override's value whole, nested objects included.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions(BTreeMap<String, OptionValue>);
impl RequestOptions {
	/// Creates an empty option map.
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts `value` under `key`, returning the updated map.
	pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
		self.insert(key, value);

		self
	}

	/// Sets the `query` option.
	pub fn with_query(self, query: Value) -> Self {
		self.with(QUERY, query)
	}

	/// Sets the `form_params` option.
	pub fn with_form_params(self, form_params: Value) -> Self {
		self.with(FORM_PARAMS, form_params)
	}

	/// Sets the `json` option.
	pub fn with_json(self, json: Value) -> Self {
		self.with(JSON, json)
	}

	/// Sets the `multipart` option.
	pub fn with_multipart(self, parts: Vec<MultipartPart>) -> Self {
		self.with(MULTIPART, parts)
	}

	/// Sets the `headers` option.
	pub fn with_headers(self, headers: Value) -> Self {
		self.with(HEADERS, headers)
	}

	/// Sets the `timeout` option.
	pub fn with_timeout(self, timeout: Duration) -> Self {
		self.with(TIMEOUT, Value::from(timeout.as_seconds_f64()))
	}

	/// Sets the `handler` option.
	pub fn with_handler(self, handler: impl Middleware) -> Self {
		let handler: Arc<dyn Middleware> = Arc::new(handler);

		self.with(HANDLER, handler)
	}

	/// Inserts `value` under `key`, returning the previous value.
	pub fn insert(
		&mut self,
		key: impl Into<String>,
		value: impl Into<OptionValue>,
	) -> Option<OptionValue> {
		self.0.insert(key.into(), value.into())
	}

	/// Removes and returns the value stored under `key`.
	pub fn remove(&mut self, key: &str) -> Option<OptionValue> {
		self.0.remove(key)
	}

	/// Returns the value stored under `key`.
	pub fn get(&self, key: &str) -> Option<&OptionValue> {
		self.0.get(key)
	}

	/// Returns the JSON value stored under `key`.
	pub fn value(&self, key: &str) -> Option<&Value> {
		self.get(key).and_then(OptionValue::as_value)
	}

	/// Returns `true` if `key` is present.
	pub fn contains_key(&self, key: &str) -> bool {
		self.0.contains_key(key)
	}

	/// Returns the number of options.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when no options are set.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterates options in key order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
		self.0.iter().map(|(key, value)| (key.as_str(), value))
	}

	/// Shallow-merges `overrides` on top of `self`; `overrides` wins on key collisions.
	pub fn merge(mut self, overrides: RequestOptions) -> Self {
		self.0.extend(overrides.0);

		self
	}

	/// Sets one header inside the `headers` option, creating the object when needed.
	pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
		let entry =
			self.0.entry(HEADERS.into()).or_insert_with(|| Value::Object(JsonMap::new()).into());

		if !matches!(entry, OptionValue::Value(Value::Object(_))) {
			*entry = Value::Object(JsonMap::new()).into();
		}
		if let OptionValue::Value(Value::Object(headers)) = entry {
			headers.insert(name.into(), Value::String(value.into()));
		}
	}

	/// Sets one parameter inside the `query` option, creating the object when needed.
	pub fn set_query_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
		let entry =
			self.0.entry(QUERY.into()).or_insert_with(|| Value::Object(JsonMap::new()).into());

		if !matches!(entry, OptionValue::Value(Value::Object(_))) {
			*entry = Value::Object(JsonMap::new()).into();
		}
		if let OptionValue::Value(Value::Object(query)) = entry {
			query.insert(name.into(), Value::String(value.into()));
		}
	}

	/// Returns the handler override stored under `handler`.
	pub fn handler(&self) -> Option<&Arc<dyn Middleware>> {
		match self.get(HANDLER) {
			Some(OptionValue::Handler(handler)) => Some(handler),
			_ => None,
		}
	}

	/// Returns the multipart parts stored under `multipart`.
	pub fn multipart(&self) -> Result<Option<&[MultipartPart]>> {
		match self.get(MULTIPART) {
			None | Some(OptionValue::Value(Value::Null)) => Ok(None),
			Some(OptionValue::Multipart(parts)) => Ok(Some(parts)),
			Some(_) => Err(invalid(MULTIPART, "a multipart part list")),
		}
	}

	/// Flattens an object option (`query`, `form_params`, `headers`) into string pairs.
	///
	/// `null` members are skipped; numbers and booleans are rendered with `to_string`.
	pub fn pairs(&self, key: &str) -> Result<Option<Vec<(String, String)>>> {
		const EXPECTED: &str = "an object of scalar values";

		let object = match self.get(key) {
			None | Some(OptionValue::Value(Value::Null)) => return Ok(None),
			Some(OptionValue::Value(Value::Object(object))) => object,
			Some(_) => return Err(invalid(key, EXPECTED)),
		};
		let mut pairs = Vec::with_capacity(object.len());

		for (name, value) in object {
			let rendered = match value {
				Value::Null => continue,
				Value::String(s) => s.clone(),
				Value::Bool(_) | Value::Number(_) => value.to_string(),
				Value::Array(_) | Value::Object(_) => return Err(invalid(key, EXPECTED)),
			};

			pairs.push((name.clone(), rendered));
		}

		Ok(Some(pairs))
	}

	/// Returns the per-request timeout stored under `timeout`.
	pub fn timeout(&self) -> Result<Option<Duration>> {
		const EXPECTED: &str = "a non-negative number of seconds";

		match self.get(TIMEOUT) {
			None | Some(OptionValue::Value(Value::Null)) => Ok(None),
			Some(OptionValue::Value(Value::Number(n))) => n
				.as_f64()
				.filter(|secs| *secs >= 0.)
				.and_then(Duration::checked_seconds_f64)
				.map(Some)
				.ok_or_else(|| invalid(TIMEOUT, EXPECTED)),
			Some(_) => Err(invalid(TIMEOUT, EXPECTED)),
		}
	}
}
impl<K, V> FromIterator<(K, V)> for RequestOptions
where
	K: Into<String>,
	V: Into<OptionValue>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self(iter.into_iter().map(|(key, value)| (key.into(), value.into())).collect())
	}
}

fn invalid(key: &str, expected: &'static str) -> Error {
	ConfigError::InvalidOption { key: key.into(), expected }.into()
}
