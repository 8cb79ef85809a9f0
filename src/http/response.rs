//! Buffered HTTP responses returned by the request pipeline.

// std
use std::borrow::Cow;
// crates.io
use serde::de::DeserializeOwned;
// self
use crate::_prelude::*;

/// Fully buffered response.
///
/// Header names are stored lowercase; each maps to its values in arrival order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Response {
	/// HTTP status code.
	pub status: u16,
	/// Canonical reason phrase for the status, empty when unknown.
	pub reason: String,
	/// Response headers.
	pub headers: BTreeMap<String, Vec<String>>,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl Response {
	/// Creates an empty response with the provided status.
	pub fn new(status: u16) -> Self {
		Self { status, ..Default::default() }
	}

	/// Sets the reason phrase.
	pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
		self.reason = reason.into();

		self
	}

	/// Appends a header value.
	pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
		self.headers.entry(name.to_ascii_lowercase()).or_default().push(value.into());

		self
	}

	/// Replaces the body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = body.into();

		self
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns the first value of the named header (case-insensitive).
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.get(&name.to_ascii_lowercase())
			.and_then(|values| values.first())
			.map(String::as_str)
	}

	/// Returns the body as text, replacing invalid UTF-8 sequences.
	pub fn text(&self) -> Cow<'_, str> {
		String::from_utf8_lossy(&self.body)
	}

	/// Decodes the body as JSON, reporting the failing path on error.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| Error::Decode { source, status: self.status })
	}
}
