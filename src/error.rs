//! Crate-level error types shared by the credential manager, request pipeline, and caches.

pub use crate::cache::CacheError;

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Cache backend failure.
	#[error("{0}")]
	Cache(
		#[from]
		#[source]
		CacheError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, IO, deadline).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Response body did not match the expected JSON shape.
	#[error("Response body could not be decoded as JSON.")]
	Decode {
		/// Path-aware decoding failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the decoded response.
		status: u16,
	},
	/// Credential server signalled an error in its token response.
	#[error("Credential server rejected the token request: {reason}.")]
	InvalidCredentialResponse {
		/// Adapter-supplied reason string.
		reason: String,
	},
	/// A configured response field is absent.
	#[error("Credential response is missing the `{field}` field.")]
	MissingField {
		/// Name of the missing field.
		field: String,
	},
	/// A configured response field holds a value of the wrong type.
	#[error("Credential response field `{field}` must be {expected}.")]
	InvalidField {
		/// Name of the offending field.
		field: String,
		/// Human-readable description of the accepted shape.
		expected: &'static str,
	},
}
impl Error {
	/// Builds an [`Error::InvalidCredentialResponse`] from an adapter-supplied reason.
	pub fn invalid_credential_response(reason: impl Into<String>) -> Self {
		Self::InvalidCredentialResponse { reason: reason.into() }
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// No request executor was injected and the default transport is disabled.
	#[error("No request executor is configured; enable the `reqwest` feature or inject one.")]
	MissingExecutor,
	/// HTTP method is not a valid token.
	#[error("HTTP method `{method}` is invalid.")]
	InvalidMethod {
		/// Method string supplied by the caller.
		method: String,
	},
	/// Request URL cannot be parsed.
	#[error("Request URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A request option holds a value the executor cannot interpret.
	#[error("Request option `{key}` must be {expected}.")]
	InvalidOption {
		/// Option key.
		key: String,
		/// Human-readable description of the accepted shape.
		expected: &'static str,
	},
	/// Header name or value is not valid HTTP.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Header name as supplied.
		name: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, deadlines).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while dispatching the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while dispatching the request.")]
	Io(#[from] std::io::Error),
	/// The operation did not complete before its deadline.
	#[error("Operation timed out after {after}.")]
	Timeout {
		/// Deadline that elapsed.
		after: Duration,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn cache_error_converts_into_crate_error_with_source() {
		let cache_error = CacheError::Backend { message: "disk unreachable".into() };
		let error: Error = cache_error.clone().into();

		assert!(matches!(error, Error::Cache(_)));
		assert!(error.to_string().contains("disk unreachable"));

		let source = StdError::source(&error)
			.expect("Crate error should expose the original cache error as its source.");

		assert_eq!(source.to_string(), cache_error.to_string());
	}

	#[test]
	fn io_errors_surface_as_transport_failures() {
		let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing upload");
		let error: Error = TransportError::from(io).into();

		assert!(matches!(error, Error::Transport(TransportError::Io(_))));
	}

	#[test]
	fn field_errors_name_the_field() {
		let missing = Error::MissingField { field: "access_token".into() };
		let invalid = Error::InvalidField { field: "expires_in".into(), expected: "an integer" };

		assert_eq!(missing.to_string(), "Credential response is missing the `access_token` field.");
		assert_eq!(invalid.to_string(), "Credential response field `expires_in` must be an integer.");
	}
}
