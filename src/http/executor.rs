//! Request executors: the pipeline's only dependency on an HTTP stack.

// std
#[cfg(feature = "reqwest")]
use std::net::{IpAddr, Ipv4Addr};
// crates.io
#[cfg(feature = "reqwest")]
use reqwest::{
	Method,
	header::{HeaderMap, HeaderName, HeaderValue},
	multipart::{Form, Part},
};
#[cfg(feature = "reqwest")]
use tokio::fs;
// self
use crate::{
	_prelude::*,
	http::{RequestOptions, Response},
};
#[cfg(feature = "reqwest")]
use crate::{
	error::{ConfigError, TransportError},
	http::{FORM_PARAMS, HEADERS, JSON, MultipartPart, PartContents, QUERY},
};

/// Boxed future resolving to a [`Response`].
pub type ResponseFuture<'a> = Pin<Box<dyn Future<Output = Result<Response>> + 'a + Send>>;

/// Request as seen by middlewares and executors.
#[derive(Clone, Debug)]
pub struct PendingRequest {
	/// Uppercase HTTP method.
	pub method: String,
	/// Target URL.
	pub url: Url,
	/// Merged request options.
	pub options: RequestOptions,
}
impl PendingRequest {
	/// Creates a pending request.
	pub fn new(method: impl Into<String>, url: Url, options: RequestOptions) -> Self {
		Self { method: method.into(), url, options }
	}
}

/// Performs a single HTTP call.
///
/// Implementations must be `Send + Sync + 'static` so one executor can back many pipelines,
/// and they must surface network failures as [`Error::Transport`] without retrying.
pub trait RequestExecutor
where
	Self: 'static + Send + Sync,
{
	/// Executes `request` and buffers the full response.
	fn execute(&self, request: PendingRequest) -> ResponseFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared transport behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestExecutor(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestExecutor {
	/// Builds the default client, bound to the IPv4 unspecified address so lookups resolve to
	/// IPv4 endpoints.
	pub fn new() -> Result<Self> {
		let client = ReqwestClient::builder()
			.local_address(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
			.build()
			.map_err(ConfigError::from)?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	async fn send(&self, request: PendingRequest) -> Result<Response> {
		let PendingRequest { method, url, options } = request;
		let method = Method::from_bytes(method.as_bytes())
			.map_err(|_| ConfigError::InvalidMethod { method: method.clone() })?;
		let mut builder = self.0.request(method, url);

		if let Some(query) = options.pairs(QUERY)? {
			builder = builder.query(&query);
		}
		if let Some(form) = options.pairs(FORM_PARAMS)? {
			builder = builder.form(&form);
		}
		if let Some(json) = options.value(JSON).filter(|value| !value.is_null()) {
			builder = builder.json(json);
		}
		if let Some(parts) = options.multipart()? {
			builder = builder.multipart(build_form(parts).await?);
		}
		if let Some(headers) = options.pairs(HEADERS)? {
			builder = builder.headers(build_headers(headers)?);
		}
		if let Some(timeout) = options.timeout()? {
			builder = builder.timeout(timeout.unsigned_abs());
		}

		let response = builder.send().await.map_err(TransportError::from)?;
		let status = response.status();
		let mut headers = BTreeMap::<String, Vec<String>>::new();

		for (name, value) in response.headers() {
			headers
				.entry(name.as_str().to_owned())
				.or_default()
				.push(String::from_utf8_lossy(value.as_bytes()).into_owned());
		}

		let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

		Ok(Response {
			status: status.as_u16(),
			reason: status.canonical_reason().unwrap_or_default().to_owned(),
			headers,
			body,
		})
	}
}
#[cfg(feature = "reqwest")]
impl RequestExecutor for ReqwestExecutor {
	fn execute(&self, request: PendingRequest) -> ResponseFuture<'_> {
		Box::pin(self.send(request))
	}
}

#[cfg(feature = "reqwest")]
async fn build_form(parts: &[MultipartPart]) -> Result<Form> {
	let mut form = Form::new();

	for part in parts {
		form = match &part.contents {
			PartContents::Text(text) => form.text(part.name.clone(), text.clone()),
			PartContents::File(path) => {
				let data = fs::read(path).await.map_err(TransportError::from)?;
				let mut file_part = Part::bytes(data);

				if let Some(file_name) = path.file_name().and_then(|name| name.to_str()) {
					file_part = file_part.file_name(file_name.to_owned());
				}

				form.part(part.name.clone(), file_part)
			},
		};
	}

	Ok(form)
}

#[cfg(feature = "reqwest")]
fn build_headers(pairs: Vec<(String, String)>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::with_capacity(pairs.len());

	for (name, value) in pairs {
		let header_name = HeaderName::from_bytes(name.as_bytes())
			.map_err(|_| ConfigError::InvalidHeader { name: name.clone() })?;
		let header_value = HeaderValue::from_str(&value)
			.map_err(|_| ConfigError::InvalidHeader { name: name.clone() })?;

		headers.append(header_name, header_value);
	}

	Ok(headers)
}
