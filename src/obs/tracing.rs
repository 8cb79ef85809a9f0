// self
use crate::{
	_prelude::*,
	credential::TokenSource,
	http::{RequestOptions, Response},
	obs::OpKind,
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// A span builder used by the manager and the pipeline.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(kind: OpKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::debug_span!("token_foundation.op", op = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Logs an outbound request before dispatch.
pub fn log_request(url: &Url, method: &str, options: &RequestOptions) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(url = %url, method, options = ?options, "Client request.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (url, method, options);
	}
}

/// Logs an inbound response after dispatch.
pub fn log_response(response: &Response) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(
			status = response.status,
			reason = %response.reason,
			headers = ?response.headers,
			body = %response.text(),
			"API response."
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = response;
	}
}

/// Logs where a resolved token came from. The token itself is never logged.
pub fn log_token_source(cache_key: &str, source: TokenSource) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(cache_key, source = source.as_str(), "Token resolved.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (cache_key, source);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = OpSpan::new(OpKind::Request, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}

	#[test]
	fn log_helpers_never_panic() {
		let url = Url::parse("https://api.example.com/").expect("Fixture URL should parse.");

		log_request(&url, "GET", &RequestOptions::new());
		log_response(&Response::new(200).with_body("ok"));
		log_token_source("tok:app1", TokenSource::Cache);
	}
}
