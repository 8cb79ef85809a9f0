//! Pipeline middleware that attaches manager-issued tokens to outbound requests.
//!
//! Register a [`CredentialMiddleware`] on the pipeline that talks to the protected API, never on
//! the pipeline the manager itself uses to fetch tokens: the refresh would re-enter the
//! middleware while holding the single-flight guard.

// self
use crate::{
	_prelude::*,
	credential::CredentialManager,
	http::{Middleware, Next, PendingRequest, ResponseFuture},
};

/// Where the token is written on the outbound request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TokenPlacement {
	/// `Authorization: Bearer <token>` header.
	#[default]
	Bearer,
	/// Query parameter with the given name (e.g. `access_token`).
	Query(String),
}

/// Resolves a token through a [`CredentialManager`] before every request.
#[derive(Clone, Debug)]
pub struct CredentialMiddleware {
	manager: Arc<CredentialManager>,
	placement: TokenPlacement,
}
impl CredentialMiddleware {
	/// Attaches tokens as a bearer header.
	pub fn bearer(manager: Arc<CredentialManager>) -> Self {
		Self { manager, placement: TokenPlacement::Bearer }
	}

	/// Attaches tokens as the `name` query parameter.
	pub fn query(manager: Arc<CredentialManager>, name: impl Into<String>) -> Self {
		Self { manager, placement: TokenPlacement::Query(name.into()) }
	}

	/// Returns the configured placement.
	pub fn placement(&self) -> &TokenPlacement {
		&self.placement
	}
}
impl Middleware for CredentialMiddleware {
	fn handle<'a>(&'a self, mut request: PendingRequest, next: Next<'a>) -> ResponseFuture<'a> {
		Box::pin(async move {
			let token = self.manager.get_token(false).await?;

			match &self.placement {
				TokenPlacement::Bearer =>
					request.options.set_header("Authorization", format!("Bearer {}", token.expose())),
				TokenPlacement::Query(name) =>
					request.options.set_query_param(name.as_str(), token.expose()),
			}

			next.run(request).await
		})
	}
}
