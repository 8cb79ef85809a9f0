//! Naming and field-mapping configuration for a credential manager.

// self
use crate::_prelude::*;

/// Field names and cache-key parts used when resolving a credential.
///
/// Every field has a default, so a partial document such as `{"prefix": "tok:"}` deserializes
/// cleanly. Setting `expires_field` to `null` stores fetched tokens without expiry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
	/// Prefix prepended to the app id when deriving the cache key.
	pub prefix: String,
	/// Explicit cache key; overrides `prefix + app_id` when set.
	pub cache_key: Option<String>,
	/// Response field holding the token.
	pub token_field: String,
	/// Response field holding the lifetime in seconds.
	pub expires_field: Option<String>,
}
impl CredentialConfig {
	/// Default response field holding the token.
	pub const DEFAULT_TOKEN_FIELD: &'static str = "access_token";
	/// Default response field holding the lifetime in seconds.
	pub const DEFAULT_EXPIRES_FIELD: &'static str = "expires_in";

	/// Derives the cache key for `app_id`.
	pub fn cache_key_for(&self, app_id: &str) -> String {
		match &self.cache_key {
			Some(key) => key.clone(),
			None => format!("{}{app_id}", self.prefix),
		}
	}
}
impl Default for CredentialConfig {
	fn default() -> Self {
		Self {
			prefix: String::new(),
			cache_key: None,
			token_field: Self::DEFAULT_TOKEN_FIELD.into(),
			expires_field: Some(Self::DEFAULT_EXPIRES_FIELD.into()),
		}
	}
}
