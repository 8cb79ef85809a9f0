//! Application identity handed to credential sources.

// self
use crate::{_prelude::*, auth::Secret};

/// Application identity (`app_id` + `secret`) used when requesting credentials.
///
/// The manager never validates or logs these values; `Debug` redacts the secret.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
	/// Application identifier issued by the credential authority.
	pub app_id: String,
	/// Application secret paired with [`Identity::app_id`].
	pub secret: Secret,
}
impl Identity {
	/// Creates a new identity.
	pub fn new(app_id: impl Into<String>, secret: impl Into<Secret>) -> Self {
		Self { app_id: app_id.into(), secret: secret.into() }
	}
}
