//! Client identity and secret material handled by the credential manager.

pub mod identity;
pub mod secret;

pub use identity::*;
pub use secret::*;
