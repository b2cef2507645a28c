//! Authentication module
//!
//! Supports: Basic, Bearer, Session Cookie, Custom Headers
//!
//! Confluence accepts anonymous access on misconfigured instances, so
//! `AuthConfig::None` is the default. Credentials are supplied by the
//! caller and applied to every request by the `Authenticator`.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::AuthConfig;
