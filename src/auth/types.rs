//! Auth configuration types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Authentication configuration
///
/// Deserializes from the `auth` section of a profile:
///
/// ```yaml
/// auth:
///   type: basic
///   username: alice
///   password: secret
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// HTTP Basic authentication (user + password or API token)
    Basic {
        /// Username or account email
        username: String,
        /// Password or API token
        password: String,
    },

    /// Bearer token authentication (personal access token)
    Bearer {
        /// The bearer token
        token: String,
    },

    /// Raw `Cookie` header, e.g. a captured `JSESSIONID=...`
    Cookie {
        /// Cookie header value
        value: String,
    },

    /// Custom headers
    Headers {
        /// Headers to add to each request
        headers: BTreeMap<String, String>,
    },
}

impl AuthConfig {
    /// Check if any credentials are configured
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Short label for logs, never includes secrets
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "anonymous",
            Self::Basic { .. } => "basic",
            Self::Bearer { .. } => "bearer",
            Self::Cookie { .. } => "cookie",
            Self::Headers { .. } => "headers",
        }
    }
}
