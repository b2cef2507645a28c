//! Run configuration
//!
//! Settings come from three layers, later layers winning:
//!
//! 1. built-in defaults (which differ between the Confluence commands
//!    and the port probe)
//! 2. an optional YAML profile passed with `--config`
//! 3. command-line flags
//!
//! ```yaml
//! url: https://wiki.example.com
//! auth:
//!   type: bearer
//!   token: pat-123
//! http:
//!   timeout_seconds: 20
//!   delay_seconds: 0.5
//!   insecure: true
//!   headers:
//!     X-Forwarded-For: 127.0.0.1
//! output:
//!   format: csv
//! ```

use crate::auth::AuthConfig;
use crate::collect::TreeLimits;
use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, Pacer, RateLimiterConfig};
use crate::types::{BackoffType, OutputFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Request timeout for Confluence commands when nothing else is set
pub const DEFAULT_TIMEOUT_SECONDS: f64 = 30.0;

/// Request timeout for the probe when nothing else is set
pub const DEFAULT_PROBE_TIMEOUT_SECONDS: f64 = 7.0;

/// Delay between probed ports when nothing else is set
pub const DEFAULT_PROBE_DELAY_SECONDS: f64 = 0.8;

// ============================================================================
// Profile
// ============================================================================

/// Complete run configuration loaded from YAML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconConfig {
    /// Confluence base URL
    #[serde(default)]
    pub url: Option<String>,

    /// Credentials
    #[serde(default)]
    pub auth: AuthConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpSettings,

    /// Report settings
    #[serde(default)]
    pub output: OutputSettings,

    /// Page tree bounds for `list --tree`
    #[serde(default)]
    pub tree: TreeSettings,
}

impl ReconConfig {
    /// Parse a YAML profile
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.http.validate()?;
        Ok(config)
    }

    /// Load a YAML profile from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Apply command-line overrides on top of this profile
    pub fn apply(&mut self, overrides: Overrides) -> Result<()> {
        let Overrides {
            timeout_seconds,
            delay_seconds,
            jitter_seconds,
            insecure,
            max_retries,
            user_agent,
            headers,
            auth,
            format,
            no_progress,
        } = overrides;

        if timeout_seconds.is_some() {
            self.http.timeout_seconds = timeout_seconds;
        }
        if delay_seconds.is_some() {
            self.http.delay_seconds = delay_seconds;
        }
        if let Some(jitter) = jitter_seconds {
            self.http.jitter_seconds = jitter;
        }
        if insecure {
            self.http.insecure = true;
        }
        if let Some(retries) = max_retries {
            self.http.max_retries = retries;
        }
        if user_agent.is_some() {
            self.http.user_agent = user_agent;
        }
        for raw in headers {
            let (key, value) = parse_header(&raw)?;
            self.http.headers.insert(key, value);
        }
        if let Some(auth) = auth {
            self.auth = auth;
        }
        if let Some(format) = format {
            self.output.format = format;
        }
        if no_progress {
            self.output.progress = false;
        }

        self.http.validate()
    }

    /// Base URL, taken from the command line first and the profile second
    pub fn resolve_url(&self, cli_url: Option<&str>) -> Result<String> {
        let url = cli_url
            .map(str::to_string)
            .or_else(|| self.url.clone())
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| Error::missing_field("--url"))?;

        let parsed = url::Url::parse(&url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::invalid_value(
                "url",
                format!("expected an http(s) URL, got '{url}'"),
            ));
        }
        Ok(url.trim_end_matches('/').to_string())
    }

    /// HTTP client settings for the Confluence REST commands
    pub fn client_config(&self, base_url: &str) -> Result<HttpClientConfig> {
        let http = &self.http;
        let mut builder = HttpClientConfig::builder()
            .base_url(base_url)
            .timeout(seconds(
                "timeout",
                http.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            )?)
            .max_retries(http.max_retries)
            .backoff(
                http.backoff.backoff_type,
                Duration::from_millis(http.backoff.initial_ms),
                Duration::from_millis(http.backoff.max_ms),
            )
            .header("Accept", "application/json")
            .header("X-Atlassian-Token", "no-check")
            .accept_invalid_certs(http.insecure)
            .auth(self.auth.clone());

        if let Some(agent) = &http.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        for (key, value) in &http.headers {
            builder = builder.header(key.clone(), value.clone());
        }
        builder = match &http.rate_limit {
            Some(limit) => builder.rate_limit(RateLimiterConfig::new(
                limit.requests_per_second,
                limit.burst_size,
            )),
            None => builder.no_rate_limit(),
        };

        Ok(builder.build())
    }

    /// Polite delay between requests
    pub fn pacer(&self, default_delay_seconds: f64) -> Result<Pacer> {
        let delay = seconds(
            "delay",
            self.http.delay_seconds.unwrap_or(default_delay_seconds),
        )?;
        let jitter = seconds("jitter", self.http.jitter_seconds)?;
        Ok(Pacer::new(delay, jitter))
    }

    /// Probe request timeout
    pub fn probe_timeout(&self) -> Result<Duration> {
        seconds(
            "timeout",
            self.http
                .timeout_seconds
                .unwrap_or(DEFAULT_PROBE_TIMEOUT_SECONDS),
        )
    }
}

/// Convert a seconds value from a flag or profile into a `Duration`
fn seconds(field: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        Error::invalid_value(field, format!("expected a non-negative number of seconds, got {value}"))
    })
}

/// Split a `-H "Key: value"` argument
pub fn parse_header(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once(':')
        .ok_or_else(|| Error::invalid_value("header", format!("expected 'Key: value', got '{raw}'")))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::invalid_value("header", format!("empty header name in '{raw}'")));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

// ============================================================================
// HTTP Settings
// ============================================================================

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Request timeout in seconds; per-command default when unset
    #[serde(default)]
    pub timeout_seconds: Option<f64>,

    /// Pause between requests in seconds; per-command default when unset
    #[serde(default)]
    pub delay_seconds: Option<f64>,

    /// Random extra pause in seconds, added on top of the delay
    #[serde(default)]
    pub jitter_seconds: f64,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure: bool,

    /// Retries on transient statuses and connect errors
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed user agent
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Extra headers sent with every Confluence request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Retry backoff
    #[serde(default)]
    pub backoff: BackoffSettings,

    /// Optional token bucket on top of the delay
    #[serde(default)]
    pub rate_limit: Option<RateLimitSettings>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: None,
            delay_seconds: None,
            jitter_seconds: 0.0,
            insecure: false,
            max_retries: default_max_retries(),
            user_agent: None,
            headers: BTreeMap::new(),
            backoff: BackoffSettings::default(),
            rate_limit: None,
        }
    }
}

impl HttpSettings {
    fn validate(&self) -> Result<()> {
        if let Some(timeout) = self.timeout_seconds {
            if timeout.is_nan() || timeout <= 0.0 {
                return Err(Error::invalid_value(
                    "timeout",
                    format!("must be greater than zero, got {timeout}"),
                ));
            }
        }
        for (field, value) in [
            ("delay", self.delay_seconds.unwrap_or(0.0)),
            ("jitter", self.jitter_seconds),
        ] {
            seconds(field, value)?;
        }
        if let Some(limit) = &self.rate_limit {
            if limit.requests_per_second == 0 {
                return Err(Error::invalid_value(
                    "rate_limit.requests_per_second",
                    "must be at least 1",
                ));
            }
        }
        Ok(())
    }
}

fn default_max_retries() -> u32 {
    1
}

/// Backoff configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffSettings {
    /// Type of backoff
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
        }
    }
}

fn default_initial_ms() -> u64 {
    200
}

fn default_max_ms() -> u64 {
    30_000
}

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Requests per second limit
    pub requests_per_second: u32,

    /// Burst size
    #[serde(default = "default_burst")]
    pub burst_size: u32,
}

fn default_burst() -> u32 {
    1
}

// ============================================================================
// Output and Tree Settings
// ============================================================================

/// Report settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Report file format
    #[serde(default)]
    pub format: OutputFormat,

    /// Draw progress bars on stderr
    #[serde(default = "default_true")]
    pub progress: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            progress: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Page tree bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSettings {
    /// Deepest level that is still expanded
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Stop adding pages after this many per space
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,
}

impl Default for TreeSettings {
    fn default() -> Self {
        let limits = TreeLimits::default();
        Self {
            max_depth: limits.max_depth,
            max_nodes: limits.max_nodes,
        }
    }
}

impl TreeSettings {
    /// Limits for the tree walk, with command-line values taking precedence
    pub fn limits(&self, max_depth: Option<usize>, max_nodes: Option<usize>) -> TreeLimits {
        TreeLimits {
            max_depth: max_depth.unwrap_or(self.max_depth),
            max_nodes: max_nodes.unwrap_or(self.max_nodes),
        }
    }
}

fn default_max_depth() -> usize {
    TreeLimits::default().max_depth
}

fn default_max_nodes() -> usize {
    TreeLimits::default().max_nodes
}

// ============================================================================
// Command-Line Overrides
// ============================================================================

/// Values given on the command line, applied over the profile
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `--timeout`
    pub timeout_seconds: Option<f64>,
    /// `--delay`
    pub delay_seconds: Option<f64>,
    /// `--jitter`
    pub jitter_seconds: Option<f64>,
    /// `--insecure`
    pub insecure: bool,
    /// `--max-retries`
    pub max_retries: Option<u32>,
    /// `--user-agent`
    pub user_agent: Option<String>,
    /// Raw `-H` values
    pub headers: Vec<String>,
    /// Credentials assembled from `--user/--password`, `--token` or `--cookie`
    pub auth: Option<AuthConfig>,
    /// `--format`
    pub format: Option<OutputFormat>,
    /// `--no-progress`
    pub no_progress: bool,
}

/// Build credentials from the mutually exclusive auth flags
pub fn auth_from_flags(
    user: Option<String>,
    password: Option<String>,
    token: Option<String>,
    cookie: Option<String>,
) -> Result<Option<AuthConfig>> {
    let given = [user.is_some() || password.is_some(), token.is_some(), cookie.is_some()]
        .into_iter()
        .filter(|set| *set)
        .count();
    if given > 1 {
        return Err(Error::config(
            "use only one of --user/--password, --token or --cookie",
        ));
    }

    if let Some(token) = token {
        return Ok(Some(AuthConfig::Bearer { token }));
    }
    if let Some(value) = cookie {
        return Ok(Some(AuthConfig::Cookie { value }));
    }
    match (user, password) {
        (Some(username), Some(password)) => Ok(Some(AuthConfig::Basic { username, password })),
        (Some(_), None) => Err(Error::missing_field("--password")),
        (None, Some(_)) => Err(Error::missing_field("--user")),
        (None, None) => Ok(None),
    }
}
