//! Probe types

use crate::error::{Error, Result};
use crate::http::TransportFailure;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use std::fmt;
use std::time::Duration;

/// Common web ports, probed in this order by default
pub const DEFAULT_PORTS: [u16; 35] = [
    80, 443, 8080, 8000, 8008, 8888, 8081, 8181, 3000, 3001, 3002, 5000, 5001, 4200, 4201, 8443,
    9443, 10443, 8444, 9200, 9300, 5601, 5984, 9090, 9091, 10000, 10080, 7000, 7001, 8880, 7080,
    7081, 3168, 4161, 49152,
];

/// Browser user agents; one is picked at random per run
pub const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36",
];

/// Accept header sent with every probe
pub const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// CSV header for probe results
pub const PROBE_HEADER: [&str; 9] = [
    "timestamp",
    "target",
    "port",
    "scheme",
    "url",
    "result",
    "status_code",
    "reason",
    "notes",
];

/// Longest body snippet kept in the notes column
pub const NOTES_MAX_CHARS: usize = 200;

// ============================================================================
// Scheme
// ============================================================================

/// URL scheme of a probe attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// TLS
    Https,
    /// Plain text
    Http,
}

impl Scheme {
    /// Lowercase scheme name
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Https => "https",
            Scheme::Http => "http",
        }
    }

    /// Port implied by the scheme
    pub fn standard_port(self) -> u16 {
        match self {
            Scheme::Https => 443,
            Scheme::Http => 80,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the URL for one attempt, omitting the port when it is the scheme's default
pub fn probe_url(scheme: Scheme, target: &str, port: u16, path: &str) -> String {
    if port == scheme.standard_port() {
        format!("{scheme}://{target}{path}")
    } else {
        format!("{scheme}://{target}:{port}{path}")
    }
}

/// Ensure a request path starts with `/`
pub fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Parse a comma-separated port list; empty entries are ignored
pub fn parse_ports(list: &str) -> Result<Vec<u16>> {
    let ports = list
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            p.parse::<u16>()
                .ok()
                .filter(|port| *port > 0)
                .ok_or_else(|| Error::invalid_value("ports", format!("'{p}' is not a port")))
        })
        .collect::<Result<Vec<_>>>()?;

    if ports.is_empty() {
        return Err(Error::invalid_value("ports", "no ports given"));
    }
    Ok(ports)
}

// ============================================================================
// Verdict
// ============================================================================

/// Classification of one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeVerdict {
    /// 503 Service Unavailable
    NotOpen,
    /// Any other HTTP response
    PotentialOpen,
    /// No HTTP response at all
    NoResponse(TransportFailure),
}

impl ProbeVerdict {
    /// Classify an HTTP response by status and reason phrase
    pub fn from_response(status: u16, reason: Option<&str>) -> Self {
        if status == 503 && reason.is_some_and(|r| r.contains("Service Unavailable")) {
            ProbeVerdict::NotOpen
        } else {
            ProbeVerdict::PotentialOpen
        }
    }

    /// Whether the attempt got an HTTP response
    pub fn responded(self) -> bool {
        !matches!(self, ProbeVerdict::NoResponse(_))
    }
}

impl fmt::Display for ProbeVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeVerdict::NotOpen => f.write_str("NOT OPEN (503 Service Unavailable)"),
            ProbeVerdict::PotentialOpen => f.write_str("POTENTIAL OPEN"),
            ProbeVerdict::NoResponse(kind) => write!(f, "NO RESPONSE ({})", kind.label()),
        }
    }
}

/// Reason phrase for a status code
///
/// reqwest does not surface the phrase the server sent, so the canonical
/// one is used.
pub fn reason_phrase(status: u16) -> Option<&'static str> {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
}

// ============================================================================
// Results
// ============================================================================

/// One probe attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    /// When the attempt finished
    pub timestamp: DateTime<Utc>,
    /// Probed host
    pub target: String,
    /// Probed port
    pub port: u16,
    /// Scheme tried
    pub scheme: Scheme,
    /// Full URL requested
    pub url: String,
    /// Classification
    pub verdict: ProbeVerdict,
    /// HTTP status, when there was a response
    pub status: Option<u16>,
    /// Reason phrase, when there was a response
    pub reason: Option<String>,
    /// Error text, or the start of the body
    pub notes: String,
}

impl ProbeResult {
    /// Timestamp as `YYYY-MM-DDTHH:MM:SSZ`
    pub fn timestamp_text(&self) -> String {
        self.timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }

    /// CSV fields in header order
    pub fn csv_fields(&self) -> [String; 9] {
        [
            self.timestamp_text(),
            self.target.clone(),
            self.port.to_string(),
            self.scheme.to_string(),
            self.url.clone(),
            self.verdict.to_string(),
            self.status.map(|s| s.to_string()).unwrap_or_default(),
            self.reason.clone().unwrap_or_default(),
            self.notes.clone(),
        ]
    }
}

/// Counts over a finished probe run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeSummary {
    /// Attempts made
    pub attempts: usize,
    /// Ports with a non-503 response
    pub potential_open: Vec<u16>,
    /// Ports answering 503
    pub not_open: Vec<u16>,
    /// Ports where no scheme got a response
    pub no_response: Vec<u16>,
}

// ============================================================================
// Configuration
// ============================================================================

/// Probe run settings
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Host name or IP, without scheme
    pub target: String,
    /// Ports in probe order
    pub ports: Vec<u16>,
    /// Request path
    pub path: String,
    /// Schemes in the order they are tried
    pub schemes: Vec<Scheme>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries on transient statuses
    pub max_retries: u32,
    /// Verify TLS certificates
    pub verify_tls: bool,
    /// Fixed user agent; random browser agent when unset
    pub user_agent: Option<String>,
}

impl ProbeConfig {
    /// Settings for `target` with the default port list
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ports: DEFAULT_PORTS.to_vec(),
            path: "/".to_string(),
            schemes: vec![Scheme::Https, Scheme::Http],
            timeout: Duration::from_secs(7),
            max_retries: 1,
            verify_tls: false,
            user_agent: None,
        }
    }

    /// Set the ports
    #[must_use]
    pub fn ports(mut self, ports: Vec<u16>) -> Self {
        self.ports = ports;
        self
    }

    /// Set the request path
    #[must_use]
    pub fn path(mut self, path: &str) -> Self {
        self.path = normalize_path(path);
        self
    }

    /// Set the scheme order
    #[must_use]
    pub fn schemes(mut self, schemes: Vec<Scheme>) -> Self {
        self.schemes = schemes;
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry count
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Toggle TLS verification
    #[must_use]
    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    /// Use a fixed user agent
    #[must_use]
    pub fn user_agent(mut self, agent: Option<String>) -> Self {
        self.user_agent = agent;
        self
    }
}

impl ProbeConfig {
    /// Reject settings that cannot produce a request
    pub fn validate(&self) -> Result<()> {
        if self.target.trim().is_empty() {
            return Err(Error::missing_field("target"));
        }
        if self.target.contains("://") || self.target.contains('/') {
            return Err(Error::invalid_value(
                "target",
                "expected a host name or IP without scheme or path",
            ));
        }
        if self.ports.is_empty() {
            return Err(Error::invalid_value("ports", "no ports given"));
        }
        if self.schemes.is_empty() {
            return Err(Error::invalid_value("schemes", "no schemes given"));
        }
        Ok(())
    }
}
