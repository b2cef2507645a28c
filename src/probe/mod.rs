//! HTTP(S) port probe
//!
//! For every port of a target, sends a GET over each scheme in turn
//! (HTTPS first by default) and classifies the outcome:
//!
//! - `NOT OPEN (503 Service Unavailable)` for a 503
//! - `POTENTIAL OPEN` for any other response
//! - `NO RESPONSE (<kind>)` when no response arrived at all
//!
//! Once a scheme gets a response the remaining schemes are skipped for
//! that port. Results are written to CSV one flushed row at a time.

mod prober;
mod types;

pub use prober::{ProbeCsv, Prober};
pub use types::{
    normalize_path, parse_ports, probe_url, reason_phrase, ProbeConfig, ProbeResult,
    ProbeSummary, ProbeVerdict, Scheme, BROWSER_ACCEPT, DEFAULT_PORTS, NOTES_MAX_CHARS,
    PROBE_HEADER, USER_AGENTS,
};

#[cfg(test)]
mod tests;
