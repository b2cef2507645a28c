//! Tests for the probe module

use super::*;
use crate::error::Error;
use crate::http::{Pacer, TransportFailure};
use crate::progress::Progress;
use chrono::TimeZone;
use pretty_assertions::assert_eq;
use std::net::TcpListener;
use std::time::Duration;
use tempfile::TempDir;
use test_case::test_case;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Plain-HTTP-first settings pointed at a local mock server
fn local_config(server: &MockServer) -> ProbeConfig {
    let port = server.address().port();
    ProbeConfig::new("127.0.0.1")
        .ports(vec![port])
        .schemes(vec![Scheme::Http, Scheme::Https])
        .timeout(Duration::from_secs(2))
        .max_retries(0)
        .user_agent(Some("probe-test/1.0".to_string()))
}

/// A port nothing listens on
fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

// ============================================================================
// URL and Port Tests
// ============================================================================

#[test_case(Scheme::Https, 443, "https://host/" ; "https standard port")]
#[test_case(Scheme::Http, 80, "http://host/" ; "http standard port")]
#[test_case(Scheme::Https, 80, "https://host:80/" ; "https on http port")]
#[test_case(Scheme::Http, 8080, "http://host:8080/" ; "custom port")]
fn test_probe_url(scheme: Scheme, port: u16, expected: &str) {
    assert_eq!(probe_url(scheme, "host", port, "/"), expected);
}

#[test]
fn test_normalize_path() {
    assert_eq!(normalize_path("admin"), "/admin");
    assert_eq!(normalize_path("/login"), "/login");
}

#[test]
fn test_parse_ports() {
    assert_eq!(parse_ports("80, 443,,8080").unwrap(), vec![80, 443, 8080]);
}

#[test_case("" ; "empty")]
#[test_case("80,http" ; "not a number")]
#[test_case("0" ; "zero")]
#[test_case("70000" ; "out of range")]
fn test_parse_ports_rejects(list: &str) {
    let err = parse_ports(list).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_default_ports() {
    assert_eq!(DEFAULT_PORTS.len(), 35);
    assert_eq!(&DEFAULT_PORTS[..3], &[80, 443, 8080]);
    assert_eq!(DEFAULT_PORTS[34], 49152);
}

#[test]
fn test_scheme_parse() {
    assert_eq!(Scheme::parse("HTTPS").unwrap(), Scheme::Https);
    assert_eq!(Scheme::parse(" http ").unwrap(), Scheme::Http);
    assert!(Scheme::parse("ftp").is_err());
}

// ============================================================================
// Verdict Tests
// ============================================================================

#[test_case(503, Some("Service Unavailable"), ProbeVerdict::NotOpen ; "503")]
#[test_case(503, None, ProbeVerdict::PotentialOpen ; "503 without reason")]
#[test_case(200, Some("OK"), ProbeVerdict::PotentialOpen ; "200")]
#[test_case(302, Some("Found"), ProbeVerdict::PotentialOpen ; "redirect")]
#[test_case(404, Some("Not Found"), ProbeVerdict::PotentialOpen ; "not found")]
fn test_verdict_from_response(status: u16, reason: Option<&str>, expected: ProbeVerdict) {
    assert_eq!(ProbeVerdict::from_response(status, reason), expected);
}

#[test_case(ProbeVerdict::NotOpen, "NOT OPEN (503 Service Unavailable)" ; "not open")]
#[test_case(ProbeVerdict::PotentialOpen, "POTENTIAL OPEN" ; "potential open")]
#[test_case(ProbeVerdict::NoResponse(TransportFailure::Tls), "NO RESPONSE (ssl_error)" ; "tls")]
#[test_case(
    ProbeVerdict::NoResponse(TransportFailure::ConnectTimeout),
    "NO RESPONSE (connect_timeout)" ;
    "connect timeout"
)]
#[test_case(
    ProbeVerdict::NoResponse(TransportFailure::Connection),
    "NO RESPONSE (connection_error)" ;
    "connection"
)]
fn test_verdict_display(verdict: ProbeVerdict, expected: &str) {
    assert_eq!(verdict.to_string(), expected);
}

#[test]
fn test_reason_phrase() {
    assert_eq!(reason_phrase(503), Some("Service Unavailable"));
    assert_eq!(reason_phrase(200), Some("OK"));
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_probe_config_defaults() {
    let config = ProbeConfig::new("10.0.0.5");
    assert_eq!(config.ports, DEFAULT_PORTS.to_vec());
    assert_eq!(config.schemes, vec![Scheme::Https, Scheme::Http]);
    assert_eq!(config.path, "/");
    assert_eq!(config.timeout, Duration::from_secs(7));
    assert_eq!(config.max_retries, 1);
    assert!(!config.verify_tls);
    assert!(config.validate().is_ok());
}

#[test_case("" ; "empty")]
#[test_case("https://host" ; "with scheme")]
#[test_case("host/admin" ; "with path")]
fn test_probe_config_rejects_target(target: &str) {
    let err = ProbeConfig::new(target).validate().unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_probe_config_rejects_empty_ports() {
    let err = ProbeConfig::new("host").ports(vec![]).validate().unwrap_err();
    assert!(matches!(err, Error::InvalidConfigValue { .. }));
}

#[test]
fn test_prober_rejects_invalid_config() {
    assert!(Prober::new(ProbeConfig::new(""), Pacer::none()).is_err());
}

// ============================================================================
// Result Row Tests
// ============================================================================

#[test]
fn test_result_csv_fields() {
    let result = ProbeResult {
        timestamp: chrono::Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 5).unwrap(),
        target: "host".to_string(),
        port: 8443,
        scheme: Scheme::Https,
        url: "https://host:8443/".to_string(),
        verdict: ProbeVerdict::NoResponse(TransportFailure::ReadTimeout),
        status: None,
        reason: None,
        notes: "read timeout".to_string(),
    };

    assert_eq!(
        result.csv_fields(),
        [
            "2024-05-01T12:30:05Z",
            "host",
            "8443",
            "https",
            "https://host:8443/",
            "NO RESPONSE (read_timeout)",
            "",
            "",
            "read timeout",
        ]
        .map(String::from)
    );
}

// ============================================================================
// Live Probe Tests
// ============================================================================

#[tokio::test]
async fn test_probe_port_skips_remaining_schemes_after_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", "probe-test/1.0"))
        .and(header_exists("accept"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Jenkins</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let config = local_config(&server);
    let port = config.ports[0];
    let prober = Prober::new(config, Pacer::none()).unwrap();

    let results = prober.probe_port(port).await;

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.scheme, Scheme::Http);
    assert_eq!(result.verdict, ProbeVerdict::PotentialOpen);
    assert_eq!(result.status, Some(200));
    assert_eq!(result.reason.as_deref(), Some("OK"));
    assert_eq!(result.notes, "<html>Jenkins</html>");
    assert_eq!(result.url, format!("http://127.0.0.1:{port}/"));
}

#[tokio::test]
async fn test_probe_port_classifies_503() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let config = local_config(&server).path("status");
    let port = config.ports[0];
    let prober = Prober::new(config, Pacer::none()).unwrap();

    let results = prober.probe_port(port).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].verdict, ProbeVerdict::NotOpen);
    assert_eq!(results[0].status, Some(503));
    assert!(results[0].notes.is_empty());
}

#[tokio::test]
async fn test_probe_port_retries_503_then_reports_it() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let config = local_config(&server).max_retries(1);
    let port = config.ports[0];
    let prober = Prober::new(config, Pacer::none()).unwrap();

    let results = prober.probe_port(port).await;
    assert_eq!(results[0].verdict, ProbeVerdict::NotOpen);
}

#[tokio::test]
async fn test_rate_limited_port_is_reported_promptly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .expect(2)
        .mount(&server)
        .await;

    let config = local_config(&server).max_retries(1);
    let port = config.ports[0];
    let prober = Prober::new(config, Pacer::none()).unwrap();

    let results = tokio::time::timeout(Duration::from_secs(10), prober.probe_port(port))
        .await
        .expect("rate-limited port should be reported promptly");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, Some(429));
    assert_eq!(results[0].verdict, ProbeVerdict::PotentialOpen);
}

#[tokio::test]
async fn test_probe_port_does_not_follow_redirects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/login"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = local_config(&server);
    let port = config.ports[0];
    let prober = Prober::new(config, Pacer::none()).unwrap();

    let results = prober.probe_port(port).await;
    assert_eq!(results[0].status, Some(302));
    assert_eq!(results[0].verdict, ProbeVerdict::PotentialOpen);
}

#[tokio::test]
async fn test_probe_port_closed_tries_every_scheme() {
    let port = closed_port();
    let config = ProbeConfig::new("127.0.0.1")
        .ports(vec![port])
        .timeout(Duration::from_secs(2))
        .max_retries(0);
    let prober = Prober::new(config, Pacer::none()).unwrap();

    let results = prober.probe_port(port).await;

    let schemes: Vec<_> = results.iter().map(|r| r.scheme).collect();
    assert_eq!(schemes, vec![Scheme::Https, Scheme::Http]);
    for result in &results {
        assert!(!result.verdict.responded());
        assert!(result.status.is_none());
        assert!(!result.notes.is_empty());
    }
}

#[test]
fn test_results_csv_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("loot").join("scans").join("probe.csv");

    let csv = ProbeCsv::create(&csv_path).unwrap();
    csv.finish().unwrap();

    assert_eq!(
        std::fs::read_to_string(&csv_path).unwrap(),
        "timestamp,target,port,scheme,url,result,status_code,reason,notes\n"
    );
}

#[tokio::test]
async fn test_run_streams_rows_to_csv() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(500)))
        .mount(&server)
        .await;

    let open = server.address().port();
    let closed = closed_port();
    let config = local_config(&server).ports(vec![open, closed]);
    let prober = Prober::new(config, Pacer::none()).unwrap();

    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("probe_results.csv");
    let mut csv = ProbeCsv::create(&csv_path).unwrap();

    let summary = prober
        .run(&Progress::hidden(), |result| csv.write(result))
        .await
        .unwrap();
    assert_eq!(csv.rows(), 3);
    csv.finish().unwrap();

    assert_eq!(summary.attempts, 3);
    assert_eq!(summary.potential_open, vec![open]);
    assert_eq!(summary.no_response, vec![closed]);
    assert!(summary.not_open.is_empty());

    let written = std::fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<_> = written.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        "timestamp,target,port,scheme,url,result,status_code,reason,notes"
    );
    assert!(lines[1].contains(",POTENTIAL OPEN,200,OK,"));
    assert!(lines[1].ends_with(&"x".repeat(NOTES_MAX_CHARS)));
    assert!(!lines[1].ends_with(&"x".repeat(NOTES_MAX_CHARS + 1)));
    assert!(lines[2].contains(&format!(",{closed},http,")));
    assert!(lines[3].contains(&format!(",{closed},https,")));
}
