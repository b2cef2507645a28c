//! Probe execution

use super::types::{
    probe_url, reason_phrase, ProbeConfig, ProbeResult, ProbeSummary, ProbeVerdict, Scheme,
    BROWSER_ACCEPT, NOTES_MAX_CHARS, PROBE_HEADER, USER_AGENTS,
};
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, Pacer, TransportFailure};
use crate::output::{create_file, CsvWriter};
use crate::progress::Progress;
use chrono::Utc;
use rand::seq::SliceRandom;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Outcome of a single GET before it is attributed to a port
#[derive(Debug, Clone, PartialEq, Eq)]
struct Attempt {
    verdict: ProbeVerdict,
    status: Option<u16>,
    reason: Option<String>,
    notes: String,
}

/// Per-port HTTP(S) availability probe
pub struct Prober {
    client: HttpClient,
    config: ProbeConfig,
    pacer: Pacer,
}

impl Prober {
    /// Build a prober and its HTTP client
    ///
    /// Redirects are not followed and error statuses are returned as
    /// responses so they can be classified.
    pub fn new(config: ProbeConfig, pacer: Pacer) -> Result<Self> {
        config.validate()?;

        let user_agent = match &config.user_agent {
            Some(agent) => agent.clone(),
            None => USER_AGENTS
                .choose(&mut rand::thread_rng())
                .map_or_else(String::new, |agent| (*agent).to_string()),
        };

        let http = HttpClientConfig::builder()
            .timeout(config.timeout)
            .max_retries(config.max_retries)
            .header("Accept", BROWSER_ACCEPT)
            .user_agent(user_agent)
            .accept_invalid_certs(!config.verify_tls)
            .follow_redirects(false)
            .error_for_status(false)
            .no_rate_limit()
            .build();

        Ok(Self {
            client: HttpClient::with_config(http)?,
            config,
            pacer,
        })
    }

    /// Probe settings
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// GET one URL and classify the outcome
    async fn attempt(&self, url: &str) -> Attempt {
        match self.client.get(url).await {
            Ok(response) => {
                let status = response.status().as_u16();
                let reason = reason_phrase(status).map(str::to_string);
                let verdict = ProbeVerdict::from_response(status, reason.as_deref());
                let notes = if verdict == ProbeVerdict::PotentialOpen {
                    let body = response.text().await.unwrap_or_default();
                    body.chars().take(NOTES_MAX_CHARS).collect()
                } else {
                    String::new()
                };
                Attempt {
                    verdict,
                    status: Some(status),
                    reason,
                    notes,
                }
            }
            Err(e) => {
                let kind = match &e {
                    Error::Transport { kind, .. } => *kind,
                    Error::Http(inner) => TransportFailure::classify(inner),
                    _ => TransportFailure::Unknown,
                };
                Attempt {
                    verdict: ProbeVerdict::NoResponse(kind),
                    status: None,
                    reason: None,
                    notes: e.to_string(),
                }
            }
        }
    }

    /// Probe one port, trying each scheme until one gets an HTTP response
    pub async fn probe_port(&self, port: u16) -> Vec<ProbeResult> {
        let mut results = Vec::new();
        let between_schemes = self.pacer.scaled(0.25);

        for (i, scheme) in self.config.schemes.iter().copied().enumerate() {
            if i > 0 {
                between_schemes.pause().await;
            }

            let url = probe_url(scheme, &self.config.target, port, &self.config.path);
            let attempt = self.attempt(&url).await;
            let result = ProbeResult {
                timestamp: Utc::now(),
                target: self.config.target.clone(),
                port,
                scheme,
                url,
                verdict: attempt.verdict,
                status: attempt.status,
                reason: attempt.reason,
                notes: attempt.notes,
            };

            info!(
                "{}  {}:{}  {:5}  -> {}  (status={} reason={})",
                result.timestamp_text(),
                result.target,
                port,
                scheme.as_str().to_uppercase(),
                result.verdict,
                result.status.map_or_else(|| "None".to_string(), |s| s.to_string()),
                result.reason.as_deref().unwrap_or("None")
            );

            let responded = result.verdict.responded();
            results.push(result);
            if responded {
                debug!("{}:{port} answered over {scheme}; skipping other schemes", self.config.target);
                break;
            }
        }

        results
    }

    /// Probe every configured port, handing each result to `sink` as it arrives
    pub async fn run<F>(&self, progress: &Progress, mut sink: F) -> Result<ProbeSummary>
    where
        F: FnMut(&ProbeResult) -> Result<()>,
    {
        let ports = &self.config.ports;
        let bar = progress.bar(ports.len() as u64, &self.config.target);
        let mut summary = ProbeSummary::default();

        for (i, port) in ports.iter().copied().enumerate() {
            if i > 0 {
                self.pacer.pause().await;
            }
            bar.set_message(format!("{}:{port}", self.config.target));

            let results = self.probe_port(port).await;
            for result in &results {
                sink(result)?;
            }
            summary.attempts += results.len();

            match results.last().map(|r| r.verdict) {
                Some(ProbeVerdict::PotentialOpen) => summary.potential_open.push(port),
                Some(ProbeVerdict::NotOpen) => summary.not_open.push(port),
                _ => summary.no_response.push(port),
            }
            bar.inc(1);
        }

        bar.finish_and_clear();
        Ok(summary)
    }
}

impl std::fmt::Debug for Prober {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prober")
            .field("config", &self.config)
            .field("pacer", &self.pacer)
            .finish_non_exhaustive()
    }
}

/// Probe results CSV, flushed after every row
pub struct ProbeCsv {
    writer: CsvWriter<BufWriter<File>>,
}

impl ProbeCsv {
    /// Create the file (and its parent directories) and write the header
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = create_file(path.as_ref())?;
        let writer = CsvWriter::new(file, &PROBE_HEADER)?.flush_each_row(true);
        Ok(Self { writer })
    }

    /// Append one result
    pub fn write(&mut self, result: &ProbeResult) -> Result<()> {
        self.writer.write_row(&result.csv_fields())
    }

    /// Rows written so far
    pub fn rows(&self) -> usize {
        self.writer.rows()
    }

    /// Flush and close
    pub fn finish(self) -> Result<()> {
        self.writer.into_inner()?.flush()?;
        Ok(())
    }
}

impl Scheme {
    /// Parse `http` or `https`
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "https" => Ok(Scheme::Https),
            "http" => Ok(Scheme::Http),
            other => Err(Error::invalid_value("scheme", format!("unknown scheme '{other}'"))),
        }
    }
}
