//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::collect::Collector;
use crate::config::{ReconConfig, DEFAULT_PROBE_DELAY_SECONDS};
use crate::confluence::{group_members_endpoint, ConfluenceApi};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::output::ReportWriter;
use crate::probe::{parse_ports, ProbeConfig, ProbeCsv, Prober, DEFAULT_PORTS};
use crate::progress::Progress;
use crate::recon::{self, InventoryOptions};
use crate::wordlist;
use std::path::Path;
use tracing::{debug, info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parsed command line
    pub fn cli(&self) -> &Cli {
        &self.cli
    }

    /// Run the CLI command
    ///
    /// Configuration problems are returned before any request is sent.
    /// Failed sub-queries are logged and the partial results are still
    /// written.
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;

        match &self.cli.command {
            Commands::Search {
                url,
                dict,
                limit,
                output,
            } => {
                self.search(&config, url.as_deref(), dict, *limit, output)
                    .await
            }
            Commands::List {
                url,
                output,
                tree,
                max_depth,
                max_nodes,
                no_attachments,
            } => {
                let options = InventoryOptions {
                    tree: *tree,
                    limits: config.tree.limits(*max_depth, *max_nodes),
                    attachments: !*no_attachments,
                };
                self.list(&config, url.as_deref(), options, output).await
            }
            Commands::Members {
                url,
                endpoint,
                group,
                output,
            } => {
                let endpoint = match group {
                    Some(group) => group_members_endpoint(group)?,
                    None => endpoint.clone(),
                };
                self.members(&config, url.as_deref(), &endpoint, output)
                    .await
            }
            Commands::Probe {
                target,
                ports,
                path,
                out_csv,
                verify_tls,
            } => {
                self.probe(
                    &config,
                    target,
                    ports.as_deref(),
                    path,
                    out_csv,
                    *verify_tls,
                )
                .await
            }
        }
    }

    /// Load the YAML profile (if any) and apply command-line overrides
    pub fn load_config(&self) -> Result<ReconConfig> {
        let mut config = match &self.cli.config {
            Some(path) => {
                debug!("Loading profile {}", path.display());
                ReconConfig::load(path)?
            }
            None => ReconConfig::default(),
        };
        config.apply(self.cli.overrides()?)?;
        Ok(config)
    }

    fn progress(config: &ReconConfig) -> Progress {
        Progress::new(config.output.progress)
    }

    /// Build the Confluence API client for a run
    fn confluence(config: &ReconConfig, url: Option<&str>) -> Result<ConfluenceApi> {
        let base_url = config.resolve_url(url)?;
        let client = HttpClient::with_config(config.client_config(&base_url)?)?;
        let collector = Collector::new(client).with_pacer(config.pacer(0.0)?);
        info!("Using {} ({} auth)", base_url, config.auth.label());
        Ok(ConfluenceApi::new(base_url, collector))
    }

    async fn search(
        &self,
        config: &ReconConfig,
        url: Option<&str>,
        dict: &Path,
        limit: Option<usize>,
        output: &Path,
    ) -> Result<()> {
        let terms = wordlist::load(dict)?;
        let api = Self::confluence(config, url)?;

        let report = recon::search::run(&api, &terms, limit, &Self::progress(config)).await;
        for outcome in report.failed_terms() {
            warn!("Term '{}' returned partial results", outcome.term);
        }

        let written = ReportWriter::new(output, config.output.format)
            .write_search(api.base_url(), &report.hits)?;
        println!("[*] {written} results saved to {}", output.display());
        Ok(())
    }

    async fn list(
        &self,
        config: &ReconConfig,
        url: Option<&str>,
        options: InventoryOptions,
        output: &Path,
    ) -> Result<()> {
        let api = Self::confluence(config, url)?;

        let inventory = recon::inventory::run(&api, options, &Self::progress(config)).await;
        if !inventory.stats.is_complete() {
            warn!(
                "{} listing requests failed; output is partial",
                inventory.stats.failures.len()
            );
        }

        ReportWriter::new(output, config.output.format)
            .write_inventory(api.base_url(), &inventory)?;
        println!("[*] Output saved to {}", output.display());
        Ok(())
    }

    async fn members(
        &self,
        config: &ReconConfig,
        url: Option<&str>,
        endpoint: &str,
        output: &Path,
    ) -> Result<()> {
        let api = Self::confluence(config, url)?;

        let members = recon::members::run(&api, endpoint).await;
        let written = ReportWriter::new(output, config.output.format)
            .write_members(api.base_url(), &members.records)?;
        println!("[*] {written} users written to {}", output.display());
        Ok(())
    }

    async fn probe(
        &self,
        config: &ReconConfig,
        target: &str,
        ports: Option<&str>,
        path: &str,
        out_csv: &Path,
        verify_tls: bool,
    ) -> Result<()> {
        if verify_tls && config.http.insecure {
            return Err(Error::config("--verify-tls and --insecure cannot be combined"));
        }

        let ports = match ports {
            Some(list) => parse_ports(list)?,
            None => DEFAULT_PORTS.to_vec(),
        };
        let probe_config = ProbeConfig::new(target)
            .ports(ports)
            .path(path)
            .timeout(config.probe_timeout()?)
            .max_retries(config.http.max_retries)
            .verify_tls(verify_tls)
            .user_agent(config.http.user_agent.clone());
        let prober = Prober::new(probe_config, config.pacer(DEFAULT_PROBE_DELAY_SECONDS)?)?;

        info!(
            "Probing {} on {} ports, writing {}",
            target,
            prober.config().ports.len(),
            out_csv.display()
        );
        let mut csv = ProbeCsv::create(out_csv)?;
        let summary = prober
            .run(&Self::progress(config), |result| csv.write(result))
            .await?;
        csv.finish()?;

        println!(
            "[*] {} attempts: {} potential open, {} not open, {} no response. Results in {}",
            summary.attempts,
            summary.potential_open.len(),
            summary.not_open.len(),
            summary.no_response.len(),
            out_csv.display()
        );
        if !summary.potential_open.is_empty() {
            println!("[+] Potentially open ports: {:?}", summary.potential_open);
        }
        Ok(())
    }
}
