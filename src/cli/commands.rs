//! CLI commands and argument parsing

use crate::config::{auth_from_flags, Overrides};
use crate::confluence::DEFAULT_MEMBERS_ENDPOINT;
use crate::error::Result;
use crate::types::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Read-only Confluence enumeration and HTTP port probing
#[derive(Parser, Debug)]
#[command(name = "confluence-recon")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// YAML profile with connection, auth and output settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// HTTP client flags
    #[command(flatten)]
    pub http: HttpArgs,

    /// Credential flags
    #[command(flatten)]
    pub auth: AuthArgs,

    /// Report format
    #[arg(long, global = true, value_enum)]
    pub format: Option<OutputFormat>,

    /// Do not draw progress bars
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// HTTP client flags
#[derive(Args, Debug, Clone, Default)]
pub struct HttpArgs {
    /// User-Agent header
    #[arg(short = 'a', long, global = true)]
    pub user_agent: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<f64>,

    /// Pause between requests in seconds
    #[arg(long, global = true)]
    pub delay: Option<f64>,

    /// Random extra pause in seconds, on top of --delay
    #[arg(long, global = true)]
    pub jitter: Option<f64>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Retries on transient failures
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// Extra request header, `Key: value` (repeatable)
    #[arg(short = 'H', long = "header", global = true)]
    pub headers: Vec<String>,
}

/// Credential flags
#[derive(Args, Debug, Clone, Default)]
pub struct AuthArgs {
    /// Basic auth user name or account email
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Basic auth password or API token
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Personal access token (sent as a bearer token)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Raw Cookie header, e.g. `JSESSIONID=...`
    #[arg(long, global = true)]
    pub cookie: Option<String>,
}

impl Cli {
    /// Collect the flags that override the YAML profile
    pub fn overrides(&self) -> Result<Overrides> {
        let auth = auth_from_flags(
            self.auth.user.clone(),
            self.auth.password.clone(),
            self.auth.token.clone(),
            self.auth.cookie.clone(),
        )?;

        Ok(Overrides {
            timeout_seconds: self.http.timeout,
            delay_seconds: self.http.delay,
            jitter_seconds: self.http.jitter,
            insecure: self.http.insecure,
            max_retries: self.http.max_retries,
            user_agent: self.http.user_agent.clone(),
            headers: self.http.headers.clone(),
            auth,
            format: self.format,
            no_progress: self.no_progress,
        })
    }
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search for every term of a word list and record which term found each page
    Search {
        /// Confluence base URL
        #[arg(short = 'c', long = "url")]
        url: Option<String>,

        /// Word list, one term per line
        #[arg(short = 'd', long = "dict")]
        dict: PathBuf,

        /// Maximum hits per term
        #[arg(short, long)]
        limit: Option<usize>,

        /// Report file
        #[arg(short, long, default_value = "./loot/confluence_content.txt")]
        output: PathBuf,
    },

    /// List spaces, their pages and the pages' attachments
    List {
        /// Confluence base URL
        #[arg(short = 'c', long = "url")]
        url: Option<String>,

        /// Report file
        #[arg(short, long, default_value = "confluence_output.txt")]
        output: PathBuf,

        /// Walk child pages from each space's root pages
        #[arg(long)]
        tree: bool,

        /// Deepest page level that is still expanded (with --tree)
        #[arg(long, requires = "tree")]
        max_depth: Option<usize>,

        /// Stop after this many pages per space (with --tree)
        #[arg(long, requires = "tree")]
        max_nodes: Option<usize>,

        /// Skip attachment listing
        #[arg(long)]
        no_attachments: bool,
    },

    /// List the members of a group
    Members {
        /// Confluence base URL
        #[arg(short = 'c', long = "url")]
        url: Option<String>,

        /// Member endpoint, relative to the base URL
        #[arg(long, default_value = DEFAULT_MEMBERS_ENDPOINT, conflicts_with = "group")]
        endpoint: String,

        /// Group name; shorthand for its member endpoint
        #[arg(long)]
        group: Option<String>,

        /// Report file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Probe HTTPS then HTTP on each port of a host
    Probe {
        /// Host name or IP, without scheme
        #[arg(short, long)]
        target: String,

        /// Comma-separated ports (default: common web ports)
        #[arg(short, long)]
        ports: Option<String>,

        /// Path to request
        #[arg(long, default_value = "/")]
        path: String,

        /// CSV results file
        #[arg(long, default_value = "probe_results.csv")]
        out_csv: PathBuf,

        /// Verify TLS certificates
        #[arg(long)]
        verify_tls: bool,
    },
}
