use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dav2csv::export::{self, CsvSink, ListingPrinter, Traversal};
use dav2csv::{WebDAVConfig, WebDAVService};

/// Crawl a WebDAV tree and export every resource's properties as CSV
#[derive(Parser, Debug)]
#[command(name = "dav2csv", version, about)]
struct Cli {
    /// Server URL, e.g. https://dav.example.com (falls back to WEBDAV_SERVER_URL)
    server_url: Option<String>,

    /// Directory to start from, relative to the base path
    start_path: Option<String>,

    /// Directory on the server all paths are relative to
    #[arg(long)]
    base_path: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    user: Option<String>,

    #[arg(long)]
    password: Option<String>,

    /// Windows domain for the user
    #[arg(long)]
    domain: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Property whose presence marks a folder
    #[arg(long)]
    folder_marker: Option<String>,

    /// Write CSV here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only print the directory tree, without fetching property values
    #[arg(long)]
    list_only: bool,
}

impl Cli {
    /// Applies the flags over `config` (normally loaded from `WEBDAV_*`
    /// variables) and validates the merged result once.
    fn apply_to(self, mut config: WebDAVConfig) -> Result<(WebDAVConfig, Option<PathBuf>, bool)> {
        if let Some(server_url) = self.server_url {
            config.server_url = server_url;
        }
        if let Some(start_path) = self.start_path {
            config.start_path = start_path;
        }
        if let Some(base_path) = self.base_path {
            config.base_path = base_path;
        }
        if self.port.is_some() {
            config.port = self.port;
        }
        if self.user.is_some() {
            config.username = self.user;
        }
        if self.password.is_some() {
            config.password = self.password;
        }
        if self.domain.is_some() {
            config.domain = self.domain;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_seconds = timeout;
        }
        if let Some(folder_marker) = self.folder_marker {
            config.folder_marker = folder_marker;
        }

        config
            .validate()
            .context("Invalid settings (command line over WEBDAV_* environment)")?;
        Ok((config, self.output, self.list_only))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let env_config = WebDAVConfig::from_env()?;
    let (config, output, list_only) = Cli::parse().apply_to(env_config)?;
    let start_path = config.start_path.clone();
    let folder_marker = config.folder_marker.clone();
    info!("Crawling {} from '{}'", config.server_url, start_path);

    let service = WebDAVService::new(config)?;

    let out: Box<dyn Write> = match &output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Cannot create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let result = if list_only {
        let mut printer = ListingPrinter::new(out);
        let summary = Traversal::new(&service, start_path.as_str())
            .fetch_values(false)
            .run(&mut printer)
            .await;
        printer.into_inner().flush()?;
        summary
    } else {
        let mut sink = CsvSink::new(out);
        export::export(&service, &start_path, &[folder_marker], &mut sink).await
    };

    match result {
        Ok(summary) => {
            info!(
                "Done: {} directories, {} resources",
                summary.directories_listed, summary.resources_resolved
            );
            Ok(())
        }
        Err(e) => {
            error!("Crawl aborted ({:?}): {}", e.kind(), e);
            Err(e.into())
        }
    }
}
