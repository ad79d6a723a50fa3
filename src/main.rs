//! CLI entry point for json_fetch.
//!
//! Fetches one JSON document from a source, optionally authenticating first,
//! and writes it to stdout.

use anyhow::Result;
use clap::Parser;
use json_fetch::{
    FetchConfig, TransportKind, fetch,
    output::{print_pretty, write_payload},
};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "json_fetch")]
#[command(about = "Fetch a JSON payload from a remote source", long_about = None)]
struct Cli {
    /// Transport used for the source request (pooled, raw_socket, stream)
    #[arg(short, long, env = "JSON_FETCH_TRANSPORT", default_value = "pooled")]
    transport: TransportKind,

    /// URL of the JSON source
    #[arg(short, long, env = "JSON_FETCH_SOURCE_URL")]
    source_url: Option<String>,

    /// Auth endpoint that issues bearer tokens
    #[arg(short, long, env = "JSON_FETCH_AUTH_URL")]
    auth_url: Option<String>,

    /// Client id presented to the auth endpoint
    #[arg(long, env = "JSON_FETCH_CLIENT_ID", requires = "client_secret")]
    client_id: Option<String>,

    /// Client secret presented to the auth endpoint
    #[arg(long, env = "JSON_FETCH_CLIENT_SECRET", requires = "client_id", hide_env_values = true)]
    client_secret: Option<String>,

    /// Verify TLS certificates and host names
    #[arg(long, default_value_t = false)]
    verify_tls: bool,

    /// Indent the JSON written to stdout
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/json_fetch.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("json_fetch.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let mut builder = FetchConfig::builder(cli.transport).accept_invalid_certs(!cli.verify_tls);
    if let Some(url) = cli.source_url {
        builder = builder.source_url(url);
    }
    if let Some(url) = cli.auth_url {
        builder = builder.auth_endpoint_url(url);
    }
    if let (Some(id), Some(secret)) = (cli.client_id, cli.client_secret) {
        builder = builder.credentials(id, secret);
    }
    let config = builder.build();

    match fetch(&config).await {
        Ok(payload) => {
            info!(transport = %config.transport(), "Fetch complete");
            print_pretty(&payload);
            write_payload(std::io::stdout().lock(), &payload, cli.pretty)?;
            Ok(())
        }
        Err(e) => {
            error!(error = %e, status = ?e.status(), "Fetch failed");
            Err(e.into())
        }
    }
}
