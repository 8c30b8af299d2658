//! Stream Dump - write a printer camera stream to stdout.
//!
//! This demo shows:
//! - Building a client from command-line flags or a JSON config file
//! - Running one session with stdout as the sink
//! - Logging to stderr so stdout carries only image bytes
//!
//! # Running
//!
//! ```text
//! cargo run --example stream_dump -- 192.168.1.20 12345678 > stream.mjpeg
//! cargo run --example stream_dump -- --config printer.json --framing length | ffplay -
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use camwire_client::{ClientBuilder, MarkerScan, StreamConfig, TlsFallback, Variant};
use clap::{ArgAction, Parser, ValueEnum};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "stream_dump",
    version,
    about = "Dump a printer camera stream to stdout"
)]
struct Cli {
    /// Device host name or IPv4 address.
    #[arg(required_unless_present = "config")]
    host: Option<String>,

    /// Access code shown on the device.
    #[arg(required_unless_present = "config")]
    access_code: Option<String>,

    /// Load settings from a JSON file; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Device port.
    #[arg(long)]
    port: Option<u16>,

    /// Stream framing.
    #[arg(long, value_enum)]
    framing: Option<Framing>,

    /// Skip the TLS attempt.
    #[arg(long, action = ArgAction::SetTrue)]
    no_tls: bool,

    /// Fail instead of falling back to plaintext when TLS fails.
    #[arg(long, action = ArgAction::SetTrue)]
    fail_closed: bool,

    /// Find a start marker split across receive boundaries.
    #[arg(long, action = ArgAction::SetTrue)]
    rolling_window: bool,

    /// Largest accepted payload in bytes (length framing).
    #[arg(long)]
    max_payload: Option<u32>,

    /// Per-receive timeout in milliseconds, 0 waits forever.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Framing {
    /// Unframed, starts at the first JPEG marker.
    Scan,
    /// 16-byte length header per image.
    Length,
}

impl From<Framing> for Variant {
    fn from(framing: Framing) -> Self {
        match framing {
            Framing::Scan => Variant::SignatureScan,
            Framing::Length => Variant::LengthPrefixed,
        }
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(filter.parse().unwrap_or_else(|_| "info".parse().unwrap()))
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(cli: &Cli) -> Result<StreamConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => StreamConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => StreamConfig::new(String::new(), String::new()),
    };

    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(code) = &cli.access_code {
        config.access_code = code.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(framing) = cli.framing {
        config.variant = framing.into();
    }
    if cli.no_tls {
        config.attempt_secure = false;
    }
    if cli.fail_closed {
        config.tls_fallback = TlsFallback::Abort;
    }
    if cli.rolling_window {
        config.marker_scan = MarkerScan::RollingWindow;
    }
    if cli.max_payload.is_some() {
        config.max_payload = cli.max_payload;
    }
    if let Some(ms) = cli.timeout_ms {
        config.receive_timeout_ms = ms;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let client = match ClientBuilder::from_config(config).build() {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "cannot build client");
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = tokio::io::stdout();
    match client.run(&mut stdout).await {
        Ok(never) => match never {},
        Err(e) => error!(error = %e, "stream ended"),
    }
    ExitCode::FAILURE
}
