//! Binary entry point for `gatekeeper-bot`.
//!
//! Parses the command line, installs logging (stdout plus OTLP export), loads
//! the layered configuration, and hands over to the library.

use clap::Parser;
use gatekeeper_bot::base::{config::Config, types::Void};
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{Protocol, WithExportConfig};
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt};

/// Gatekeeper-bot: a chat bot with spam throttling, bounded chat memory, and resilient delivery.
///
/// Settings are read from `.hidden/config.toml` (or `--config`), then
/// overridden by `GATEKEEPER_BOT_*` environment variables, e.g.
/// `GATEKEEPER_BOT_ALLOWED_CHANNEL_ID=C0123` or `GATEKEEPER_BOT_COOLDOWN_MS=8000`.
#[derive(Parser, Debug)]
#[command(version, author, about, long_about = None)]
struct Args {
    /// Read settings from this TOML file instead of `.hidden/config.toml`.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
    /// Log more: `-v` for debug, `-vv` for trace.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Void {
    let args = Args::parse();

    init_tracing(args.verbose)?;

    let config = Config::load(args.config.as_deref())?;

    info!(
        guild = %config.allowed_guild_id,
        channel = %config.allowed_channel_id,
        restricted = %config.restricted_channel_id,
        prefix = %config.command_prefix,
        "Serving the allowed channel and direct messages."
    );

    gatekeeper_bot::start(config).await
}

/// Install the stdout and OTLP tracing layers at the requested verbosity.
fn init_tracing(verbose: u8) -> Void {
    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let stdout = tracing_subscriber::fmt::layer()
        .with_ansi(true)
        .with_level(true)
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE);

    let exporter = opentelemetry_otlp::SpanExporter::builder().with_http().with_protocol(Protocol::HttpBinary).build()?;
    let tracer = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_simple_exporter(exporter)
        .build()
        .tracer("gatekeeper-bot");
    let otel = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry().with(otel).with(level).with(stdout).init();

    Ok(())
}
