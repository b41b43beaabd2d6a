//! Command line entry point for the style transfer client

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use style_transfer_client::{
    config::{LoggingConfig, Settings},
    pipeline, SourceImage, StyleDescriptor, StyleTransfer,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Re-render a photo in the style of an artist
#[derive(Debug, Parser)]
#[command(name = "restyle", version)]
struct Args {
    /// Photo to transform
    #[arg(long)]
    image: PathBuf,

    /// Artist whose style to apply
    #[arg(long)]
    artist: String,

    /// Style category, e.g. "impressionism"
    #[arg(long, default_value = "")]
    category: String,

    /// Display title of the style
    #[arg(long, default_value = "")]
    title: String,

    /// Extra descriptive keywords for the artist
    #[arg(long)]
    keywords: Option<String>,

    /// Configuration file
    #[arg(long, default_value = "config/default.toml")]
    config: PathBuf,

    /// Where to write the resulting image
    #[arg(long)]
    out: Option<PathBuf>,
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "pretty" {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    } else {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Load configuration
    let settings = Settings::load_from_path(&args.config)?;
    init_logging(&settings.logging);
    info!(
        "Loaded configuration: service={} max_attempts={}",
        settings.service.base_url, settings.polling.max_attempts
    );

    let image = SourceImage::from_path(&args.image).await?;
    let mut style = StyleDescriptor::new(args.artist, args.category, args.title);
    if let Some(keywords) = args.keywords {
        style = style.with_keywords(keywords);
    }

    let transfer = Arc::new(StyleTransfer::new(&settings)?);

    // Ctrl-C abandons the transfer
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let (mut progress, handle) = pipeline::spawn(transfer, image, style, cancel);
    while let Some(event) = progress.recv().await {
        eprintln!("[{:>3}%] {}", event.percent, event);
    }
    let result = handle.await?;

    if !result.success {
        warn!(error = ?result.error, "Style transfer did not complete");
        anyhow::bail!(
            "style transfer did not complete: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
    }

    if let (Some(out), Some(bytes)) = (&args.out, &result.image) {
        tokio::fs::write(out, bytes).await?;
        info!(path = ?out, size = bytes.len(), "Wrote result image");
    }

    // Bytes are skipped; the handle points at the stored copy
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
