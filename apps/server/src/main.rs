use anyhow::Result;
use clap::Parser;
use jamdeck_core::{artwork_path, runtime_dir, DEBUG_LOG_FILE_NAME};
use jamdeck_media_session::platform_provider;
use jamdeck_overlay_server::{resolve_asset_root, run, ServerOptions};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Local HTTP service exposing the host's currently playing track for a
/// browser overlay.
#[derive(Parser, Debug)]
#[command(name = "jamdeck-server", version, about = "Now-playing overlay server")]
struct Args {
    /// Port to try binding before the automatic range
    #[arg(long)]
    port: Option<u16>,

    /// Verbose logging, duplicated into a log file in the runtime directory
    #[arg(long)]
    debug: bool,

    /// App identifier prefix that wins media session ordering
    #[arg(long, value_name = "PREFIX")]
    prefer_app: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(args.debug);

    let artwork = artwork_path();
    let asset_root = resolve_asset_root();
    tracing::debug!(
        "artwork file: {}, asset root: {}",
        artwork.display(),
        asset_root.display()
    );

    let provider = platform_provider(args.prefer_app, artwork.clone());
    let options = ServerOptions {
        preferred_port: args.port,
        artwork_path: artwork,
        asset_root,
    };

    run(Box::new(provider), options).await
}

/// Console logging, plus a non-blocking file layer in debug mode so the
/// chatter can be inspected after the console scrolls away.
fn init_logging(debug: bool) -> Option<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| if debug { "debug".into() } else { "info".into() });
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());

    if debug {
        let appender = tracing_appender::rolling::never(runtime_dir(), DEBUG_LOG_FILE_NAME);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false),
            )
            .init();
        Some(guard)
    } else {
        registry.init();
        None
    }
}
