//! Worker startup: negotiate a port, announce it, serve until killed.

use crate::negotiate::negotiate_port;
use crate::router::{create_router, AppState};
use anyhow::{Context, Result};
use jamdeck_core::{format_sentinel, NowPlayingSource, PortBinding};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

pub struct ServerOptions {
    /// Port to try before the automatic range.
    pub preferred_port: Option<u16>,
    /// Where the provider drops extracted artwork.
    pub artwork_path: PathBuf,
    /// Root directory of the overlay's static assets.
    pub asset_root: PathBuf,
}

/// Run the worker service. Returns only on a fatal startup error or when
/// the serve loop ends; the normal way out is process termination by the
/// controller.
pub async fn run(source: Box<dyn NowPlayingSource>, options: ServerOptions) -> Result<()> {
    let (listener, binding) = negotiate_port(options.preferred_port)?;
    announce_port(&binding).context("failed to write port sentinel")?;

    info!(
        "Starting music overlay server on port {}...",
        binding.bound_port
    );
    info!(
        "Open http://localhost:{}/ in your browser or OBS",
        binding.bound_port
    );

    listener
        .set_nonblocking(true)
        .context("failed to switch listener to non-blocking")?;
    let listener = tokio::net::TcpListener::from_std(listener)
        .context("failed to register listener with the runtime")?;

    let state = AppState::new(source, options.artwork_path, options.asset_root);
    let app = create_router(state);

    info!("Server ready!");
    axum::serve(listener, app)
        .await
        .context("HTTP serve loop failed")?;
    Ok(())
}

/// Emit the one contractual stdout line, flushed so the controller's
/// line reader sees it before any later logging.
fn announce_port(binding: &PortBinding) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", format_sentinel(binding.bound_port))?;
    stdout.flush()
}
