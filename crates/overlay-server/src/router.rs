//! Request routing for the overlay service.
//!
//! `/nowplaying` is the load-bearing endpoint: whatever happens inside the
//! provider, the response is a 200 with a JSON object carrying a boolean
//! `playing` key. Everything else is a convenience for the overlay page.

use crate::assets::{cache_control_for, content_type_for, sanitize_asset_path};
use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use jamdeck_core::{NowPlayingSnapshot, NowPlayingSource};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Hard ceiling on how long one `/nowplaying` request may spend in the
/// provider. The platform backends carry their own per-call deadlines;
/// this is the backstop that keeps the HTTP response bounded regardless.
pub const POLL_BUDGET: Duration = Duration::from_secs(4);

const NO_CACHE: &str = "no-store, no-cache, must-revalidate";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    source: Arc<Mutex<Box<dyn NowPlayingSource>>>,
    artwork_path: Arc<PathBuf>,
    asset_root: Arc<PathBuf>,
}

impl AppState {
    pub fn new(
        source: Box<dyn NowPlayingSource>,
        artwork_path: PathBuf,
        asset_root: PathBuf,
    ) -> Self {
        Self {
            source: Arc::new(Mutex::new(source)),
            artwork_path: Arc::new(artwork_path),
            asset_root: Arc::new(asset_root),
        }
    }
}

/// Create the overlay router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/nowplaying", get(now_playing))
        .route("/artwork", get(artwork))
        .fallback(static_asset)
        .with_state(state)
}

/// GET /nowplaying - poll the provider and answer with the snapshot
async fn now_playing(State(state): State<AppState>) -> Response {
    debug!("GET /nowplaying");

    let source = Arc::clone(&state.source);
    let poll = tokio::task::spawn_blocking(move || {
        let mut source = source.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        source.poll()
    });

    let snapshot = match tokio::time::timeout(POLL_BUDGET, poll).await {
        Ok(Ok(snapshot)) => snapshot,
        Ok(Err(e)) => {
            error!("provider task failed: {}", e);
            NowPlayingSnapshot::idle("provider failure")
        }
        Err(_) => {
            warn!("provider exceeded the {:?} poll budget", POLL_BUDGET);
            NowPlayingSnapshot::timed_out()
        }
    };

    (
        [
            (header::CACHE_CONTROL, NO_CACHE),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "GET"),
        ],
        Json(snapshot),
    )
        .into_response()
}

/// GET /artwork - bytes of the most recently extracted artwork file. The
/// query string is a cache buster and is ignored.
async fn artwork(State(state): State<AppState>) -> Response {
    match tokio::fs::read(&*state.artwork_path).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "image/jpeg"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            debug!("artwork not served: {}", e);
            plain_text(StatusCode::NOT_FOUND, "Artwork not found")
        }
    }
}

/// Fallback: the overlay document and its static assets, by filename
/// lookup under the asset root. `/` accepts a `scene` query parameter
/// that is interpreted by the overlay script, not here.
async fn static_asset(State(state): State<AppState>, uri: Uri) -> Response {
    let Some(relative) = sanitize_asset_path(uri.path()) else {
        return plain_text(StatusCode::NOT_FOUND, "404 Not Found");
    };
    let path = state.asset_root.join(&relative);

    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, content_type_for(&relative)),
                (header::CACHE_CONTROL, cache_control_for(&relative)),
            ],
            bytes,
        )
            .into_response(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("asset not found: {}", path.display());
            plain_text(StatusCode::NOT_FOUND, "404 Not Found")
        }
        Err(e) => {
            error!("failed to read asset {}: {}", path.display(), e);
            plain_text(StatusCode::INTERNAL_SERVER_ERROR, "Error reading asset")
        }
    }
}

fn plain_text(status: StatusCode, body: &'static str) -> Response {
    (status, [(header::CONTENT_TYPE, "text/plain")], body).into_response()
}
