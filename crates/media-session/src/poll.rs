//! The shared polling algorithm.
//!
//! One pass over the OS-reported sessions, in order, with the preferred
//! app (if configured) moved to the front. The first candidate that is
//! playing or carries displayable metadata wins. Metadata failures on an
//! active session degrade to a minimal payload instead of suppressing the
//! "is playing" signal.

use crate::backend::{MediaBackend, TrackMetadata};
use crate::cache::MetadataCache;
use jamdeck_core::NowPlayingSnapshot;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Error string reported when no session qualifies.
pub const NO_ACTIVE_SESSION: &str = "No active media session";

#[derive(Clone, Debug)]
pub struct PollOptions {
    /// App-id prefix that wins candidate ordering ties.
    pub preferred_app_prefix: Option<String>,
    /// Where extracted artwork lands.
    pub artwork_path: PathBuf,
}

/// Run one poll over `backend`, consulting and updating `cache`.
///
/// Infallible: every backend failure folds into the returned snapshot.
pub fn poll_backend<B: MediaBackend>(
    backend: &mut B,
    cache: &mut MetadataCache,
    options: &PollOptions,
) -> NowPlayingSnapshot {
    let mut sessions = match backend.sessions() {
        Ok(sessions) => sessions,
        Err(e) => {
            warn!("session enumeration failed: {}", e);
            return NowPlayingSnapshot::idle(e.to_string());
        }
    };

    if let Some(prefix) = options.preferred_app_prefix.as_deref() {
        promote_preferred(backend, &mut sessions, prefix);
    }

    for session in &sessions {
        let app_id = backend.app_id(session);
        let status = backend.playback_status(session);
        let playing = status.is_playing();
        let status = status.normalized();

        let metadata = match backend.metadata(session) {
            Ok(metadata) => metadata,
            Err(e) if playing => {
                // Playback was detected; metadata trouble must not hide it.
                debug!("metadata read failed on active session: {}", e);
                return minimal_payload(app_id, status, cache);
            }
            Err(e) => {
                debug!("skipping unreadable idle session: {}", e);
                continue;
            }
        };

        if !playing && !metadata.is_displayable() {
            continue;
        }

        let artwork_ref = match backend.save_artwork(session, &options.artwork_path) {
            Ok(true) => Some(artwork_ref_now()),
            Ok(false) => None,
            Err(e) => {
                debug!("artwork extraction failed: {}", e);
                None
            }
        };

        if let Some(id) = app_id.as_deref() {
            cache.put(id, &metadata);
        }

        return NowPlayingSnapshot {
            playing,
            title: metadata.title,
            artist: metadata.artist,
            album: metadata.album,
            status,
            app_id,
            artwork_ref,
            error: None,
        };
    }

    NowPlayingSnapshot::idle(NO_ACTIVE_SESSION)
}

/// Move the first session whose app id starts with `prefix` to the front,
/// leaving the rest in enumeration order.
fn promote_preferred<B: MediaBackend>(
    backend: &B,
    sessions: &mut Vec<B::Session>,
    prefix: &str,
) {
    if prefix.is_empty() {
        return;
    }
    let position = sessions.iter().position(|s| {
        backend
            .app_id(s)
            .is_some_and(|id| id.starts_with(prefix))
    });
    if let Some(idx) = position {
        let preferred = sessions.remove(idx);
        sessions.insert(0, preferred);
    }
}

/// `playing:true` with whatever the cache remembers for this app; empty
/// strings when it remembers nothing.
fn minimal_payload(
    app_id: Option<String>,
    status: String,
    cache: &MetadataCache,
) -> NowPlayingSnapshot {
    let cached = app_id
        .as_deref()
        .and_then(|id| cache.get(id))
        .cloned()
        .unwrap_or_else(TrackMetadata::default);
    NowPlayingSnapshot {
        playing: true,
        title: cached.title,
        artist: cached.artist,
        album: cached.album,
        status,
        app_id,
        artwork_ref: None,
        error: None,
    }
}

fn artwork_ref_now() -> String {
    let epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("/artwork?t={epoch}")
}
