//! The platform accessor seam.
//!
//! Each platform implements [`MediaBackend`] for its own session handle
//! type. Handles are only valid for the duration of one poll; the engine
//! never retains them across calls.

use crate::status::PlaybackStatus;
use std::path::Path;
use thiserror::Error;

/// Failure taxonomy for the provider. Every variant is recovered by the
/// poll engine; none of them escapes to the HTTP client as anything other
/// than a `{playing:false}`-style snapshot or a degraded payload.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("media session API unavailable: {0}")]
    ApiUnavailable(String),
    #[error("session enumeration failed: {0}")]
    Enumeration(String),
    #[error("metadata read failed: {0}")]
    MetadataRead(String),
    #[error("artwork extraction failed: {0}")]
    ArtworkExtraction(String),
}

/// Title/artist/album as read from one session. Fields the platform could
/// not supply are empty strings, never placeholders.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
}

impl TrackMetadata {
    /// Whether this metadata is worth showing (and caching).
    pub fn is_displayable(&self) -> bool {
        !self.title.is_empty() || !self.artist.is_empty()
    }
}

/// Platform-specific access to OS media sessions.
///
/// `Session` is an opaque per-platform handle (a D-Bus name, an SMTC
/// session object, a running player app). Accessors take the handle back
/// by reference so the engine controls iteration order.
pub trait MediaBackend {
    type Session;

    /// Enumerate the OS-reported media sessions, in the OS's order.
    fn sessions(&mut self) -> Result<Vec<Self::Session>, ProviderError>;

    /// Application identifier owning the session, when the OS exposes one.
    fn app_id(&self, session: &Self::Session) -> Option<String>;

    /// Playback state of the session, in its richest available shape.
    fn playback_status(&self, session: &Self::Session) -> PlaybackStatus;

    /// Read title/artist/album for the session.
    fn metadata(&self, session: &Self::Session) -> Result<TrackMetadata, ProviderError>;

    /// Extract the session's thumbnail to `dest`, overwriting any previous
    /// file. Returns `Ok(true)` only when a non-empty file was written,
    /// `Ok(false)` when the session simply has no artwork.
    fn save_artwork(&self, session: &Self::Session, dest: &Path) -> Result<bool, ProviderError>;
}
