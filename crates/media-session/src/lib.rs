//! Cross-platform media session polling
//!
//! This crate answers one question, "what is the host playing right now?",
//! across different platforms:
//! - Linux: MPRIS via D-Bus
//! - Windows: System Media Transport Controls (SMTC)
//! - macOS: AppleScript (Music.app and Spotify)
//!
//! Platform specifics live behind the [`MediaBackend`] trait; the polling
//! algorithm, candidate ordering, metadata fallbacks and the last-known
//! metadata cache are shared and platform-independent.

use jamdeck_core::{NowPlayingSnapshot, NowPlayingSource};
use std::path::PathBuf;

pub mod artwork;
pub mod backend;
pub mod cache;
pub mod poll;
pub mod status;

// Platform-specific backends
#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "windows")]
mod windows;

#[cfg(target_os = "macos")]
mod macos;

pub use backend::{MediaBackend, ProviderError, TrackMetadata};
pub use cache::MetadataCache;
pub use poll::{poll_backend, PollOptions, NO_ACTIVE_SESSION};
pub use status::PlaybackStatus;

#[cfg(target_os = "linux")]
pub type PlatformBackend = linux::MprisBackend;

#[cfg(target_os = "windows")]
pub type PlatformBackend = windows::SmtcBackend;

#[cfg(target_os = "macos")]
pub type PlatformBackend = macos::AppleScriptBackend;

#[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
compile_error!("Unsupported platform - media session polling requires Linux, Windows, or macOS");

/// A media backend combined with the poll engine and its metadata cache.
///
/// The cache is owned here rather than living in any global state; one
/// provider instance serves one worker process.
pub struct MediaSessionProvider<B: MediaBackend> {
    backend: B,
    cache: MetadataCache,
    options: PollOptions,
}

impl<B: MediaBackend> MediaSessionProvider<B> {
    pub fn new(backend: B, options: PollOptions) -> Self {
        Self {
            backend,
            cache: MetadataCache::default(),
            options,
        }
    }
}

impl<B: MediaBackend + Send> NowPlayingSource for MediaSessionProvider<B> {
    fn poll(&mut self) -> NowPlayingSnapshot {
        poll_backend(&mut self.backend, &mut self.cache, &self.options)
    }
}

/// Create the provider for the current platform.
pub fn platform_provider(
    preferred_app_prefix: Option<String>,
    artwork_path: PathBuf,
) -> MediaSessionProvider<PlatformBackend> {
    let options = PollOptions {
        preferred_app_prefix,
        artwork_path,
    };
    MediaSessionProvider::new(PlatformBackend::new(), options)
}
