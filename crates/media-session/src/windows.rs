//! Windows media session backend via System Media Transport Controls
//! (SMTC).
//!
//! Uses the Windows Runtime API to enumerate every application that
//! implements SMTC (Spotify, iTunes, browsers, etc.). Requires Windows 10
//! version 1803 or later.
//!
//! WinRT calls are async; every operation here is blocked on with an
//! explicit deadline so a wedged media app cannot stall the poll.

use crate::artwork::{write_artwork_atomic, MAX_ARTWORK_BYTES};
use crate::backend::{MediaBackend, ProviderError, TrackMetadata};
use crate::status::PlaybackStatus;
use anyhow::{anyhow, Result};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use windows::{
    Foundation::{AsyncStatus, IAsyncOperation, IAsyncOperationWithProgress},
    Media::Control::{
        GlobalSystemMediaTransportControlsSession,
        GlobalSystemMediaTransportControlsSessionManager,
        GlobalSystemMediaTransportControlsSessionMediaProperties,
        GlobalSystemMediaTransportControlsSessionPlaybackStatus,
    },
    Storage::Streams::{Buffer, DataReader, InputStreamOptions},
};

/// Deadline for any single WinRT async operation.
const OP_TIMEOUT: Duration = Duration::from_secs(2);

pub struct SmtcBackend {
    manager: Option<GlobalSystemMediaTransportControlsSessionManager>,
}

impl SmtcBackend {
    pub fn new() -> Self {
        let manager = match Self::request_manager() {
            Ok(manager) => Some(manager),
            Err(e) => {
                warn!("failed to initialize SMTC session manager: {}", e);
                None
            }
        };
        Self { manager }
    }

    fn request_manager() -> Result<GlobalSystemMediaTransportControlsSessionManager> {
        let operation = GlobalSystemMediaTransportControlsSessionManager::RequestAsync()
            .map_err(|e| anyhow!("failed to create RequestAsync operation: {e}"))?;
        block_on_operation(operation, OP_TIMEOUT)
    }

    fn media_properties(
        &self,
        session: &GlobalSystemMediaTransportControlsSession,
    ) -> Result<GlobalSystemMediaTransportControlsSessionMediaProperties> {
        let operation = session
            .TryGetMediaPropertiesAsync()
            .map_err(|e| anyhow!("failed to request media properties: {e}"))?;
        block_on_operation(operation, OP_TIMEOUT)
    }
}

impl Default for SmtcBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaBackend for SmtcBackend {
    type Session = GlobalSystemMediaTransportControlsSession;

    fn sessions(&mut self) -> Result<Vec<Self::Session>, ProviderError> {
        let manager = self.manager.as_ref().ok_or_else(|| {
            ProviderError::ApiUnavailable("SMTC manager not initialized".to_string())
        })?;
        let sessions = manager
            .GetSessions()
            .map_err(|e| ProviderError::Enumeration(format!("GetSessions: {e}")))?;
        Ok(sessions.into_iter().collect())
    }

    fn app_id(&self, session: &Self::Session) -> Option<String> {
        session
            .SourceAppUserModelId()
            .ok()
            .map(|id| id.to_string())
            .filter(|id| !id.is_empty())
    }

    fn playback_status(&self, session: &Self::Session) -> PlaybackStatus {
        let status = match session.GetPlaybackInfo().and_then(|info| info.PlaybackStatus()) {
            Ok(status) => status,
            Err(e) => {
                debug!("failed to read playback status: {}", e);
                return PlaybackStatus::Unknown;
            }
        };
        // Prefer the named member; unknown codes fall through numerically.
        use GlobalSystemMediaTransportControlsSessionPlaybackStatus as Smtc;
        let name = match status {
            Smtc::Closed => Some("closed"),
            Smtc::Opened => Some("opened"),
            Smtc::Changing => Some("changing"),
            Smtc::Stopped => Some("stopped"),
            Smtc::Playing => Some("playing"),
            Smtc::Paused => Some("paused"),
            _ => None,
        };
        match name {
            Some(name) => PlaybackStatus::Named(name.to_string()),
            None => PlaybackStatus::Code(status.0),
        }
    }

    fn metadata(&self, session: &Self::Session) -> Result<TrackMetadata, ProviderError> {
        let props = self
            .media_properties(session)
            .map_err(|e| ProviderError::MetadataRead(e.to_string()))?;
        Ok(TrackMetadata {
            title: props.Title().map(|s| s.to_string()).unwrap_or_default(),
            artist: props.Artist().map(|s| s.to_string()).unwrap_or_default(),
            album: props
                .AlbumTitle()
                .map(|s| s.to_string())
                .unwrap_or_default(),
        })
    }

    fn save_artwork(&self, session: &Self::Session, dest: &Path) -> Result<bool, ProviderError> {
        let props = self
            .media_properties(session)
            .map_err(|e| ProviderError::ArtworkExtraction(e.to_string()))?;
        let thumbnail = match props.Thumbnail() {
            Ok(thumbnail) => thumbnail,
            Err(_) => return Ok(false),
        };

        let bytes = read_thumbnail(&thumbnail)
            .map_err(|e| ProviderError::ArtworkExtraction(e.to_string()))?;
        let Some(bytes) = bytes else {
            return Ok(false);
        };
        write_artwork_atomic(dest, &bytes)?;
        Ok(true)
    }
}

/// Read the thumbnail stream into memory, bounded by
/// [`MAX_ARTWORK_BYTES`]. `Ok(None)` means the stream was empty.
fn read_thumbnail(
    thumbnail: &windows::Storage::Streams::IRandomAccessStreamReference,
) -> Result<Option<Vec<u8>>> {
    let stream = block_on_operation(
        thumbnail
            .OpenReadAsync()
            .map_err(|e| anyhow!("OpenReadAsync: {e}"))?,
        OP_TIMEOUT,
    )?;

    let size = stream.Size().map_err(|e| anyhow!("stream size: {e}"))?;
    if size == 0 {
        return Ok(None);
    }
    if size > MAX_ARTWORK_BYTES as u64 {
        return Err(anyhow!("thumbnail stream of {size} bytes exceeds cap"));
    }

    let buffer = Buffer::Create(size as u32).map_err(|e| anyhow!("Buffer::Create: {e}"))?;
    let buffer = block_on_progress_operation(
        stream
            .ReadAsync(&buffer, size as u32, InputStreamOptions::None)
            .map_err(|e| anyhow!("ReadAsync: {e}"))?,
        OP_TIMEOUT,
    )?;

    let length = buffer.Length().map_err(|e| anyhow!("buffer length: {e}"))? as usize;
    if length == 0 {
        return Ok(None);
    }
    let reader =
        DataReader::FromBuffer(&buffer).map_err(|e| anyhow!("DataReader::FromBuffer: {e}"))?;
    let mut bytes = vec![0u8; length];
    reader
        .ReadBytes(&mut bytes)
        .map_err(|e| anyhow!("ReadBytes: {e}"))?;
    Ok(Some(bytes))
}

/// Block on a WinRT async operation with a deadline.
fn block_on_operation<T>(operation: IAsyncOperation<T>, timeout: Duration) -> Result<T>
where
    T: windows::core::RuntimeType + Clone,
{
    wait_until_complete(|| operation.Status(), timeout)?;
    operation
        .GetResults()
        .map_err(|e| anyhow!("failed to get operation results: {e}"))
}

/// Same as [`block_on_operation`] for operations that report progress.
fn block_on_progress_operation<T, P>(
    operation: IAsyncOperationWithProgress<T, P>,
    timeout: Duration,
) -> Result<T>
where
    T: windows::core::RuntimeType + Clone,
    P: windows::core::RuntimeType + Clone,
{
    wait_until_complete(|| operation.Status(), timeout)?;
    operation
        .GetResults()
        .map_err(|e| anyhow!("failed to get operation results: {e}"))
}

fn wait_until_complete(
    status: impl Fn() -> windows::core::Result<AsyncStatus>,
    timeout: Duration,
) -> Result<()> {
    let start = Instant::now();
    loop {
        match status().map_err(|e| anyhow!("failed to get operation status: {e}"))? {
            AsyncStatus::Completed => return Ok(()),
            AsyncStatus::Error => return Err(anyhow!("async operation failed")),
            AsyncStatus::Canceled => return Err(anyhow!("async operation was canceled")),
            AsyncStatus::Started => {
                if start.elapsed() > timeout {
                    return Err(anyhow!("async operation timed out"));
                }
                std::thread::sleep(Duration::from_millis(10));
            }
            _ => return Err(anyhow!("unknown async status")),
        }
    }
}
