use crate::models::NowPlayingSnapshot;

/// Seam between the HTTP router and whatever produces now-playing data.
///
/// `poll` is infallible by contract: every failure mode is folded into the
/// snapshot's `error` field so the `/nowplaying` endpoint can always answer
/// with valid JSON.
pub trait NowPlayingSource: Send {
    /// Query the current playback state. May block up to the provider's
    /// internal time budget; callers that need a hard bound race it against
    /// a timer.
    fn poll(&mut self) -> NowPlayingSnapshot;
}
