//! macOS media session backend via AppleScript.
//!
//! Queries Music.app and Spotify through `osascript`, the same channel the
//! apps expose for automation. Spotify is checked first since dedicated
//! player users tend to run it alongside an idle Music.app. Artwork is only
//! available from Music.app, whose scripting dictionary exposes the raw
//! image data.

use crate::artwork::MAX_ARTWORK_BYTES;
use crate::backend::{MediaBackend, ProviderError, TrackMetadata};
use crate::status::PlaybackStatus;
use std::fs;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// The player apps this backend knows how to script.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MacPlayer {
    Spotify,
    Music,
}

impl MacPlayer {
    fn app_name(&self) -> &'static str {
        match self {
            MacPlayer::Spotify => "Spotify",
            MacPlayer::Music => "Music",
        }
    }

    fn bundle_id(&self) -> &'static str {
        match self {
            MacPlayer::Spotify => "com.spotify.client",
            MacPlayer::Music => "com.apple.Music",
        }
    }
}

pub struct AppleScriptBackend;

impl AppleScriptBackend {
    pub fn new() -> Self {
        Self
    }

    fn run_script(&self, script: &str) -> Result<String, ProviderError> {
        let output = Command::new("osascript")
            .arg("-e")
            .arg(script)
            .output()
            .map_err(|e| ProviderError::ApiUnavailable(format!("osascript: {e}")))?;
        if !output.status.success() {
            return Err(ProviderError::MetadataRead(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn is_app_running(&self, player: MacPlayer) -> Result<bool, ProviderError> {
        let script = format!(
            "tell application \"System Events\" to (name of processes) contains \"{}\"",
            player.app_name()
        );
        Ok(self.run_script(&script)? == "true")
    }
}

impl Default for AppleScriptBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaBackend for AppleScriptBackend {
    type Session = MacPlayer;

    fn sessions(&mut self) -> Result<Vec<MacPlayer>, ProviderError> {
        let mut players = Vec::new();
        for player in [MacPlayer::Spotify, MacPlayer::Music] {
            match self.is_app_running(player) {
                Ok(true) => players.push(player),
                Ok(false) => {}
                // A scripting failure for one app should not hide the other.
                Err(ProviderError::ApiUnavailable(e)) => {
                    return Err(ProviderError::ApiUnavailable(e))
                }
                Err(e) => debug!("running check failed for {}: {}", player.app_name(), e),
            }
        }
        Ok(players)
    }

    fn app_id(&self, session: &MacPlayer) -> Option<String> {
        Some(session.bundle_id().to_string())
    }

    fn playback_status(&self, session: &MacPlayer) -> PlaybackStatus {
        let script = format!(
            "tell application \"{}\" to player state as string",
            session.app_name()
        );
        match self.run_script(&script) {
            Ok(state) if !state.is_empty() => PlaybackStatus::Named(state),
            _ => PlaybackStatus::Unknown,
        }
    }

    fn metadata(&self, session: &MacPlayer) -> Result<TrackMetadata, ProviderError> {
        let script = format!(
            r#"
            tell application "{app}"
                if player state is playing or player state is paused then
                    set trackName to name of current track
                    set trackArtist to artist of current track
                    set trackAlbum to album of current track
                    return trackName & "|||" & trackArtist & "|||" & trackAlbum
                else
                    return ""
                end if
            end tell
            "#,
            app = session.app_name()
        );
        let reply = self.run_script(&script)?;
        if reply.is_empty() {
            return Ok(TrackMetadata::default());
        }
        let mut parts = reply.split("|||");
        Ok(TrackMetadata {
            title: parts.next().unwrap_or_default().to_string(),
            artist: parts.next().unwrap_or_default().to_string(),
            album: parts.next().unwrap_or_default().to_string(),
        })
    }

    fn save_artwork(&self, session: &MacPlayer, dest: &Path) -> Result<bool, ProviderError> {
        // Spotify's scripting dictionary only hands out a remote artwork
        // URL, which this backend does not fetch.
        if *session != MacPlayer::Music {
            return Ok(false);
        }

        let tmp = dest.with_extension("jpg.tmp");
        let tmp_posix = tmp.to_string_lossy();
        let script = format!(
            r#"
            tell application "Music"
                if player state is playing or player state is paused then
                    try
                        set myArtwork to artwork 1 of current track
                        if format of myArtwork is JPEG picture then
                            set myData to data of myArtwork
                            set myFile to (open for access (POSIX file "{tmp_posix}") with write permission)
                            set eof of myFile to 0
                            write myData to myFile
                            close access myFile
                            return "ok"
                        end if
                    on error errMsg
                        try
                            close access (POSIX file "{tmp_posix}")
                        end try
                        return "error: " & errMsg
                    end try
                end if
                return "none"
            end tell
            "#
        );

        let reply = self.run_script(&script)?;
        if reply != "ok" {
            let _ = fs::remove_file(&tmp);
            debug!("no artwork from Music.app: {}", reply);
            return Ok(false);
        }

        let written = fs::metadata(&tmp).map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            let _ = fs::remove_file(&tmp);
            return Ok(false);
        }
        if written > MAX_ARTWORK_BYTES as u64 {
            let _ = fs::remove_file(&tmp);
            return Err(ProviderError::ArtworkExtraction(format!(
                "artwork of {written} bytes exceeds cap"
            )));
        }
        fs::rename(&tmp, dest).map_err(|e| {
            ProviderError::ArtworkExtraction(format!("failed to move artwork into place: {e}"))
        })?;
        Ok(true)
    }
}
