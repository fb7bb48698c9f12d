//! Linux media session backend via MPRIS (Media Player Remote Interfacing
//! Specification).
//!
//! Queries D-Bus with `dbus-send` and parses its `--print-reply` output.
//! Browser players are deprioritized in enumeration order since they are
//! often playing incidental video rather than music.

use crate::artwork::copy_artwork_file;
use crate::backend::{MediaBackend, ProviderError, TrackMetadata};
use crate::status::PlaybackStatus;
use std::collections::HashMap;
use std::path::Path;
use std::process::Command;
use tracing::debug;

const MPRIS_PREFIX: &str = "org.mpris.MediaPlayer2.";
const BROWSER_HINTS: [&str; 3] = ["firefox", "chrome", "chromium"];

/// One enumerated player, identified by its D-Bus bus name.
#[derive(Clone, Debug)]
pub struct MprisPlayer {
    bus_name: String,
}

pub struct MprisBackend;

impl MprisBackend {
    pub fn new() -> Self {
        Self
    }

    fn list_names(&self) -> Result<String, ProviderError> {
        let output = Command::new("dbus-send")
            .args([
                "--session",
                "--print-reply",
                "--dest=org.freedesktop.DBus",
                "/org/freedesktop/DBus",
                "org.freedesktop.DBus.ListNames",
            ])
            .output()
            .map_err(|e| ProviderError::ApiUnavailable(format!("dbus-send: {e}")))?;
        if !output.status.success() {
            return Err(ProviderError::Enumeration(format!(
                "dbus-send ListNames exited with {}",
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Fetch one property from the player's Player interface, returning the
    /// raw `--print-reply` text.
    fn get_property(&self, bus_name: &str, property: &str) -> Option<String> {
        let output = Command::new("dbus-send")
            .args([
                "--session",
                "--print-reply",
                &format!("--dest={bus_name}"),
                "/org/mpris/MediaPlayer2",
                "org.freedesktop.DBus.Properties.Get",
                "string:org.mpris.MediaPlayer2.Player",
                &format!("string:{property}"),
            ])
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn metadata_dict(&self, bus_name: &str) -> Result<HashMap<String, String>, ProviderError> {
        let reply = self.get_property(bus_name, "Metadata").ok_or_else(|| {
            ProviderError::MetadataRead(format!("no Metadata reply from {bus_name}"))
        })?;
        Ok(parse_metadata_dict(&reply))
    }
}

impl Default for MprisBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaBackend for MprisBackend {
    type Session = MprisPlayer;

    fn sessions(&mut self) -> Result<Vec<MprisPlayer>, ProviderError> {
        let reply = self.list_names()?;

        let mut players = Vec::new();
        let mut browsers = Vec::new();
        for line in reply.lines() {
            if !line.contains(MPRIS_PREFIX) {
                continue;
            }
            let Some(bus_name) = extract_quoted(line) else {
                continue;
            };
            let player = MprisPlayer {
                bus_name: bus_name.to_string(),
            };
            if BROWSER_HINTS.iter().any(|hint| bus_name.contains(hint)) {
                browsers.push(player);
            } else {
                players.push(player);
            }
        }
        players.extend(browsers);
        debug!("found {} MPRIS players", players.len());
        Ok(players)
    }

    fn app_id(&self, session: &MprisPlayer) -> Option<String> {
        let id = session
            .bus_name
            .strip_prefix(MPRIS_PREFIX)
            .unwrap_or(&session.bus_name);
        Some(id.to_string())
    }

    fn playback_status(&self, session: &MprisPlayer) -> PlaybackStatus {
        match self
            .get_property(&session.bus_name, "PlaybackStatus")
            .as_deref()
            .and_then(first_quoted_value)
        {
            Some(status) => PlaybackStatus::Named(status),
            None => PlaybackStatus::Unknown,
        }
    }

    fn metadata(&self, session: &MprisPlayer) -> Result<TrackMetadata, ProviderError> {
        let dict = self.metadata_dict(&session.bus_name)?;
        Ok(TrackMetadata {
            title: dict.get("xesam:title").cloned().unwrap_or_default(),
            artist: dict
                .get("xesam:artist")
                .or_else(|| dict.get("xesam:albumArtist"))
                .cloned()
                .unwrap_or_default(),
            album: dict.get("xesam:album").cloned().unwrap_or_default(),
        })
    }

    fn save_artwork(&self, session: &MprisPlayer, dest: &Path) -> Result<bool, ProviderError> {
        let dict = match self.metadata_dict(&session.bus_name) {
            Ok(dict) => dict,
            Err(_) => return Ok(false),
        };
        let Some(art_url) = dict.get("mpris:artUrl") else {
            return Ok(false);
        };
        // Only local art is copied; remote URLs would mean fetching
        // untrusted data on every poll.
        let Some(path) = art_url.strip_prefix("file://") else {
            debug!("ignoring non-local art URL: {}", art_url);
            return Ok(false);
        };
        copy_artwork_file(Path::new(path), dest)
    }
}

/// First double-quoted token in a `--print-reply` line.
fn extract_quoted(line: &str) -> Option<&str> {
    line.split('"').nth(1)
}

/// First quoted value following the `variant` marker in a property reply.
fn first_quoted_value(reply: &str) -> Option<String> {
    let variant_at = reply.find("variant")?;
    extract_quoted(&reply[variant_at..]).map(str::to_string)
}

/// Parse the `a{sv}` Metadata reply into a flat key→string map. Array
/// values (like `xesam:artist`) collapse to their first element.
fn parse_metadata_dict(reply: &str) -> HashMap<String, String> {
    let lines: Vec<&str> = reply.lines().collect();
    let mut dict = HashMap::new();

    let mut i = 0;
    while i < lines.len() {
        if lines[i].trim().starts_with("dict entry(") {
            let key = lines
                .get(i + 1)
                .copied()
                .and_then(extract_quoted)
                .map(str::to_string);
            if let Some(key) = key {
                // Value is the first quoted string before the next entry,
                // whether inline in a variant or nested inside an array.
                let mut value = None;
                for value_line in lines.iter().skip(i + 2).take(8) {
                    let trimmed = value_line.trim();
                    if trimmed.starts_with("dict entry(") {
                        break;
                    }
                    if trimmed.contains('"') {
                        value = extract_quoted(trimmed).map(str::to_string);
                        break;
                    }
                }
                if let Some(value) = value {
                    dict.insert(key, value);
                }
            }
        }
        i += 1;
    }
    dict
}
