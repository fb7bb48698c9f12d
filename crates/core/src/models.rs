use serde::{Deserialize, Serialize};

/// One answer to a `/nowplaying` request. Built fresh per request, never
/// persisted. Serializes to the JSON object the browser overlay polls.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlayingSnapshot {
    pub playing: bool,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NowPlayingSnapshot {
    /// Snapshot for "nothing is playing" paths, carrying the reason.
    pub fn idle(error: impl Into<String>) -> Self {
        Self {
            playing: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Snapshot returned when the provider exceeded its time budget.
    pub fn timed_out() -> Self {
        Self::idle("timeout")
    }

    /// True when this snapshot carries displayable metadata.
    pub fn has_metadata(&self) -> bool {
        !self.title.is_empty() || !self.artist.is_empty()
    }
}

/// Result of the worker's port negotiation, fixed once the bind succeeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortBinding {
    /// Port the caller asked for, if any.
    pub requested_port: Option<u16>,
    /// Port actually bound.
    pub bound_port: u16,
    /// 1-based bind attempt that succeeded.
    pub attempt: u32,
}

/// Controller-side view of the worker process lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Starting,
    Running,
    CrashedUnexpectedly,
}

impl ServerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerState::Stopped => "stopped",
            ServerState::Starting => "starting",
            ServerState::Running => "running",
            ServerState::CrashedUnexpectedly => "crashed",
        }
    }
}

impl std::fmt::Display for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_always_serializes_playing_key() {
        let idle = NowPlayingSnapshot::idle("No active media session");
        let json: serde_json::Value = serde_json::to_value(&idle).unwrap();
        assert_eq!(json["playing"], serde_json::Value::Bool(false));
        assert_eq!(json["error"], "No active media session");
        assert!(json.get("appId").is_none());
        assert!(json.get("artworkRef").is_none());
    }

    #[test]
    fn snapshot_uses_camel_case_keys() {
        let snap = NowPlayingSnapshot {
            playing: true,
            title: "Song".into(),
            artist: "Artist".into(),
            album: "Album".into(),
            status: "playing".into(),
            app_id: Some("com.example.player".into()),
            artwork_ref: Some("/artwork?t=12345".into()),
            error: None,
        };
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"appId\":\"com.example.player\""));
        assert!(json.contains("\"artworkRef\":\"/artwork?t=12345\""));
        assert!(!json.contains("error"));
    }

    #[test]
    fn minimal_payload_keeps_empty_fields() {
        let snap = NowPlayingSnapshot {
            playing: true,
            status: "playing".into(),
            app_id: Some("player.exe".into()),
            ..Default::default()
        };
        let json: serde_json::Value = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["playing"], true);
        assert_eq!(json["title"], "");
        assert_eq!(json["artist"], "");
        assert!(!snap.has_metadata());
    }

    #[test]
    fn server_state_display() {
        assert_eq!(ServerState::Running.to_string(), "running");
        assert_eq!(ServerState::CrashedUnexpectedly.to_string(), "crashed");
    }
}
