//! Playback status normalization.
//!
//! Platforms report playback state in different shapes: MPRIS hands back a
//! string, SMTC a numeric enum, AppleScript whatever the script returns.
//! Everything funnels into one lowercase status string so the overlay only
//! ever sees "playing", "paused", and friends.

/// Playback state as a backend reported it, before normalization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackStatus {
    /// The platform exposed a recognizable status name (e.g. MPRIS
    /// "Playing", or a matched SMTC enum member).
    Named(String),
    /// Only a bare numeric code was available.
    Code(i32),
    /// An unrecognized free-form value.
    Raw(String),
    /// The status could not be read at all.
    Unknown,
}

/// Well-known SMTC playback status codes, in enum order.
const CODE_NAMES: [&str; 6] = ["closed", "opened", "changing", "stopped", "playing", "paused"];

impl PlaybackStatus {
    /// Lowercase status string for the snapshot. Named values win, known
    /// numeric codes map to their names, and anything else passes through
    /// lowercased.
    pub fn normalized(&self) -> String {
        match self {
            PlaybackStatus::Named(name) => name.to_lowercase(),
            PlaybackStatus::Code(code) => match usize::try_from(*code).ok() {
                Some(idx) if idx < CODE_NAMES.len() => CODE_NAMES[idx].to_string(),
                _ => code.to_string(),
            },
            PlaybackStatus::Raw(raw) => raw.to_lowercase(),
            PlaybackStatus::Unknown => "unknown".to_string(),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.normalized() == "playing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_status_is_lowercased() {
        assert_eq!(PlaybackStatus::Named("Playing".into()).normalized(), "playing");
        assert!(PlaybackStatus::Named("Playing".into()).is_playing());
        assert_eq!(PlaybackStatus::Named("Paused".into()).normalized(), "paused");
    }

    #[test]
    fn known_codes_map_to_names() {
        assert_eq!(PlaybackStatus::Code(0).normalized(), "closed");
        assert_eq!(PlaybackStatus::Code(2).normalized(), "changing");
        assert_eq!(PlaybackStatus::Code(4).normalized(), "playing");
        assert_eq!(PlaybackStatus::Code(5).normalized(), "paused");
        assert!(PlaybackStatus::Code(4).is_playing());
        assert!(!PlaybackStatus::Code(3).is_playing());
    }

    #[test]
    fn unknown_codes_fall_back_to_digits() {
        assert_eq!(PlaybackStatus::Code(17).normalized(), "17");
        assert_eq!(PlaybackStatus::Code(-1).normalized(), "-1");
    }

    #[test]
    fn raw_and_unknown_fallbacks() {
        assert_eq!(PlaybackStatus::Raw("Buffering".into()).normalized(), "buffering");
        assert_eq!(PlaybackStatus::Unknown.normalized(), "unknown");
        assert!(!PlaybackStatus::Unknown.is_playing());
    }
}
