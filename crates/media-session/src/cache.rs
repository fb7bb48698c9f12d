//! Last-known metadata, keyed by application identifier.
//!
//! Papers over transient provider gaps: when a session reports "playing"
//! but its metadata read fails, the last non-empty title/artist/album seen
//! for that app is substituted so the overlay does not flash empty fields.
//! Entries are never expired, only overwritten by the next non-empty read.

use crate::backend::TrackMetadata;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: HashMap<String, TrackMetadata>,
}

impl MetadataCache {
    /// Remember metadata for an app. Empty metadata is ignored so a bad
    /// read can never clobber a good entry.
    pub fn put(&mut self, app_id: &str, metadata: &TrackMetadata) {
        if metadata.is_displayable() {
            self.entries.insert(app_id.to_string(), metadata.clone());
        }
    }

    pub fn get(&self, app_id: &str) -> Option<&TrackMetadata> {
        self.entries.get(app_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(title: &str, artist: &str, album: &str) -> TrackMetadata {
        TrackMetadata {
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
        }
    }

    #[test]
    fn stores_and_returns_by_app_id() {
        let mut cache = MetadataCache::default();
        cache.put("spotify", &meta("Song", "Artist", "Album"));
        assert_eq!(cache.get("spotify"), Some(&meta("Song", "Artist", "Album")));
        assert_eq!(cache.get("vlc"), None);
    }

    #[test]
    fn empty_metadata_never_overwrites() {
        let mut cache = MetadataCache::default();
        cache.put("spotify", &meta("Song", "Artist", "Album"));
        cache.put("spotify", &meta("", "", ""));
        assert_eq!(cache.get("spotify"), Some(&meta("Song", "Artist", "Album")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn empty_metadata_is_not_inserted() {
        let mut cache = MetadataCache::default();
        cache.put("spotify", &meta("", "", "Album Only"));
        assert!(cache.is_empty());
    }

    #[test]
    fn title_only_is_enough() {
        let mut cache = MetadataCache::default();
        cache.put("vlc", &meta("Song", "", ""));
        assert_eq!(cache.get("vlc").unwrap().title, "Song");
    }

    #[test]
    fn newer_read_overwrites() {
        let mut cache = MetadataCache::default();
        cache.put("spotify", &meta("One", "A", ""));
        cache.put("spotify", &meta("Two", "B", ""));
        assert_eq!(cache.get("spotify").unwrap().title, "Two");
    }
}
