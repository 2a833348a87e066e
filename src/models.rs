//! Data models for the IPTV player

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder name for an `#EXTINF:` line without a title
pub const UNKNOWN_CHANNEL: &str = "Unknown Channel";

/// Category used when a channel has no `group-title`
pub const DEFAULT_CATEGORY: &str = "General";

/// Catalog-assigned channel identity. `0` means "not stored yet".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl ChannelId {
    pub const UNASSIGNED: ChannelId = ChannelId(0);

    pub fn is_assigned(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Channel/Stream information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub id: ChannelId,
    pub name: String,
    pub url: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub last_played: Option<DateTime<Utc>>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl Channel {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            id: ChannelId::UNASSIGNED,
            name: name.to_string(),
            url: url.to_string(),
            category: default_category(),
            logo: String::new(),
            is_favorite: false,
            last_played: None,
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn with_logo(mut self, logo: &str) -> Self {
        self.logo = logo.to_string();
        self
    }
}

/// Subscribed playlist source (persisted in the catalog)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub is_local: bool,
    pub last_updated: DateTime<Utc>,
}

impl Playlist {
    /// Build a playlist record from a URL or file path.
    /// Anything that isn't http(s) is treated as a local file.
    pub fn from_source(source: &str) -> Self {
        let source = source.trim();
        let lower = source.to_lowercase();
        let is_local = !(lower.starts_with("http://") || lower.starts_with("https://"));

        let name = source
            .split(['/', '\\'])
            .rfind(|s| !s.is_empty())
            .map(|s| s.split('?').next().unwrap_or(s))
            .filter(|s| !s.is_empty())
            .unwrap_or(source)
            .to_string();

        Self {
            name,
            url: source.to_string(),
            is_local,
            last_updated: Utc::now(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }
}

/// Recently played entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackHistoryEntry {
    pub channel_id: ChannelId,
    pub channel_name: String,
    pub played_at: DateTime<Utc>,
    /// Seconds watched
    #[serde(default)]
    pub duration: u64,
}

impl PlaybackHistoryEntry {
    pub fn new(channel: &Channel) -> Self {
        Self {
            channel_id: channel.id,
            channel_name: channel.name.clone(),
            played_at: Utc::now(),
            duration: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_from_url() {
        let playlist = Playlist::from_source("http://example.com/lists/tv.m3u?token=abc");
        assert!(!playlist.is_local);
        assert_eq!(playlist.name, "tv.m3u");
        assert_eq!(playlist.url, "http://example.com/lists/tv.m3u?token=abc");
    }

    #[test]
    fn test_playlist_from_path() {
        let playlist = Playlist::from_source("/home/user/channels.m3u");
        assert!(playlist.is_local);
        assert_eq!(playlist.name, "channels.m3u");
    }

    #[test]
    fn test_playlist_name_skips_trailing_separators() {
        assert_eq!(Playlist::from_source("http://example.com/lists/").name, "lists");
        assert_eq!(Playlist::from_source("C:\\tv\\local.m3u").name, "local.m3u");
    }

    #[test]
    fn test_channel_defaults_on_deserialize() {
        let channel: Channel =
            serde_json::from_str(r#"{"name":"CNN","url":"http://example.com/cnn.ts"}"#).unwrap();
        assert_eq!(channel.id, ChannelId::UNASSIGNED);
        assert_eq!(channel.category, "General");
        assert_eq!(channel.logo, "");
        assert!(!channel.is_favorite);
        assert!(channel.last_played.is_none());
    }
}
