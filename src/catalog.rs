//! Channel catalog: channels, playlist sources and playback history

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Channel, ChannelId, PlaybackHistoryEntry, Playlist};

/// Most recent history entries kept
pub const HISTORY_LIMIT: usize = 50;

/// Storage contract used by the player front end
pub trait CatalogStore {
    /// All channels sorted by name
    fn get_all(&self) -> Vec<Channel>;
    fn get_by_category(&self, category: &str) -> Vec<Channel>;
    fn get_categories(&self) -> BTreeSet<String>;
    fn get(&self, id: ChannelId) -> Option<Channel>;
    fn get_favorites(&self) -> Vec<Channel>;
    /// Drop every stored channel and store these instead. Returns them with ids assigned.
    fn replace_all(&mut self, channels: Vec<Channel>) -> Result<Vec<Channel>>;
    /// Returns the new favorite flag
    fn toggle_favorite(&mut self, id: ChannelId) -> Result<bool>;
    fn mark_played(&mut self, id: ChannelId, at: DateTime<Utc>) -> Result<()>;

    fn insert_history(&mut self, entry: PlaybackHistoryEntry) -> Result<()>;
    /// Newest first
    fn recent_history(&self) -> Vec<PlaybackHistoryEntry>;
    /// Returns how many entries were removed
    fn delete_history_older_than(&mut self, timestamp: DateTime<Utc>) -> Result<usize>;
    fn clear_history(&mut self) -> Result<()>;

    /// Sorted by name
    fn playlists(&self) -> Vec<Playlist>;
    /// Adds a source, replacing one with the same url
    fn add_playlist(&mut self, playlist: Playlist) -> Result<()>;
    fn remove_playlist(&mut self, url: &str) -> Result<bool>;
}

/// Serialized catalog contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogData {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    channels: Vec<Channel>,
    #[serde(default)]
    playlists: Vec<Playlist>,
    #[serde(default)]
    history: Vec<PlaybackHistoryEntry>,
}

impl CatalogData {
    fn channel_mut(&mut self, id: ChannelId) -> Result<&mut Channel> {
        self.channels
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(Error::ChannelNotFound(id))
    }

    fn push_history(&mut self, entry: PlaybackHistoryEntry) {
        self.history.retain(|h| h.channel_id != entry.channel_id);
        self.history.insert(0, entry);
        self.history.truncate(HISTORY_LIMIT);
    }
}

/// In-process catalog, optionally persisted to a JSON file after every change
#[derive(Debug, Default)]
pub struct Catalog {
    data: CatalogData,
    path: Option<PathBuf>,
}

impl Catalog {
    /// Catalog that lives only in memory
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open (or create) a catalog backed by a JSON file.
    /// A corrupt file is logged and replaced by an empty catalog.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let data = if path.exists() {
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str(&content) {
                Ok(data) => data,
                Err(e) => {
                    warn!("Ignoring unreadable catalog {}: {}", path.display(), e);
                    CatalogData::default()
                }
            }
        } else {
            CatalogData::default()
        };

        debug!("Opened catalog {} ({} channels)", path.display(), data.channels.len());
        Ok(Self {
            data,
            path: Some(path),
        })
    }

    /// Default catalog location next to the config file
    pub fn default_path() -> PathBuf {
        crate::config::app_dir().join("catalog.json")
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn save(&self) -> Result<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.data)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Byte-wise name order; channels with equal names keep their stored order
fn sorted_by_name(mut channels: Vec<Channel>) -> Vec<Channel> {
    channels.sort_by(|a, b| a.name.cmp(&b.name));
    channels
}

impl CatalogStore for Catalog {
    fn get_all(&self) -> Vec<Channel> {
        sorted_by_name(self.data.channels.clone())
    }

    fn get_by_category(&self, category: &str) -> Vec<Channel> {
        sorted_by_name(
            self.data
                .channels
                .iter()
                .filter(|c| c.category == category)
                .cloned()
                .collect(),
        )
    }

    fn get_categories(&self) -> BTreeSet<String> {
        self.data.channels.iter().map(|c| c.category.clone()).collect()
    }

    fn get(&self, id: ChannelId) -> Option<Channel> {
        self.data.channels.iter().find(|c| c.id == id).cloned()
    }

    fn get_favorites(&self) -> Vec<Channel> {
        sorted_by_name(self.data.channels.iter().filter(|c| c.is_favorite).cloned().collect())
    }

    fn replace_all(&mut self, mut channels: Vec<Channel>) -> Result<Vec<Channel>> {
        for channel in channels.iter_mut() {
            self.data.next_id += 1;
            channel.id = ChannelId(self.data.next_id);
        }
        self.data.channels = channels;
        self.save()?;
        info!("Catalog now holds {} channels", self.data.channels.len());
        Ok(self.data.channels.clone())
    }

    fn toggle_favorite(&mut self, id: ChannelId) -> Result<bool> {
        let channel = self.data.channel_mut(id)?;
        channel.is_favorite = !channel.is_favorite;
        let is_favorite = channel.is_favorite;
        self.save()?;
        Ok(is_favorite)
    }

    fn mark_played(&mut self, id: ChannelId, at: DateTime<Utc>) -> Result<()> {
        self.data.channel_mut(id)?.last_played = Some(at);
        self.save()
    }

    fn insert_history(&mut self, entry: PlaybackHistoryEntry) -> Result<()> {
        self.data.push_history(entry);
        self.save()
    }

    fn recent_history(&self) -> Vec<PlaybackHistoryEntry> {
        self.data.history.clone()
    }

    fn delete_history_older_than(&mut self, timestamp: DateTime<Utc>) -> Result<usize> {
        let before = self.data.history.len();
        self.data.history.retain(|h| h.played_at >= timestamp);
        let removed = before - self.data.history.len();
        if removed > 0 {
            self.save()?;
        }
        Ok(removed)
    }

    fn clear_history(&mut self) -> Result<()> {
        self.data.history.clear();
        self.save()
    }

    fn playlists(&self) -> Vec<Playlist> {
        let mut playlists = self.data.playlists.clone();
        playlists.sort_by(|a, b| a.name.cmp(&b.name));
        playlists
    }

    fn add_playlist(&mut self, playlist: Playlist) -> Result<()> {
        match self.data.playlists.iter_mut().find(|p| p.url == playlist.url) {
            Some(existing) => *existing = playlist,
            None => self.data.playlists.push(playlist),
        }
        self.save()
    }

    fn remove_playlist(&mut self, url: &str) -> Result<bool> {
        let before = self.data.playlists.len();
        self.data.playlists.retain(|p| p.url != url);
        let removed = self.data.playlists.len() != before;
        if removed {
            self.save()?;
        }
        Ok(removed)
    }
}
