//! M3U playlist parser/writer with HTTPS download support

use std::io::Read;
use std::path::Path;
use std::time::Duration;

use flate2::read::GzDecoder;
use log::{debug, info};

use crate::error::{Error, Result};
use crate::models::{Channel, Playlist, DEFAULT_CATEGORY, UNKNOWN_CHANNEL};

const EXTM3U: &str = "#EXTM3U";
const EXTINF: &str = "#EXTINF:";

/// Channel metadata from an `#EXTINF:` line still waiting for its URL line
struct PendingChannel {
    name: String,
    category: String,
    logo: String,
}

impl PendingChannel {
    fn from_extinf(line: &str) -> Self {
        let name = match line.rfind(',') {
            Some(comma_pos) => line[comma_pos + 1..].trim().to_string(),
            None => UNKNOWN_CHANNEL.to_string(),
        };

        Self {
            name,
            category: extract_attr(line, "group-title")
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            logo: extract_attr(line, "tvg-logo").unwrap_or_default(),
        }
    }

    fn finish(self, url: &str) -> Channel {
        Channel::new(&self.name, url)
            .with_category(&self.category)
            .with_logo(&self.logo)
    }
}

/// Extract `attr="value"` from an EXTINF line
fn extract_attr(line: &str, attr_name: &str) -> Option<String> {
    let search = format!("{}=\"", attr_name);
    let start = line.find(&search)? + search.len();
    let rest = &line[start..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

/// Parse M3U content and extract channels.
///
/// Never fails: unknown lines are skipped, an `#EXTINF:` without a following
/// URL is dropped, and a URL without a preceding `#EXTINF:` is ignored.
pub fn parse_m3u(content: &str) -> Vec<Channel> {
    let mut channels = Vec::new();
    let mut pending: Option<PendingChannel> = None;

    for line in content.lines() {
        let line = line.trim();

        if line.starts_with(EXTINF) {
            pending = Some(PendingChannel::from_extinf(line));
        } else if line.starts_with("http") {
            if let Some(channel) = pending.take() {
                channels.push(channel.finish(line));
            }
        }
    }

    channels
}

/// Write channels back out as M3U text.
/// Names and attribute values are written raw (no escaping).
pub fn generate_m3u(channels: &[Channel]) -> String {
    let mut content = String::with_capacity(16 + channels.len() * 96);
    content.push_str(EXTM3U);
    content.push('\n');

    for channel in channels {
        content.push_str(&format!(
            "{}-1 group-title=\"{}\" tvg-logo=\"{}\",{}\n",
            EXTINF, channel.category, channel.logo, channel.name
        ));
        content.push_str(&channel.url);
        content.push('\n');
    }

    content
}

/// Decode a playlist body, inflating it first if it is gzip compressed
fn decode_body(bytes: Vec<u8>) -> Result<String> {
    // gzip magic number (1f 8b)
    if bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b {
        let mut decoder = GzDecoder::new(bytes.as_slice());
        let mut inflated = Vec::new();
        decoder.read_to_end(&mut inflated)?;
        debug!("Inflated gzip playlist: {} -> {} bytes", bytes.len(), inflated.len());
        return Ok(String::from_utf8_lossy(&inflated).into_owned());
    }

    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

/// Download a playlist (supports HTTP and HTTPS, plain or gzip)
pub fn download_playlist(url: &str, user_agent: &str) -> Result<String> {
    let agent = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(120)))
        .timeout_connect(Some(Duration::from_secs(30)))
        .http_status_as_error(false)
        .build()
        .new_agent();

    let mut response = agent
        .get(url)
        .header("User-Agent", user_agent)
        .call()
        .map_err(|e| Error::Http(e.to_string()))?;

    if response.status() != 200 {
        return Err(Error::Http(format!("HTTP error: {}", response.status())));
    }

    let bytes = response
        .body_mut()
        .with_config()
        .limit(256 * 1024 * 1024)
        .read_to_vec()
        .map_err(|e| Error::Http(format!("Read failed: {}", e)))?;

    decode_body(bytes)
}

/// Read a playlist from disk (plain or gzip)
pub fn read_playlist_file(path: impl AsRef<Path>) -> Result<String> {
    let bytes = std::fs::read(path)?;
    decode_body(bytes)
}

/// Fetch a playlist source and parse its channels
pub fn load_playlist(playlist: &Playlist, user_agent: &str) -> Result<Vec<Channel>> {
    let content = if playlist.is_local {
        read_playlist_file(&playlist.url)?
    } else {
        download_playlist(&playlist.url, user_agent)?
    };

    let channels = parse_m3u(&content);
    info!("Loaded {} channels from '{}' ({})", channels.len(), playlist.name, playlist.url);
    Ok(channels)
}
