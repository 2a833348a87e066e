//! Media engine capability driven by the playback session

/// Marker that identifies an HLS manifest address
const ADAPTIVE_MARKER: &str = ".m3u8";

/// Streaming transport chosen for a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceVariant {
    /// Segmented adaptive stream (HLS manifest)
    Adaptive,
    /// Single continuous stream or file
    Progressive,
}

impl SourceVariant {
    /// Pick the variant from the address alone (substring check, no probing)
    pub fn classify(address: &str) -> Self {
        if address.contains(ADAPTIVE_MARKER) {
            SourceVariant::Adaptive
        } else {
            SourceVariant::Progressive
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SourceVariant::Adaptive => "HLS",
            SourceVariant::Progressive => "Progressive",
        }
    }
}

/// Lifecycle events reported by an engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Buffering,
    Ready,
    Ended,
    Error(String),
}

impl EngineEvent {
    /// The source has finished, normally or not; nothing plays until the
    /// next `prepare`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineEvent::Ended | EngineEvent::Error(_))
    }
}

/// Playback backend. Implementations may decode on their own threads but
/// report back only through `poll_events`.
pub trait MediaEngine {
    /// Attach a source. Replaces whatever was bound before.
    fn bind(&mut self, variant: SourceVariant, address: &str);
    fn prepare(&mut self);
    fn play(&mut self);
    fn pause(&mut self);
    /// Stop and release the bound source
    fn stop(&mut self);
    fn set_volume(&mut self, volume: f32);
    fn is_playing(&self) -> bool;
    /// Drain events reported since the last call
    fn poll_events(&mut self) -> Vec<EngineEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_hls() {
        assert_eq!(
            SourceVariant::classify("http://example.com/live/index.m3u8"),
            SourceVariant::Adaptive
        );
        assert_eq!(
            SourceVariant::classify("http://example.com/live/index.m3u8?token=1"),
            SourceVariant::Adaptive
        );
    }

    #[test]
    fn test_classify_progressive() {
        assert_eq!(SourceVariant::classify("http://example.com/1.ts"), SourceVariant::Progressive);
        assert_eq!(SourceVariant::classify("http://example.com/movie.mp4"), SourceVariant::Progressive);
        assert_eq!(SourceVariant::classify(""), SourceVariant::Progressive);
    }

    #[test]
    fn test_classify_is_case_sensitive() {
        assert_eq!(SourceVariant::classify("http://example.com/INDEX.M3U8"), SourceVariant::Progressive);
    }

    #[test]
    fn test_terminal_events() {
        assert!(EngineEvent::Ended.is_terminal());
        assert!(EngineEvent::Error("boom".to_string()).is_terminal());
        assert!(!EngineEvent::Ready.is_terminal());
        assert!(!EngineEvent::Buffering.is_terminal());
    }
}
