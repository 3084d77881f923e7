//! 系统媒体会话
//!
//! 尽力而为：平台不支持时使用 [`NoMediaSession`]。

use cadenza_library::Track;

/// 当前曲目元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMetadata {
    pub title: String,
    pub src: String,
    pub artist: Option<String>,
    pub album: Option<String>,
}

impl TrackMetadata {
    pub fn with_credits(mut self, artist: Option<String>, album: Option<String>) -> Self {
        self.artist = artist;
        self.album = album;
        self
    }
}

impl From<&Track> for TrackMetadata {
    fn from(track: &Track) -> Self {
        Self {
            title: track.title.clone(),
            src: track.src.clone(),
            artist: None,
            album: None,
        }
    }
}

/// 对外公布的播放状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Playing,
    Paused,
}

/// 系统媒体会话
pub trait MediaSession: Send {
    fn set_metadata(&mut self, metadata: &TrackMetadata);

    fn clear_metadata(&mut self);

    fn set_playback_state(&mut self, state: SessionState);
}

/// 不做任何事
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMediaSession;

impl MediaSession for NoMediaSession {
    fn set_metadata(&mut self, _metadata: &TrackMetadata) {}

    fn clear_metadata(&mut self) {}

    fn set_playback_state(&mut self, _state: SessionState) {}
}

/// 把正在播放的信息写入日志
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMediaSession;

impl MediaSession for LogMediaSession {
    fn set_metadata(&mut self, metadata: &TrackMetadata) {
        match &metadata.artist {
            Some(artist) => log::info!("now playing: {} by {}", metadata.title, artist),
            None => log::info!("now playing: {} ({})", metadata.title, metadata.src),
        }
    }

    fn clear_metadata(&mut self) {
        log::info!("nothing playing");
    }

    fn set_playback_state(&mut self, state: SessionState) {
        log::debug!("session state: {:?}", state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_from_track() {
        let track = Track::new("Sonata — Allegro", "/audio/sonata-1.mp3");
        let metadata = TrackMetadata::from(&track);
        assert_eq!(metadata.title, "Sonata — Allegro");
        assert_eq!(metadata.src, "/audio/sonata-1.mp3");
        assert_eq!(metadata.artist, None);

        let metadata = metadata.with_credits(Some("A. Composer".into()), Some("Portfolio".into()));
        assert_eq!(metadata.artist.as_deref(), Some("A. Composer"));
        assert_eq!(metadata.album.as_deref(), Some("Portfolio"));
    }
}
