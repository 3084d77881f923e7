//! 引擎配置

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 配置错误
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// 引擎配置
///
/// 时间以毫秒整数写入 TOML，例如：
///
/// ```toml
/// double_press_window_ms = 2000
/// restart_threshold_ms = 3000
/// seek_offset_ms = 10000
/// cdn_base = "https://cdn.example.com/portfolio"
/// artist = "A. Composer"
/// album = "Portfolio"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 两次「上一首」之间小于该间隔视为双击
    pub double_press_window_ms: u64,
    /// 播放超过该位置时「上一首」先回到开头
    pub restart_threshold_ms: u64,
    /// 媒体键快进/快退的默认步长
    pub seek_offset_ms: u64,
    /// 本地路径映射到的 CDN 前缀
    pub cdn_base: Option<String>,
    /// 媒体会话中显示的作曲者
    pub artist: Option<String>,
    /// 媒体会话中显示的专辑名
    pub album: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            double_press_window_ms: 2000,
            restart_threshold_ms: 3000,
            seek_offset_ms: 10_000,
            cdn_base: None,
            artist: None,
            album: None,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    pub fn double_press_window(&self) -> Duration {
        Duration::from_millis(self.double_press_window_ms)
    }

    pub fn restart_threshold(&self) -> Duration {
        Duration::from_millis(self.restart_threshold_ms)
    }

    pub fn seek_offset(&self) -> Duration {
        Duration::from_millis(self.seek_offset_ms)
    }
}
