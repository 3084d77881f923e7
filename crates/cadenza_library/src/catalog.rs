//! 作品目录
//!
//! 目录格式与网站的作品数据一致：
//!
//! ```json
//! { "works": [ { "title": "...", "audioUrl": "/audio/a.mp3",
//!                "movements": [ { "title": "I.", "audioUrl": "/audio/a1.mp3" } ] } ] }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::{LibraryError, Track};

/// 作品目录
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub works: Vec<Work>,
}

/// 单个作品
#[derive(Debug, Clone, Deserialize)]
pub struct Work {
    pub title: String,
    #[serde(rename = "audioUrl", default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub movements: Vec<Movement>,
}

/// 乐章
#[derive(Debug, Clone, Deserialize)]
pub struct Movement {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "audioUrl", default)]
    pub audio_url: Option<String>,
}

impl Catalog {
    /// 解析 JSON 目录
    pub fn from_json(json: &str) -> Result<Self, LibraryError> {
        Ok(serde_json::from_str(json)?)
    }

    /// 从文件读取目录
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LibraryError> {
        let json = fs::read_to_string(path.as_ref())?;
        let catalog = Self::from_json(&json)?;
        log::debug!(
            "loaded {} works from {}",
            catalog.works.len(),
            path.as_ref().display()
        );
        Ok(catalog)
    }

    /// 推导曲库：按目录顺序展开作品与乐章，按 `src` 去重（先出现者保留）
    pub fn library_tracks(&self) -> Vec<Track> {
        let mut seen = HashSet::new();
        let mut tracks = Vec::new();

        let mut push = |track: Track| {
            if seen.insert(track.src.clone()) {
                tracks.push(track);
            }
        };

        for work in &self.works {
            if let Some(src) = non_empty(&work.audio_url) {
                push(Track::new(work.title.clone(), src));
            }

            for (idx, movement) in work.movements.iter().enumerate() {
                let Some(src) = non_empty(&movement.audio_url) else {
                    continue;
                };
                let label = match non_empty(&movement.title) {
                    Some(title) => title.to_string(),
                    None => format!("Movement {}", idx + 1),
                };
                push(Track::new(format!("{} — {}", work.title, label), src));
            }
        }

        tracks
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
