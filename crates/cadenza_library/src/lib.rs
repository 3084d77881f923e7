//! cadenza_library - 曲库
//!
//! 从作品目录 (JSON) 推导出可播放的曲目列表。

mod catalog;
mod track;

pub use catalog::*;
pub use track::*;

/// 曲库错误
#[derive(thiserror::Error, Debug)]
pub enum LibraryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}
