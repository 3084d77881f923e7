//! 引擎命令和事件定义

use std::time::Duration;

use cadenza_library::Track;

/// 引擎命令（UI -> 引擎）
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// 追加到队列末尾
    Enqueue(Track),
    /// 一次性追加多首
    EnqueueMany(Vec<Track>),
    /// 立即播放（关闭随机并清空上下文）
    PlayNow(Track),
    /// 立即播放（保留随机状态）
    ForcePlay(Track),
    /// 播放队列中指定位置
    PlayFromQueue(usize),
    /// 移除队列中指定位置
    RemoveFromQueue(usize),
    /// 移动队列条目
    MoveInQueue { from: usize, to: usize },
    /// 清空队列
    ClearQueue,
    TogglePlay,
    Next,
    Prev,
    ToggleShuffle,
    ToggleRepeat,
    /// 跳转到指定位置
    Seek(Duration),
    /// 系统媒体控制
    Media(MediaAction),
    /// 关闭引擎
    Shutdown,
}

/// 引擎事件（引擎 -> UI）
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// 可观察状态变更
    Snapshot(EngineSnapshot),
    /// 播放进度更新
    Position {
        position: Duration,
        duration: Option<Duration>,
    },
}

/// 系统媒体控制动作（媒体键、锁屏控件等）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaAction {
    Play,
    Pause,
    Next,
    Previous,
    /// 快进，`None` 时使用配置的默认步长
    SeekForward(Option<Duration>),
    /// 快退，`None` 时使用配置的默认步长
    SeekBackward(Option<Duration>),
}

/// 播放状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Loading,
    Playing,
    Paused,
}

/// 供 UI 绑定的只读状态
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineSnapshot {
    pub queue: Vec<Track>,
    pub current_index: usize,
    pub current_track: Option<Track>,
    pub is_playing: bool,
    pub is_loading: bool,
    pub is_shuffle: bool,
    pub is_repeat: bool,
    pub state: PlaybackState,
    pub history_len: usize,
    pub pool_len: usize,
}
