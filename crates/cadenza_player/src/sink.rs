//! 媒体输出能力
//!
//! 引擎只通过 [`MediaSink`] 控制单路音频流，输出端的异步回报通过
//! [`SinkEvent`] 送回引擎。

use std::time::Duration;

/// 音源标识
///
/// 每次切换音源时递增，输出端用它标记事件，
/// 引擎据此丢弃已被替换音源的迟到事件。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct SourceId(pub u64);

impl SourceId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// 输出端事件
#[derive(Debug, Clone, PartialEq)]
pub struct SinkEvent {
    pub source: SourceId,
    pub kind: SinkEventKind,
}

impl SinkEvent {
    pub fn new(source: SourceId, kind: SinkEventKind) -> Self {
        Self { source, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEventKind {
    /// 音源可以播放
    Ready,
    /// 缓冲中
    Waiting,
    /// 已开始出声
    Playing,
    /// 播放到结尾
    Ended,
    /// 音源无法播放
    Error(String),
    /// 播放请求被拒绝
    PlayRejected(SinkError),
}

/// 输出端错误
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SinkError {
    /// 播放请求因音源被替换而中止，不属于用户可见错误
    #[error("Play request aborted by source change")]
    Aborted,
    #[error("Unsupported locator: {0}")]
    Unsupported(String),
    #[error("Failed to open source: {0}")]
    Open(String),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Audio output error: {0}")]
    Output(String),
    #[error("No source loaded")]
    NoSource,
}

/// 单路音频输出
pub trait MediaSink {
    /// 替换当前音源
    fn set_source(&mut self, source: SourceId, locator: &str);

    /// 卸载音源
    fn clear_source(&mut self);

    /// 请求播放；异步失败通过 [`SinkEventKind::PlayRejected`] 或
    /// [`SinkEventKind::Error`] 回报
    fn play(&mut self) -> Result<(), SinkError>;

    fn pause(&mut self);

    /// 当前播放位置
    fn current_time(&self) -> Duration;

    fn set_current_time(&mut self, position: Duration);

    /// 总时长，未知时为 `None`
    fn duration(&self) -> Option<Duration>;
}

impl<S: MediaSink + ?Sized> MediaSink for Box<S> {
    fn set_source(&mut self, source: SourceId, locator: &str) {
        (**self).set_source(source, locator)
    }

    fn clear_source(&mut self) {
        (**self).clear_source()
    }

    fn play(&mut self) -> Result<(), SinkError> {
        (**self).play()
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn current_time(&self) -> Duration {
        (**self).current_time()
    }

    fn set_current_time(&mut self, position: Duration) {
        (**self).set_current_time(position)
    }

    fn duration(&self) -> Option<Duration> {
        (**self).duration()
    }
}
