//! 音频输出
//!
//! 默认的 [`NullOutput`] 不出声，只按实时速度消耗采样，用来驱动进度与播放结束。
//! 启用 `cpal` feature 后改用默认输出设备。

use std::time::{Duration, Instant};

/// 音频输出错误
#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    #[error("No output device available")]
    NoDevice,
    #[error("No supported config")]
    NoConfig,
    #[error("Stream error: {0}")]
    Stream(String),
}

/// 音频输出配置
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// 每声道缓冲的帧数
    pub buffer_size: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            buffer_size: 8192,
        }
    }
}

/// 音频输出
pub trait AudioOutput {
    /// 写入交错采样；缓冲区已满时返回 `false`，调用方稍后重试
    fn write(&mut self, samples: &[f32]) -> bool;

    fn set_playing(&mut self, playing: bool) -> Result<(), OutputError>;

    /// 自上次重置以来已经播放的时长
    fn position(&self) -> Duration;

    /// 清空缓冲并把位置归零
    fn reset_position(&mut self);

    /// 已写入的采样是否全部播放完
    fn is_drained(&self) -> bool;

    /// 欠载次数
    fn underruns(&self) -> u64 {
        0
    }
}

/// 打开输出
#[cfg(not(feature = "cpal"))]
pub fn open_output(config: OutputConfig) -> Result<Box<dyn AudioOutput>, OutputError> {
    Ok(Box::new(NullOutput::new(config)))
}

/// 打开输出
#[cfg(feature = "cpal")]
pub fn open_output(config: OutputConfig) -> Result<Box<dyn AudioOutput>, OutputError> {
    Ok(Box::new(crate::CpalOutput::new(config)?))
}

pub(crate) fn frames_to_duration(frames: u64, sample_rate: u32) -> Duration {
    Duration::from_nanos(frames * 1_000_000_000 / sample_rate.max(1) as u64)
}

/// 按实时速度消耗采样的静音输出
pub struct NullOutput {
    config: OutputConfig,
    written_frames: u64,
    played: Duration,
    resumed_at: Option<Instant>,
}

impl NullOutput {
    pub fn new(config: OutputConfig) -> Self {
        Self {
            config,
            written_frames: 0,
            played: Duration::ZERO,
            resumed_at: None,
        }
    }

    fn written(&self) -> Duration {
        frames_to_duration(self.written_frames, self.config.sample_rate)
    }

    fn elapsed(&self) -> Duration {
        let running = self.resumed_at.map(|at| at.elapsed()).unwrap_or_default();
        self.played + running
    }

    fn capacity(&self) -> Duration {
        frames_to_duration(self.config.buffer_size as u64, self.config.sample_rate)
    }
}

impl AudioOutput for NullOutput {
    fn write(&mut self, samples: &[f32]) -> bool {
        let buffered = self.written().saturating_sub(self.elapsed());
        if buffered >= self.capacity() {
            return false;
        }
        self.written_frames += (samples.len() / self.config.channels.max(1) as usize) as u64;
        true
    }

    fn set_playing(&mut self, playing: bool) -> Result<(), OutputError> {
        match (playing, self.resumed_at) {
            (true, None) => self.resumed_at = Some(Instant::now()),
            (false, Some(at)) => {
                self.played += at.elapsed();
                self.resumed_at = None;
            }
            _ => {}
        }
        Ok(())
    }

    fn position(&self) -> Duration {
        self.elapsed().min(self.written())
    }

    fn reset_position(&mut self) {
        self.written_frames = 0;
        self.played = Duration::ZERO;
        if self.resumed_at.is_some() {
            self.resumed_at = Some(Instant::now());
        }
    }

    fn is_drained(&self) -> bool {
        self.elapsed() >= self.written()
    }
}
