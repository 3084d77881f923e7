//! 使用 cpal 的设备输出

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};

use crate::output::frames_to_duration;
use crate::{AudioOutput, OutputConfig, OutputError};

/// 默认设备上的输出流
pub struct CpalOutput {
    _stream: Stream,
    ring: Arc<RingBuffer>,
    is_playing: Arc<AtomicBool>,
    position_frames: Arc<AtomicU64>,
    underruns: Arc<AtomicU64>,
    sample_rate: u32,
}

impl CpalOutput {
    pub fn new(config: OutputConfig) -> Result<Self, OutputError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(OutputError::NoDevice)?;

        Self::with_device(&device, config)
    }

    pub fn with_device(device: &Device, config: OutputConfig) -> Result<Self, OutputError> {
        let supported = device
            .supported_output_configs()
            .map_err(|e| OutputError::Stream(e.to_string()))?
            .find(|c| {
                c.channels() == config.channels
                    && c.min_sample_rate().0 <= config.sample_rate
                    && c.max_sample_rate().0 >= config.sample_rate
                    && c.sample_format() == SampleFormat::F32
            })
            .ok_or(OutputError::NoConfig)?;

        let stream_config: StreamConfig = supported
            .with_sample_rate(cpal::SampleRate(config.sample_rate))
            .into();

        let channels = config.channels.max(1) as usize;
        let ring = Arc::new(RingBuffer::new(config.buffer_size * channels));
        let is_playing = Arc::new(AtomicBool::new(false));
        let position_frames = Arc::new(AtomicU64::new(0));
        let underruns = Arc::new(AtomicU64::new(0));

        let cb_ring = ring.clone();
        let cb_playing = is_playing.clone();
        let cb_position = position_frames.clone();
        let cb_underruns = underruns.clone();

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !cb_playing.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }
                    let read = cb_ring.read(data);
                    data[read..].fill(0.0);
                    if read < data.len() {
                        cb_underruns.fetch_add(1, Ordering::Relaxed);
                    }
                    cb_position.fetch_add((read / channels) as u64, Ordering::Relaxed);
                },
                |err| {
                    log::error!("audio output error: {}", err);
                },
                None,
            )
            .map_err(|e| OutputError::Stream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| OutputError::Stream(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            ring,
            is_playing,
            position_frames,
            underruns,
            sample_rate: config.sample_rate,
        })
    }
}

impl AudioOutput for CpalOutput {
    fn write(&mut self, samples: &[f32]) -> bool {
        self.ring.try_write(samples)
    }

    fn set_playing(&mut self, playing: bool) -> Result<(), OutputError> {
        self.is_playing.store(playing, Ordering::Relaxed);
        Ok(())
    }

    fn position(&self) -> Duration {
        frames_to_duration(self.position_frames.load(Ordering::Relaxed), self.sample_rate)
    }

    fn reset_position(&mut self) {
        self.ring.clear();
        self.position_frames.store(0, Ordering::Relaxed);
    }

    fn is_drained(&self) -> bool {
        self.ring.is_empty()
    }

    fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }
}

/// 有界采样缓冲，写满时拒绝而不是覆盖
struct RingBuffer {
    buffer: Mutex<VecDeque<f32>>,
    capacity: usize,
}

impl RingBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn try_write(&self, data: &[f32]) -> bool {
        let Ok(mut buf) = self.buffer.lock() else {
            return false;
        };
        // 空缓冲总是接受，避免大包永远写不进去
        if !buf.is_empty() && buf.len() + data.len() > self.capacity {
            return false;
        }
        buf.extend(data.iter().copied());
        true
    }

    fn read(&self, output: &mut [f32]) -> usize {
        let Ok(mut buf) = self.buffer.lock() else {
            return 0;
        };
        let to_read = output.len().min(buf.len());
        for (dst, src) in output.iter_mut().zip(buf.drain(..to_read)) {
            *dst = src;
        }
        to_read
    }

    fn clear(&self) {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }
    }

    fn is_empty(&self) -> bool {
        self.buffer.lock().map(|buf| buf.is_empty()).unwrap_or(true)
    }
}
