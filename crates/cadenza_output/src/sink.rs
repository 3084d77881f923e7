//! 本地文件输出端
//!
//! 解码与输出都在独立的工作线程里完成；[`LocalSink`] 只负责把命令送过去，
//! 并通过共享的原子量读取进度。

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cadenza_player::{MediaSink, SinkError, SinkEvent, SinkEventKind, SourceId};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

use crate::{open_output, AudioDecoder, AudioOutput, OutputConfig};

/// 未知时长
const UNKNOWN: u64 = u64::MAX;

enum SinkCommand {
    Load(SourceId, String),
    Clear,
    Play,
    Pause,
    Seek(Duration),
    Shutdown,
}

/// 工作线程与句柄共享的进度
#[derive(Default)]
struct Clock {
    position_ms: AtomicU64,
    duration_ms: AtomicU64,
}

impl Clock {
    fn set_position(&self, position: Duration) {
        self.position_ms
            .store(position.as_millis() as u64, Ordering::Relaxed);
    }

    fn set_duration(&self, duration: Option<Duration>) {
        let ms = duration.map_or(UNKNOWN, |d| d.as_millis() as u64);
        self.duration_ms.store(ms, Ordering::Relaxed);
    }

    fn position(&self) -> Duration {
        Duration::from_millis(self.position_ms.load(Ordering::Relaxed))
    }

    fn duration(&self) -> Option<Duration> {
        match self.duration_ms.load(Ordering::Relaxed) {
            UNKNOWN => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

/// 播放本地音频文件的输出端
pub struct LocalSink {
    cmd_tx: Sender<SinkCommand>,
    clock: Arc<Clock>,
}

impl LocalSink {
    /// 启动工作线程；所有事件发往 `events`
    pub fn new(events: Sender<SinkEvent>) -> Self {
        let (cmd_tx, cmd_rx) = unbounded();
        let clock = Arc::new(Clock::default());
        clock.set_duration(None);

        let worker_clock = clock.clone();
        thread::spawn(move || {
            Worker::new(events, worker_clock).run(cmd_rx);
        });

        Self { cmd_tx, clock }
    }

    fn send(&self, cmd: SinkCommand) -> bool {
        self.cmd_tx.send(cmd).is_ok()
    }
}

impl Drop for LocalSink {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(SinkCommand::Shutdown);
    }
}

impl MediaSink for LocalSink {
    fn set_source(&mut self, source: SourceId, locator: &str) {
        self.clock.set_position(Duration::ZERO);
        self.clock.set_duration(None);
        self.send(SinkCommand::Load(source, locator.to_string()));
    }

    fn clear_source(&mut self) {
        self.clock.set_position(Duration::ZERO);
        self.clock.set_duration(None);
        self.send(SinkCommand::Clear);
    }

    fn play(&mut self) -> Result<(), SinkError> {
        if self.send(SinkCommand::Play) {
            Ok(())
        } else {
            Err(SinkError::Output("sink worker stopped".into()))
        }
    }

    fn pause(&mut self) {
        self.send(SinkCommand::Pause);
    }

    fn current_time(&self) -> Duration {
        self.clock.position()
    }

    fn set_current_time(&mut self, position: Duration) {
        self.clock.set_position(position);
        self.send(SinkCommand::Seek(position));
    }

    fn duration(&self) -> Option<Duration> {
        self.clock.duration()
    }
}

struct Loaded {
    decoder: AudioDecoder,
    output: Box<dyn AudioOutput>,
    pending: Option<Vec<f32>>,
    seek_base: Duration,
    eof: bool,
    waiting: bool,
    seen_underruns: u64,
}

struct Worker {
    events: Sender<SinkEvent>,
    clock: Arc<Clock>,
    source: SourceId,
    loaded: Option<Loaded>,
    playing: bool,
}

impl Worker {
    fn new(events: Sender<SinkEvent>, clock: Arc<Clock>) -> Self {
        Self {
            events,
            clock,
            source: SourceId::default(),
            loaded: None,
            playing: false,
        }
    }

    fn run(mut self, cmd_rx: Receiver<SinkCommand>) {
        loop {
            // 空闲时阻塞等待命令，播放时轮询
            let cmd = if self.is_active() {
                match cmd_rx.try_recv() {
                    Ok(cmd) => Some(cmd),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => break,
                }
            } else {
                match cmd_rx.recv() {
                    Ok(cmd) => Some(cmd),
                    Err(_) => break,
                }
            };

            if let Some(cmd) = cmd {
                if !self.handle_command(cmd) {
                    break;
                }
                continue;
            }

            if !self.pump() {
                thread::sleep(Duration::from_millis(5));
            }
        }
        log::debug!("local sink worker stopped");
    }

    fn is_active(&self) -> bool {
        self.playing && self.loaded.is_some()
    }

    fn emit(&self, kind: SinkEventKind) {
        let _ = self.events.send(SinkEvent::new(self.source, kind));
    }

    fn handle_command(&mut self, cmd: SinkCommand) -> bool {
        match cmd {
            SinkCommand::Load(source, locator) => self.load(source, &locator),
            SinkCommand::Clear => {
                self.stop_output();
                self.loaded = None;
                self.playing = false;
            }
            SinkCommand::Play => self.play(),
            SinkCommand::Pause => {
                self.playing = false;
                self.stop_output();
            }
            SinkCommand::Seek(position) => self.seek(position),
            SinkCommand::Shutdown => return false,
        }
        true
    }

    fn stop_output(&mut self) {
        if let Some(loaded) = &mut self.loaded {
            let _ = loaded.output.set_playing(false);
        }
    }

    fn load(&mut self, source: SourceId, locator: &str) {
        self.stop_output();
        self.loaded = None;
        self.source = source;

        match self.open(locator) {
            Ok(loaded) => {
                self.clock.set_duration(loaded.decoder.info.duration);
                log::debug!(
                    "opened {} ({}, {} Hz, {} ch)",
                    locator,
                    loaded.decoder.info.codec,
                    loaded.decoder.info.sample_rate,
                    loaded.decoder.info.channels
                );
                self.loaded = Some(loaded);
                self.emit(SinkEventKind::Ready);
                if self.playing {
                    self.play();
                }
            }
            Err(err) => {
                log::warn!("cannot open {}: {}", locator, err);
                self.emit(SinkEventKind::Error(err.to_string()));
            }
        }
    }

    fn open(&self, locator: &str) -> Result<Loaded, SinkError> {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            return Err(SinkError::Unsupported(locator.to_string()));
        }

        let decoder =
            AudioDecoder::open(Path::new(locator)).map_err(|e| SinkError::Open(e.to_string()))?;

        let output = open_output(OutputConfig {
            sample_rate: decoder.info.sample_rate,
            channels: decoder.info.channels as u16,
            ..Default::default()
        })
        .map_err(|e| SinkError::Output(e.to_string()))?;

        Ok(Loaded {
            decoder,
            output,
            pending: None,
            seek_base: Duration::ZERO,
            eof: false,
            waiting: false,
            seen_underruns: 0,
        })
    }

    fn play(&mut self) {
        self.playing = true;
        let Some(loaded) = &mut self.loaded else {
            // 音源就绪后再开始
            return;
        };
        match loaded.output.set_playing(true) {
            Ok(()) => self.emit(SinkEventKind::Playing),
            Err(err) => {
                self.playing = false;
                self.emit(SinkEventKind::PlayRejected(SinkError::Output(err.to_string())));
            }
        }
    }

    fn seek(&mut self, position: Duration) {
        let Some(loaded) = &mut self.loaded else {
            return;
        };
        if let Err(err) = loaded.decoder.seek(position) {
            log::warn!("seek to {:?} failed: {}", position, err);
            return;
        }
        loaded.output.reset_position();
        loaded.pending = None;
        loaded.seek_base = position;
        loaded.eof = false;
        self.clock.set_position(position);
    }

    /// 解码一包并写入输出，返回是否有进展
    fn pump(&mut self) -> bool {
        let Some(loaded) = &mut self.loaded else {
            return false;
        };

        let position = loaded.seek_base + loaded.output.position();
        self.clock.set_position(position);

        let underruns = loaded.output.underruns();
        if underruns != loaded.seen_underruns && !loaded.eof {
            loaded.seen_underruns = underruns;
            if !loaded.waiting {
                loaded.waiting = true;
                let _ = self.events.send(SinkEvent::new(self.source, SinkEventKind::Waiting));
            }
        }

        if loaded.eof {
            if loaded.output.is_drained() {
                let _ = loaded.output.set_playing(false);
                self.clock
                    .set_position(loaded.seek_base + loaded.output.position());
                self.playing = false;
                let _ = self.events.send(SinkEvent::new(self.source, SinkEventKind::Ended));
            }
            return false;
        }

        let samples = match loaded.pending.take() {
            Some(samples) => samples,
            None => match loaded.decoder.decode_next() {
                Ok(Some(samples)) => samples,
                Ok(None) => {
                    loaded.eof = true;
                    return true;
                }
                Err(err) => {
                    let _ = loaded.output.set_playing(false);
                    self.playing = false;
                    self.emit(SinkEventKind::Error(err.to_string()));
                    return false;
                }
            },
        };

        if !loaded.output.write(&samples) {
            loaded.pending = Some(samples);
            return false;
        }

        if loaded.waiting && loaded.output.underruns() == loaded.seen_underruns {
            loaded.waiting = false;
            let _ = self.events.send(SinkEvent::new(self.source, SinkEventKind::Playing));
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::temp_wav;

    fn next_kind(rx: &Receiver<SinkEvent>) -> (SourceId, SinkEventKind) {
        let event = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("no event from sink");
        (event.source, event.kind)
    }

    #[test]
    fn test_local_file_plays_to_end() {
        let path = temp_wav(8000, 1600);
        let (tx, rx) = unbounded();
        let mut sink = LocalSink::new(tx);

        sink.set_source(SourceId(1), path.to_str().unwrap());
        sink.play().unwrap();

        assert_eq!(next_kind(&rx), (SourceId(1), SinkEventKind::Ready));
        assert_eq!(next_kind(&rx), (SourceId(1), SinkEventKind::Playing));
        assert_eq!(next_kind(&rx), (SourceId(1), SinkEventKind::Ended));
        assert_eq!(sink.duration(), Some(Duration::from_millis(200)));
        assert_eq!(sink.current_time(), Duration::from_millis(200));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_remote_locator_is_an_error() {
        let (tx, rx) = unbounded();
        let mut sink = LocalSink::new(tx);

        sink.set_source(SourceId(4), "https://cdn.example.com/a.mp3");
        let (source, kind) = next_kind(&rx);
        assert_eq!(source, SourceId(4));
        assert!(matches!(kind, SinkEventKind::Error(_)));
        assert_eq!(sink.duration(), None);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let (tx, rx) = unbounded();
        let mut sink = LocalSink::new(tx);

        sink.set_source(SourceId(2), "/nonexistent/cadenza.mp3");
        assert!(matches!(next_kind(&rx), (SourceId(2), SinkEventKind::Error(_))));
    }

    #[test]
    fn test_seek_back_after_end_replays() {
        let path = temp_wav(8000, 800);
        let (tx, rx) = unbounded();
        let mut sink = LocalSink::new(tx);

        sink.set_source(SourceId(1), path.to_str().unwrap());
        sink.play().unwrap();
        assert_eq!(next_kind(&rx).1, SinkEventKind::Ready);
        assert_eq!(next_kind(&rx).1, SinkEventKind::Playing);
        assert_eq!(next_kind(&rx).1, SinkEventKind::Ended);

        sink.set_current_time(Duration::ZERO);
        sink.play().unwrap();
        assert_eq!(next_kind(&rx).1, SinkEventKind::Playing);
        assert_eq!(next_kind(&rx).1, SinkEventKind::Ended);

        let _ = std::fs::remove_file(path);
    }
}
