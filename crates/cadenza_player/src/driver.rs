//! 引擎线程
//!
//! 引擎独占一个线程，UI 命令与输出端事件都作为消息逐条处理，
//! 一条消息的状态变更全部完成后才会取下一条。

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, never, select, tick, Receiver, Sender};

use crate::{
    EngineCommand, EngineEvent, EngineSnapshot, MediaSink, PlaybackEngine, SinkEvent, Track,
};

/// 进度上报间隔
const POSITION_INTERVAL: Duration = Duration::from_millis(250);

/// 引擎线程句柄
pub struct EngineHandle {
    pub cmd_tx: Sender<EngineCommand>,
    pub evt_rx: Receiver<EngineEvent>,
    thread: Option<JoinHandle<()>>,
}

impl EngineHandle {
    /// 发送命令；引擎已退出时返回 `false`
    pub fn send(&self, cmd: EngineCommand) -> bool {
        self.cmd_tx.send(cmd).is_ok()
    }

    /// 关闭引擎并等待线程退出
    pub fn shutdown(mut self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// 启动引擎线程
///
/// `sink_rx` 是输出端事件通道的接收端，输出端在构造时拿到对应的发送端。
pub fn spawn_engine<S>(engine: PlaybackEngine<S>, sink_rx: Receiver<SinkEvent>) -> EngineHandle
where
    S: MediaSink + Send + 'static,
{
    let (cmd_tx, cmd_rx) = bounded(32);
    let (evt_tx, evt_rx) = bounded(64);

    let thread = thread::spawn(move || {
        run_engine(engine, cmd_rx, sink_rx, evt_tx);
    });

    EngineHandle {
        cmd_tx,
        evt_rx,
        thread: Some(thread),
    }
}

fn run_engine<S: MediaSink>(
    mut engine: PlaybackEngine<S>,
    cmd_rx: Receiver<EngineCommand>,
    mut sink_rx: Receiver<SinkEvent>,
    evt_tx: Sender<EngineEvent>,
) {
    let ticker = tick(POSITION_INTERVAL);
    let mut last_snapshot: Option<EngineSnapshot> = None;

    publish_snapshot(&engine, &evt_tx, &mut last_snapshot);

    loop {
        select! {
            recv(cmd_rx) -> msg => match msg {
                Ok(cmd) => {
                    if !engine.apply(cmd) {
                        break;
                    }
                }
                Err(_) => break,
            },
            recv(sink_rx) -> msg => match msg {
                Ok(event) => engine.handle_sink_event(event),
                Err(_) => {
                    log::warn!("media sink event channel closed");
                    sink_rx = never();
                }
            },
            recv(ticker) -> _ => {
                if engine.is_playing() {
                    let _ = evt_tx.try_send(EngineEvent::Position {
                        position: engine.position(),
                        duration: engine.duration(),
                    });
                }
            },
        }

        publish_snapshot(&engine, &evt_tx, &mut last_snapshot);
    }

    log::debug!("engine thread stopped");
}

/// 状态有变化时发布快照；通道已满则留到下一轮重试
fn publish_snapshot<S: MediaSink>(
    engine: &PlaybackEngine<S>,
    evt_tx: &Sender<EngineEvent>,
    last: &mut Option<EngineSnapshot>,
) {
    let snapshot = engine.snapshot();
    if last.as_ref().is_some_and(|last| !snapshot_changed(last, &snapshot)) {
        return;
    }
    if evt_tx.try_send(EngineEvent::Snapshot(snapshot.clone())).is_ok() {
        *last = Some(snapshot);
    }
}

/// `Track` 只按 `src` 比较，标题变化需要单独检查
fn snapshot_changed(old: &EngineSnapshot, new: &EngineSnapshot) -> bool {
    fn title(track: &Option<Track>) -> Option<&str> {
        track.as_ref().map(|t| t.title.as_str())
    }

    old != new
        || title(&old.current_track) != title(&new.current_track)
        || old
            .queue
            .iter()
            .zip(&new.queue)
            .any(|(a, b)| a.title != b.title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EngineConfig, SinkError, SourceId};

    struct NullSink;

    impl MediaSink for NullSink {
        fn set_source(&mut self, _source: SourceId, _locator: &str) {}

        fn clear_source(&mut self) {}

        fn play(&mut self) -> Result<(), SinkError> {
            Ok(())
        }

        fn pause(&mut self) {}

        fn current_time(&self) -> Duration {
            Duration::ZERO
        }

        fn set_current_time(&mut self, _position: Duration) {}

        fn duration(&self) -> Option<Duration> {
            None
        }
    }

    fn snapshot(title: &str) -> EngineSnapshot {
        let track = Track::new(title, "/audio/sonata.mp3");
        EngineSnapshot {
            queue: vec![track.clone()],
            current_track: Some(track),
            is_playing: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_retitled_track_counts_as_change() {
        let before = snapshot("Sonata");
        assert!(!snapshot_changed(&before, &snapshot("Sonata")));
        assert!(snapshot_changed(&before, &snapshot("Sonata (live)")));

        let mut paused = snapshot("Sonata");
        paused.is_playing = false;
        assert!(snapshot_changed(&before, &paused));
    }

    #[test]
    fn test_full_channel_retries_on_next_publish() {
        let engine = PlaybackEngine::new(NullSink, Vec::new(), EngineConfig::default());
        let (evt_tx, evt_rx) = bounded(1);
        let mut last = None;

        evt_tx
            .try_send(EngineEvent::Position {
                position: Duration::ZERO,
                duration: None,
            })
            .unwrap();
        publish_snapshot(&engine, &evt_tx, &mut last);
        assert!(last.is_none());

        evt_rx.recv().unwrap();
        publish_snapshot(&engine, &evt_tx, &mut last);
        assert_eq!(last, Some(engine.snapshot()));
        assert!(matches!(evt_rx.try_recv(), Ok(EngineEvent::Snapshot(_))));
    }
}
