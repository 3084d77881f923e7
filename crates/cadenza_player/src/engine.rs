//! 播放引擎
//!
//! 队列、游标、随机池、播放历史以及播放/加载状态都由 [`PlaybackEngine`] 持有。
//! 每个命令先完成全部状态变更，最后统一调用一次 `sync` 把结果同步到输出端，
//! 因此一个命令至多触发一次「加载/播放」指令。

use std::time::{Duration, Instant};

use cadenza_library::Track;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::{
    EngineCommand, EngineConfig, EngineSnapshot, MediaAction, MediaSession, MediaSink,
    NoMediaSession, PlaybackState, SessionState, ShufflePool, SinkError, SinkEvent, SinkEventKind,
    SourceId, SourceResolver, TrackMetadata,
};

/// 队列条目标识
///
/// 同一首曲目可以在队列中出现多次，条目标识区分它们。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(u64);

/// 队列条目
#[derive(Debug, Clone)]
pub struct QueueEntry {
    id: EntryId,
    pub track: Track,
}

impl QueueEntry {
    pub fn id(&self) -> EntryId {
        self.id
    }
}

/// 播放引擎
pub struct PlaybackEngine<S: MediaSink> {
    sink: S,
    session: Box<dyn MediaSession>,
    config: EngineConfig,
    resolver: SourceResolver,
    library: Vec<Track>,
    rng: StdRng,

    queue: Vec<QueueEntry>,
    current_index: usize,
    history: Vec<Track>,
    pool: ShufflePool,

    is_playing: bool,
    is_loading: bool,
    is_shuffle: bool,
    is_repeat: bool,

    next_entry_id: u64,
    source_id: SourceId,
    /// 最近一次交给输出端的条目
    last_loaded: Option<EntryId>,
    last_prev_press: Option<Instant>,

    published_entry: Option<EntryId>,
    published_state: Option<SessionState>,
}

impl<S: MediaSink> PlaybackEngine<S> {
    pub fn new(sink: S, library: Vec<Track>, config: EngineConfig) -> Self {
        let resolver = SourceResolver::new(config.cdn_base.clone());
        Self {
            sink,
            session: Box::new(NoMediaSession),
            config,
            resolver,
            library,
            rng: StdRng::from_entropy(),
            queue: Vec::new(),
            current_index: 0,
            history: Vec::new(),
            pool: ShufflePool::default(),
            is_playing: false,
            is_loading: false,
            is_shuffle: false,
            is_repeat: false,
            next_entry_id: 0,
            source_id: SourceId::default(),
            last_loaded: None,
            last_prev_press: None,
            published_entry: None,
            published_state: None,
        }
    }

    /// 使用固定种子洗牌
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_session(mut self, session: Box<dyn MediaSession>) -> Self {
        self.session = session;
        self
    }

    // =====================
    //    只读状态
    // =====================

    pub fn queue(&self) -> &[QueueEntry] {
        &self.queue
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.queue.get(self.current_index).map(|entry| &entry.track)
    }

    pub fn history(&self) -> &[Track] {
        &self.history
    }

    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    pub fn library(&self) -> &[Track] {
        &self.library
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_shuffle(&self) -> bool {
        self.is_shuffle
    }

    pub fn is_repeat(&self) -> bool {
        self.is_repeat
    }

    pub fn source_id(&self) -> SourceId {
        self.source_id
    }

    pub fn resolver(&self) -> &SourceResolver {
        &self.resolver
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn state(&self) -> PlaybackState {
        if self.queue.is_empty() {
            PlaybackState::Stopped
        } else if self.is_loading {
            PlaybackState::Loading
        } else if self.is_playing {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        }
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            queue: self.queue.iter().map(|entry| entry.track.clone()).collect(),
            current_index: self.current_index,
            current_track: self.current_track().cloned(),
            is_playing: self.is_playing,
            is_loading: self.is_loading,
            is_shuffle: self.is_shuffle,
            is_repeat: self.is_repeat,
            state: self.state(),
            history_len: self.history.len(),
            pool_len: self.pool.len(),
        }
    }

    pub fn position(&self) -> Duration {
        self.sink.current_time()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.sink.duration()
    }

    /// 处理一条命令，返回 `false` 表示应当关闭引擎
    pub fn apply(&mut self, cmd: EngineCommand) -> bool {
        match cmd {
            EngineCommand::Enqueue(track) => self.enqueue(track),
            EngineCommand::EnqueueMany(tracks) => self.enqueue_many(tracks),
            EngineCommand::PlayNow(track) => self.play_now(track),
            EngineCommand::ForcePlay(track) => self.force_play(track),
            EngineCommand::PlayFromQueue(index) => self.play_from_queue(index),
            EngineCommand::RemoveFromQueue(index) => self.remove_from_queue(index),
            EngineCommand::MoveInQueue { from, to } => self.move_in_queue(from, to),
            EngineCommand::ClearQueue => self.clear_queue(),
            EngineCommand::TogglePlay => self.toggle_play(),
            EngineCommand::Next => self.next(),
            EngineCommand::Prev => self.prev(),
            EngineCommand::ToggleShuffle => self.toggle_shuffle(),
            EngineCommand::ToggleRepeat => self.toggle_repeat(),
            EngineCommand::Seek(position) => self.seek(position),
            EngineCommand::Media(action) => self.handle_media_action(action),
            EngineCommand::Shutdown => return false,
        }
        true
    }

    // =====================
    //    队列操作
    // =====================

    pub fn enqueue(&mut self, track: Track) {
        let was_empty = self.queue.is_empty();
        let entry = self.new_entry(track);
        self.queue.push(entry);
        if was_empty {
            self.current_index = 0;
            self.is_playing = true;
        }
        self.sync();
    }

    /// 追加多首；是否自动开始只看调用前队列是否为空
    pub fn enqueue_many(&mut self, tracks: impl IntoIterator<Item = Track>) {
        let was_empty = self.queue.is_empty();
        let before = self.queue.len();
        for track in tracks {
            let entry = self.new_entry(track);
            self.queue.push(entry);
        }
        if self.queue.len() == before {
            return;
        }
        if was_empty {
            self.current_index = 0;
            self.is_playing = true;
        }
        self.sync();
    }

    /// 明确点播：关闭随机，清空历史与随机池
    pub fn play_now(&mut self, track: Track) {
        self.is_shuffle = false;
        self.pool.clear();
        self.history.clear();
        self.replace_queue(track);
        self.sync();
    }

    /// 点播但保留随机状态
    pub fn force_play(&mut self, track: Track) {
        self.replace_queue(track);
        self.sync();
    }

    pub fn play_from_queue(&mut self, index: usize) {
        if self.is_shuffle {
            log::debug!("play_from_queue({}) ignored in shuffle mode", index);
            return;
        }
        if index >= self.queue.len() {
            return;
        }
        self.current_index = index;
        self.is_playing = true;
        self.sync();
    }

    pub fn remove_from_queue(&mut self, index: usize) {
        if index >= self.queue.len() {
            return;
        }
        self.queue.remove(index);

        if self.queue.is_empty() {
            self.current_index = 0;
            self.is_playing = false;
        } else if index < self.current_index {
            self.current_index -= 1;
        } else if index == self.current_index && self.current_index >= self.queue.len() {
            self.current_index = 0;
        }
        self.sync();
    }

    pub fn move_in_queue(&mut self, from: usize, to: usize) {
        let len = self.queue.len();
        if from == to || from >= len || to >= len {
            return;
        }
        let entry = self.queue.remove(from);
        self.queue.insert(to, entry);

        let idx = self.current_index;
        self.current_index = if idx == from {
            to
        } else if idx > from && idx <= to {
            idx - 1
        } else if idx < from && idx >= to {
            idx + 1
        } else {
            idx
        };
        self.sync();
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
        self.current_index = 0;
        self.is_playing = false;
        self.sync();
    }

    // =====================
    //    播放控制
    // =====================

    pub fn toggle_play(&mut self) {
        if self.queue.is_empty() {
            if self.is_shuffle && self.prime_queue(None) {
                self.sync();
            }
            return;
        }
        self.is_playing = !self.is_playing;
        self.sync();
    }

    pub fn play(&mut self) {
        if self.queue.is_empty() {
            if self.is_shuffle && self.prime_queue(None) {
                self.sync();
            }
            return;
        }
        self.is_playing = true;
        self.sync();
    }

    pub fn pause(&mut self) {
        self.is_playing = false;
        self.sync();
    }

    pub fn next(&mut self) {
        let has_more = self.current_index + 1 < self.queue.len();

        if has_more {
            if self.is_shuffle {
                // 随机模式下队列只保留「接下来」的条目
                let played = self.queue[self.current_index].track.clone();
                self.history.push(played);
                self.queue.drain(..=self.current_index);
                self.current_index = 0;
            } else {
                self.current_index += 1;
            }
            self.is_playing = true;
            self.sync();
            return;
        }

        if self.is_shuffle {
            let current = self.current_track().cloned();
            let exclude = current.as_ref().map(|track| track.src.as_str());
            let Some(track) = self.pool.pull(&self.library, exclude, &mut self.rng) else {
                log::debug!("shuffle library is empty, nothing to play next");
                return;
            };
            if let Some(current) = current {
                self.history.push(current);
            }
            self.replace_queue(track);
            self.sync();
            return;
        }

        // 队列播完：回到开头并暂停
        if !self.queue.is_empty() {
            self.sink.set_current_time(Duration::ZERO);
        }
        self.is_playing = false;
        self.sync();
    }

    pub fn prev(&mut self) {
        self.prev_at(Instant::now());
    }

    /// 「上一首」：单击回到开头，窗口期内再次按下才真正后退
    pub fn prev_at(&mut self, now: Instant) {
        let window = self.config.double_press_window();
        let is_double_press = self
            .last_prev_press
            .is_some_and(|last| now.saturating_duration_since(last) < window);
        self.last_prev_press = Some(now);

        if self.sink.current_time() > self.config.restart_threshold() && !is_double_press {
            self.restart();
            return;
        }

        if self.is_shuffle {
            if self.current_index > 0 {
                self.current_index -= 1;
                self.is_playing = true;
                self.sync();
                return;
            }

            if let Some(previous) = self.history.pop() {
                let remaining = if self.queue.is_empty() {
                    Vec::new()
                } else {
                    self.queue.split_off(self.current_index + 1)
                };
                let entry = self.new_entry(previous);
                self.queue = std::iter::once(entry).chain(remaining).collect();
                self.current_index = 0;
                self.is_playing = true;
                self.sync();
                return;
            }

            self.restart();
            return;
        }

        if is_double_press && self.current_index > 0 {
            self.current_index -= 1;
            self.sync();
        } else {
            self.restart();
        }
    }

    pub fn toggle_shuffle(&mut self) {
        self.is_shuffle = !self.is_shuffle;

        if self.is_shuffle {
            let exclude = self.current_track().map(|track| track.src.clone());
            self.pool = ShufflePool::build(&self.library, exclude.as_deref(), &mut self.rng);
            self.prime_queue(exclude.as_deref());
        } else {
            self.pool.clear();
        }
        self.sync();
    }

    pub fn toggle_repeat(&mut self) {
        self.is_repeat = !self.is_repeat;
    }

    /// 跳转；已知总时长时截断到结尾
    pub fn seek(&mut self, position: Duration) {
        if self.queue.is_empty() {
            return;
        }
        let position = match self.sink.duration() {
            Some(duration) => position.min(duration),
            None => position,
        };
        self.sink.set_current_time(position);
    }

    /// 相对跳转
    pub fn seek_by(&mut self, offset: Duration, forward: bool) {
        let current = self.sink.current_time();
        let target = if forward {
            current.saturating_add(offset)
        } else {
            current.saturating_sub(offset)
        };
        self.seek(target);
    }

    pub fn handle_media_action(&mut self, action: MediaAction) {
        match action {
            MediaAction::Play => self.play(),
            MediaAction::Pause => self.pause(),
            MediaAction::Next => self.next(),
            MediaAction::Previous => self.prev(),
            MediaAction::SeekForward(offset) => {
                self.seek_by(offset.unwrap_or(self.config.seek_offset()), true)
            }
            MediaAction::SeekBackward(offset) => {
                self.seek_by(offset.unwrap_or(self.config.seek_offset()), false)
            }
        }
    }

    // =====================
    //    输出端事件
    // =====================

    pub fn handle_sink_event(&mut self, event: SinkEvent) {
        if event.source != self.source_id {
            log::trace!("dropping stale {:?} from {:?}", event.kind, event.source);
            return;
        }

        match event.kind {
            SinkEventKind::Ready | SinkEventKind::Playing => {
                self.is_loading = false;
            }
            SinkEventKind::Waiting => {
                self.is_loading = true;
            }
            SinkEventKind::Ended => {
                if self.is_repeat {
                    self.sink.set_current_time(Duration::ZERO);
                    if let Err(err) = self.sink.play() {
                        self.on_play_rejected(err);
                    }
                } else {
                    self.next();
                }
            }
            SinkEventKind::Error(message) => self.on_source_error(&message),
            SinkEventKind::PlayRejected(err) => self.on_play_rejected(err),
        }
        self.publish();
    }

    fn on_source_error(&mut self, message: &str) {
        if self.resolver.cdn_enabled() && !self.queue.is_empty() {
            log::warn!("CDN audio failed ({}), falling back to local sources", message);
            self.resolver.disable_cdn();
            // 强制按本地地址重新加载当前条目
            self.last_loaded = None;
            self.is_playing = true;
            self.sync();
            return;
        }

        log::warn!("playback failed: {}", message);
        self.is_playing = false;
        self.is_loading = false;
    }

    fn on_play_rejected(&mut self, err: SinkError) {
        if err == SinkError::Aborted {
            return;
        }
        log::warn!("play request rejected: {}", err);
        self.is_playing = false;
        self.is_loading = false;
    }

    // =====================
    //    内部
    // =====================

    fn new_entry(&mut self, track: Track) -> QueueEntry {
        self.next_entry_id += 1;
        QueueEntry {
            id: EntryId(self.next_entry_id),
            track,
        }
    }

    fn replace_queue(&mut self, track: Track) {
        let entry = self.new_entry(track);
        self.queue = vec![entry];
        self.current_index = 0;
        self.is_playing = true;
    }

    /// 队列为空时从随机池取一首并开始播放
    fn prime_queue(&mut self, exclude: Option<&str>) -> bool {
        if !self.queue.is_empty() {
            return false;
        }
        let Some(track) = self.pool.pull(&self.library, exclude, &mut self.rng) else {
            return false;
        };
        self.replace_queue(track);
        true
    }

    fn restart(&mut self) {
        self.sink.set_current_time(Duration::ZERO);
    }

    /// 把当前条目与播放意图同步到输出端
    ///
    /// 同一条目重复同步不会重新加载。
    fn sync(&mut self) {
        let current = self
            .queue
            .get(self.current_index)
            .map(|entry| (entry.id, entry.track.src.clone()));

        let Some((entry_id, src)) = current else {
            if self.last_loaded.take().is_some() {
                self.sink.pause();
                self.sink.clear_source();
            }
            self.is_playing = false;
            self.is_loading = false;
            self.publish();
            return;
        };

        if self.last_loaded != Some(entry_id) {
            self.is_loading = true;
            self.source_id = self.source_id.next();
            let locator = self.resolver.resolve(&src);
            log::debug!("loading {} as {:?}", locator, self.source_id);
            self.sink.set_source(self.source_id, &locator);
            self.sink.set_current_time(Duration::ZERO);
            self.last_loaded = Some(entry_id);
        }

        if self.is_playing {
            if let Err(err) = self.sink.play() {
                self.on_play_rejected(err);
            }
        } else {
            self.sink.pause();
        }
        self.publish();
    }

    /// 向媒体会话公布曲目与播放状态的变化
    fn publish(&mut self) {
        let current = self.queue.get(self.current_index);
        let current_id = current.map(|entry| entry.id);
        if current_id != self.published_entry {
            match current {
                Some(entry) => {
                    let metadata = TrackMetadata::from(&entry.track)
                        .with_credits(self.config.artist.clone(), self.config.album.clone());
                    self.session.set_metadata(&metadata);
                }
                None => self.session.clear_metadata(),
            }
            self.published_entry = current_id;
        }

        let state = if self.is_playing {
            SessionState::Playing
        } else {
            SessionState::Paused
        };
        if self.published_state != Some(state) {
            self.session.set_playback_state(state);
            self.published_state = Some(state);
        }
    }
}
