//! cadenza - 命令行播放器
//!
//! 从作品目录加载曲库，在 stdin 上逐行读取播放命令

use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use cadenza_library::Catalog;
use cadenza_output::LocalSink;
use cadenza_player::{
    spawn_engine, EngineCommand, EngineConfig, EngineEvent, EngineSnapshot, LogMediaSession,
    PlaybackEngine, Track,
};
use clap::Parser;
use crossbeam_channel::{select, unbounded};
use log::LevelFilter;

mod input;
mod logger;

use input::{parse_line, Input};

#[derive(Parser, Debug)]
#[command(name = "cadenza")]
#[command(about = "Play a portfolio's recorded works from the terminal")]
#[command(version)]
struct Args {
    /// 作品目录 JSON
    #[arg(long, env = "CADENZA_CATALOG")]
    catalog: PathBuf,

    /// 引擎配置 TOML
    #[arg(long, env = "CADENZA_CONFIG")]
    config: Option<PathBuf>,

    /// CDN 前缀，覆盖配置文件
    #[arg(long)]
    cdn_base: Option<String>,

    /// 启动时打开随机播放
    #[arg(long)]
    shuffle: bool,

    /// 随机种子
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.log_level.parse::<LevelFilter>() {
        Ok(level) => level,
        Err(_) => {
            eprintln!("invalid log level: {}", args.log_level);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = logger::setup_logger(level) {
        eprintln!("failed to set up logging: {}", e);
        return ExitCode::FAILURE;
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let library = match Catalog::open(&args.catalog) {
        Ok(catalog) => catalog.library_tracks(),
        Err(e) => {
            log::error!("cannot load catalog {}: {}", args.catalog.display(), e);
            return ExitCode::FAILURE;
        }
    };
    log::info!("{} tracks in library", library.len());

    let (sink_tx, sink_rx) = unbounded();
    let sink = LocalSink::new(sink_tx);

    let mut engine = PlaybackEngine::new(sink, library.clone(), config)
        .with_session(Box::new(LogMediaSession));
    if let Some(seed) = args.seed {
        engine = engine.with_seed(seed);
    }

    let handle = spawn_engine(engine, sink_rx);
    if args.shuffle {
        handle.send(EngineCommand::ToggleShuffle);
    }

    let lines = spawn_stdin_reader();
    let mut view = View::default();

    loop {
        select! {
            recv(lines) -> line => {
                let Ok(line) = line else {
                    break;
                };
                match parse_line(&line, &library) {
                    Ok(Input::Engine(cmd)) => {
                        if !handle.send(cmd) {
                            break;
                        }
                    }
                    Ok(Input::List) => print_library(&library),
                    Ok(Input::Status) => view.print_status(),
                    Ok(Input::Quit) => break,
                    Ok(Input::Empty) => {}
                    Err(e) => println!("{}", e),
                }
            },
            recv(handle.evt_rx) -> event => match event {
                Ok(event) => view.update(event),
                Err(_) => break,
            },
        }
    }

    handle.shutdown();
    ExitCode::SUCCESS
}

fn load_config(args: &Args) -> Result<EngineConfig, String> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .map_err(|e| format!("cannot load config {}: {}", path.display(), e))?,
        None => EngineConfig::default(),
    };
    if let Some(base) = &args.cdn_base {
        config.cdn_base = Some(base.clone());
    }
    Ok(config)
}

/// stdin 逐行转发；读到结尾时关闭通道
fn spawn_stdin_reader() -> crossbeam_channel::Receiver<String> {
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn print_library(library: &[Track]) {
    for (i, track) in library.iter().enumerate() {
        println!("{:>3}. {}", i + 1, track.title);
    }
}

/// 终端上的播放状态
#[derive(Default)]
struct View {
    snapshot: EngineSnapshot,
    position: Duration,
    duration: Option<Duration>,
}

impl View {
    fn update(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Snapshot(snapshot) => {
                if snapshot.current_track != self.snapshot.current_track
                    || snapshot.state != self.snapshot.state
                {
                    match &snapshot.current_track {
                        Some(track) => println!("[{:?}] {}", snapshot.state, track.title),
                        None => println!("[{:?}]", snapshot.state),
                    }
                }
                if snapshot.current_track != self.snapshot.current_track {
                    self.position = Duration::ZERO;
                    self.duration = None;
                }
                self.snapshot = snapshot;
            }
            EngineEvent::Position { position, duration } => {
                self.position = position;
                self.duration = duration;
            }
        }
    }

    fn print_status(&self) {
        let s = &self.snapshot;
        match &s.current_track {
            Some(track) => println!(
                "{:?}: {} ({} / {})",
                s.state,
                track.title,
                clock(self.position),
                self.duration.map_or_else(|| "--:--".to_string(), clock)
            ),
            None => println!("{:?}", s.state),
        }
        println!(
            "shuffle: {}  repeat: {}  history: {}  pool: {}",
            on_off(s.is_shuffle),
            on_off(s.is_repeat),
            s.history_len,
            s.pool_len
        );
        for (i, track) in s.queue.iter().enumerate() {
            let marker = if i == s.current_index && s.current_track.is_some() {
                '>'
            } else {
                ' '
            };
            println!("{} {:>3}. {}", marker, i + 1, track.title);
        }
    }
}

fn clock(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}
