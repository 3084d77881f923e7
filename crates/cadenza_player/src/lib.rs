//! cadenza_player - 播放引擎
//!
//! 管理播放队列、随机池、播放历史以及播放/加载状态，
//! 并通过 [`MediaSink`] 驱动单路音频输出。

mod command;
mod config;
mod driver;
mod engine;
mod session;
mod shuffle;
mod sink;
mod source;

pub use cadenza_library::Track;
pub use command::*;
pub use config::*;
pub use driver::*;
pub use engine::*;
pub use session::*;
pub use shuffle::*;
pub use sink::*;
pub use source::*;
