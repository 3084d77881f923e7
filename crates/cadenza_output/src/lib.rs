//! cadenza_output - 本地音频输出
//!
//! 用 symphonia 解码本地文件，实现 [`cadenza_player::MediaSink`]。

mod decoder;
mod output;
mod sink;

#[cfg(feature = "cpal")]
mod cpal_output;

#[cfg(test)]
mod testutil;

#[cfg(feature = "cpal")]
pub use cpal_output::*;
pub use decoder::*;
pub use output::*;
pub use sink::*;
