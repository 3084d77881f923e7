use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

/// 生成 16-bit 单声道 PCM WAV
pub fn wav_bytes(sample_rate: u32, frames: u32) -> Vec<u8> {
    let data_len = frames * 2;
    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for i in 0..frames {
        let sample = if (i / 20) % 2 == 0 { 8000i16 } else { -8000i16 };
        out.extend_from_slice(&sample.to_le_bytes());
    }
    out
}

/// 写入临时目录，返回路径
pub fn temp_wav(sample_rate: u32, frames: u32) -> PathBuf {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!(
        "cadenza-test-{}-{}.wav",
        std::process::id(),
        n
    ));
    std::fs::write(&path, wav_bytes(sample_rate, frames)).unwrap();
    path
}
