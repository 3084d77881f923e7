use std::time::SystemTime;

use log::LevelFilter;

/// 日志写到 stderr，stdout 留给播放状态
pub fn setup_logger(level: LevelFilter) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_seconds(SystemTime::now()),
                record.level(),
                record.target(),
                message
            ));
        })
        .level_for("symphonia_core", LevelFilter::Warn)
        .level_for("symphonia_bundle_mp3::demuxer", LevelFilter::Error)
        .level(level)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}
