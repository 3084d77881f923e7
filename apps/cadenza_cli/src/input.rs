//! 交互命令解析

use std::time::Duration;

use cadenza_player::{EngineCommand, Track};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum InputError {
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("no track #{0} in the library")]
    NoSuchTrack(usize),
}

/// 一行输入对应的动作
#[derive(Debug)]
pub enum Input {
    Engine(EngineCommand),
    List,
    Status,
    Quit,
    Empty,
}

/// 解析一行输入；序号从 1 开始
pub fn parse_line(line: &str, library: &[Track]) -> Result<Input, InputError> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Ok(Input::Empty);
    };
    let args: Vec<&str> = words.collect();

    let cmd = match word {
        "play" => EngineCommand::PlayNow(library_track(&args, library, "play <n>")?),
        "add" => EngineCommand::Enqueue(library_track(&args, library, "add <n>")?),
        "queue" => EngineCommand::PlayFromQueue(index(&args, 0, "queue <n>")?),
        "rm" => EngineCommand::RemoveFromQueue(index(&args, 0, "rm <n>")?),
        "mv" => EngineCommand::MoveInQueue {
            from: index(&args, 0, "mv <a> <b>")?,
            to: index(&args, 1, "mv <a> <b>")?,
        },
        "next" => EngineCommand::Next,
        "prev" => EngineCommand::Prev,
        "toggle" => EngineCommand::TogglePlay,
        "shuffle" => EngineCommand::ToggleShuffle,
        "repeat" => EngineCommand::ToggleRepeat,
        "clear" => EngineCommand::ClearQueue,
        "seek" => {
            let secs = args
                .first()
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|s| s.is_finite() && *s >= 0.0)
                .ok_or(InputError::Usage("seek <secs>"))?;
            EngineCommand::Seek(Duration::from_secs_f64(secs))
        }
        "ls" => return Ok(Input::List),
        "status" => return Ok(Input::Status),
        "quit" | "exit" => return Ok(Input::Quit),
        other => return Err(InputError::Unknown(other.to_string())),
    };
    Ok(Input::Engine(cmd))
}

/// 1 起始序号转为 0 起始
fn index(args: &[&str], at: usize, usage: &'static str) -> Result<usize, InputError> {
    args.get(at)
        .and_then(|s| s.parse::<usize>().ok())
        .and_then(|n| n.checked_sub(1))
        .ok_or(InputError::Usage(usage))
}

fn library_track(
    args: &[&str],
    library: &[Track],
    usage: &'static str,
) -> Result<Track, InputError> {
    let i = index(args, 0, usage)?;
    library
        .get(i)
        .cloned()
        .ok_or(InputError::NoSuchTrack(i + 1))
}
