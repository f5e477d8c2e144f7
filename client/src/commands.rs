use std::str::FromStr;

use joystick::{DirectionParseError, DirectionalState};

/// One line typed on stdin. Each stands in for a control on the operator page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Drag { dx: f32, dy: f32 },
    Release,
    Press(DirectionalState),
    Unpress,
    Start,
    Stop,
    Toggle,
    Subscribe,
    Receive,
    Connect,
    Disconnect,
    Status,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{command}` expects {expected}")]
    Arguments { command: &'static str, expected: &'static str },
    #[error("`{0}` is not a number")]
    Number(String),
    #[error(transparent)]
    Direction(#[from] DirectionParseError),
}

fn number(token: &str) -> Result<f32, CommandError> {
    token
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CommandError::Number(token.to_string()))
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let head = parts.next().ok_or(CommandError::Empty)?.to_ascii_lowercase();
        let args: Vec<&str> = parts.collect();

        let no_args = |cmd: Command, name: &'static str| {
            if args.is_empty() {
                Ok(cmd)
            } else {
                Err(CommandError::Arguments { command: name, expected: "no arguments" })
            }
        };

        match head.as_str() {
            "drag" => match args.as_slice() {
                [dx, dy] => Ok(Command::Drag { dx: number(dx)?, dy: number(dy)? }),
                _ => Err(CommandError::Arguments { command: "drag", expected: "<dx> <dy>" }),
            },
            "press" => match args.as_slice() {
                [dir] => Ok(Command::Press(dir.parse()?)),
                _ => Err(CommandError::Arguments { command: "press", expected: "<up|down|left|right>" }),
            },
            "release" => no_args(Command::Release, "release"),
            "unpress" => no_args(Command::Unpress, "unpress"),
            "start" => no_args(Command::Start, "start"),
            "stop" => no_args(Command::Stop, "stop"),
            "toggle" => no_args(Command::Toggle, "toggle"),
            "subscribe" => no_args(Command::Subscribe, "subscribe"),
            "receive" => no_args(Command::Receive, "receive"),
            "connect" => no_args(Command::Connect, "connect"),
            "disconnect" => no_args(Command::Disconnect, "disconnect"),
            "status" => no_args(Command::Status, "status"),
            "quit" | "exit" => no_args(Command::Quit, "quit"),
            _ => Err(CommandError::Unknown(head)),
        }
    }
}
