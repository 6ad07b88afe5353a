// Monitor lifecycle states and the commands that move between them

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    #[default]
    Idle,
    Running,
    Paused,
    /// Terminal: a stopped monitor never runs again.
    Stopped,
}

impl MonitorState {
    /// Running or Paused: the sampling loop exists and the series may still grow.
    pub fn is_active(self) -> bool {
        matches!(self, MonitorState::Running | MonitorState::Paused)
    }

    /// Next state for `command`, or `None` when the command is not valid here.
    pub fn transition(self, command: Command) -> Option<MonitorState> {
        use MonitorState::*;
        match (self, command) {
            (Idle, Command::Start) => Some(Running),
            (Running, Command::TogglePause) => Some(Paused),
            (Paused, Command::TogglePause) => Some(Running),
            (Running | Paused, Command::Stop) => Some(Stopped),
            _ => None,
        }
    }
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MonitorState::Idle => "idle",
            MonitorState::Running => "running",
            MonitorState::Paused => "paused",
            MonitorState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    TogglePause,
    Stop,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Command::Start => "start",
            Command::TogglePause => "pause",
            Command::Stop => "stop",
        };
        f.write_str(s)
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" | "start" => Ok(Command::Start),
            "p" | "pause" | "resume" => Ok(Command::TogglePause),
            "q" | "stop" | "quit" => Ok(Command::Stop),
            other => Err(format!("unknown command {:?} (expected start, pause or stop)", other)),
        }
    }
}
