//! Keyboard-driven race starter for the authority host.

use chrono::{DateTime, Utc};
use std::time::Duration;
use swimcam_core::ControlMessage;

/// What a console line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Publish(ControlMessage),
    Quit,
    Unknown(String),
}

/// Numbers the races started from this console.
#[derive(Debug, Default)]
pub struct StarterConsole {
    current_race: u32,
}

impl StarterConsole {
    /// Interpret one input line. `now` is the clock-domain time at which
    /// the key was pressed.
    pub fn command(&mut self, line: &str, now: Duration) -> Command {
        match line.trim() {
            "" => Command::Quit,
            "s" => {
                self.current_race += 1;
                Command::Publish(ControlMessage::start(
                    now,
                    format!("Race #{}", self.current_race),
                ))
            }
            "r" => Command::Publish(ControlMessage::Reset),
            other => Command::Unknown(other.to_string()),
        }
    }

    pub fn current_race(&self) -> u32 {
        self.current_race
    }
}

/// Human-readable UTC rendering of a clock-domain instant.
pub fn format_clock_time(time: Duration) -> String {
    let secs = i64::try_from(time.as_secs()).unwrap_or(i64::MAX);
    match DateTime::<Utc>::from_timestamp(secs, time.subsec_nanos()) {
        Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
        None => format!("{}ns", time.as_nanos()),
    }
}
