use std::time::Duration;
use swimcam_core::{FrameContext, RaceState, SharedRace, new_race_state};

/// Clock-domain instant of a time of day, `days` after the epoch.
#[allow(dead_code)]
pub fn time_of_day(days: u64, h: u64, m: u64, s: u64, ms: u64) -> Duration {
    Duration::from_millis((((days * 24 + h) * 60 + m) * 60 + s) * 1000 + ms)
}

#[allow(dead_code)]
pub fn start_payload(origin: Duration, label: &str) -> Vec<u8> {
    format!("START|{}|{}", origin.as_nanos(), label).into_bytes()
}

#[allow(dead_code)]
pub fn race_state(test_mode: bool) -> RaceState {
    new_race_state(1, 2, test_mode).unwrap()
}

#[allow(dead_code)]
pub fn shared_race(test_mode: bool) -> SharedRace {
    SharedRace::new(race_state(test_mode))
}

/// Frames of a 30 fps pipeline whose epoch is `base`.
#[allow(dead_code)]
pub struct FramePacer {
    base: Duration,
    frame: u64,
}

#[allow(dead_code)]
impl FramePacer {
    pub fn new(base: Duration) -> Self {
        Self { base, frame: 0 }
    }

    pub fn next_frame(&mut self) -> FrameContext {
        let timestamp = Duration::from_nanos(self.frame * 1_000_000_000 / 30);
        let frame = FrameContext::new(timestamp, self.base);
        self.frame += 1;
        frame
    }
}

/// Split a rendered overlay into its lines.
#[allow(dead_code)]
pub fn lines(text: &str) -> Vec<&str> {
    text.split('\n').collect()
}
