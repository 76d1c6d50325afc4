use crate::config::{ConfigError, LaneSide};
use std::time::Duration;

/// Text shown on the race line whenever no race clock is running.
pub const WAITING_TEXT: &str = "Waiting for start...";

/// Text shown after a start command whose start time could not be parsed.
pub const INVALID_START_TEXT: &str = "Invalid Start Command Received...";

/// The highest lane number a camera may be configured to display.
pub const MAX_LANE: u8 = 12;

/// A lane number in `0..=12`. Lane 0 means the lane is not displayed on
/// this camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Lane(u8);

impl Lane {
    /// A lane that is not shown on this camera.
    pub const UNUSED: Lane = Lane(0);

    /// Validate a configured lane number.
    pub fn new(side: LaneSide, value: i32) -> Result<Self, ConfigError> {
        match u8::try_from(value) {
            Ok(number) if number <= MAX_LANE => Ok(Self(number)),
            _ => Err(ConfigError::LaneOutOfRange { side, value }),
        }
    }

    pub fn number(&self) -> u8 {
        self.0
    }

    pub fn is_displayed(&self) -> bool {
        self.0 != 0
    }
}

/// The race clock record shared between the control-message handler and
/// the overlay renderer.
///
/// Invariant: `running == true` implies `start_origin.is_some()`. The
/// origin is deliberately left in place when a start command fails to
/// parse; readers must ignore it unless `running` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceState {
    /// Whether a race clock is active.
    pub running: bool,

    /// Clock-domain instant the race began.
    pub start_origin: Option<Duration>,

    /// Race label while running, otherwise a waiting or fault message.
    pub status_text: String,

    pub left_lane: Lane,
    pub right_lane: Lane,

    /// Appends a frame counter line to every rendered overlay.
    pub test_mode: bool,

    /// Number of overlays rendered in test mode since process start.
    pub frame_counter: u64,
}

impl RaceState {
    /// Create the initial, non-running race state.
    pub fn new(left_lane: i32, right_lane: i32, test_mode: bool) -> Result<Self, ConfigError> {
        Ok(Self {
            running: false,
            start_origin: None,
            status_text: WAITING_TEXT.to_string(),
            left_lane: Lane::new(LaneSide::Left, left_lane)?,
            right_lane: Lane::new(LaneSide::Right, right_lane)?,
            test_mode,
            frame_counter: 0,
        })
    }

    /// Start the race clock at `origin`.
    pub fn start(&mut self, origin: Duration, label: impl Into<String>) {
        self.start_origin = Some(origin);
        self.running = true;
        self.status_text = label.into();
    }

    /// Stop the race clock and show `text` instead of an elapsed time.
    ///
    /// `start_origin` is kept as is.
    pub fn stop(&mut self, text: impl Into<String>) {
        self.running = false;
        self.status_text = text.into();
    }

    /// The race origin, only while the race clock is running.
    pub fn active_origin(&self) -> Option<Duration> {
        if self.running { self.start_origin } else { None }
    }
}

/// Build the initial race state, rejecting lane numbers outside `0..=12`.
pub fn new_race_state(
    left_lane: i32,
    right_lane: i32,
    test_mode: bool,
) -> Result<RaceState, ConfigError> {
    RaceState::new(left_lane, right_lane, test_mode)
}
