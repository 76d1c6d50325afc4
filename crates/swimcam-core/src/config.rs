use crate::{
    race::{MAX_LANE, RaceState},
    shared::DEFAULT_LOCK_BUDGET,
};
use serde::Deserialize;
use std::{fmt, time::Duration};

/// Well-known UDP port the authority advertises itself on.
pub const DEFAULT_DISCOVERY_PORT: u16 = 54545;

/// Default port of the publish/subscribe broker on the authority.
pub const DEFAULT_BROKER_PORT: u16 = 1883;

/// Default port of the network clock served by the authority.
pub const DEFAULT_CLOCK_PORT: u16 = 9998;

/// Fixed offset applied to the wall-clock line of the overlay.
pub const DEFAULT_TZ_OFFSET_HOURS: i32 = -5;

/// Which of the two lanes a camera covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneSide {
    Left,
    Right,
}

impl fmt::Display for LaneSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneSide::Left => f.write_str("left"),
            LaneSide::Right => f.write_str("right"),
        }
    }
}

/// Invalid camera configuration, detected before anything is started.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{side} lane must be between 0 and {max}, got {value}", max = MAX_LANE)]
    LaneOutOfRange { side: LaneSide, value: i32 },

    #[error("timezone offset must be between -23 and 23 hours, got {0}")]
    TimezoneOutOfRange(i32),
}

/// Per-camera settings consumed by the race-timing core.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera instance number, used to build the broker client id.
    pub instance: u32,

    /// Lane shown on the left of the frame, 0 when unused.
    pub left_lane: i32,

    /// Lane shown on the right of the frame, 0 when unused.
    pub right_lane: i32,

    /// Append a frame counter to every overlay.
    pub test_mode: bool,

    /// Running on the authority host itself; skip discovery and use
    /// loopback.
    pub local_override: bool,

    /// Hours added to the wall-clock line.
    pub tz_offset_hours: i32,

    pub discovery_port: u16,
    pub broker_port: u16,
    pub clock_port: u16,

    /// How long a frame render may wait on the shared race state before
    /// the frame is left untouched.
    #[serde(with = "humantime_serde")]
    pub render_lock_budget: Duration,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            instance: 1,
            left_lane: 1,
            right_lane: 2,
            test_mode: false,
            local_override: false,
            tz_offset_hours: DEFAULT_TZ_OFFSET_HOURS,
            discovery_port: DEFAULT_DISCOVERY_PORT,
            broker_port: DEFAULT_BROKER_PORT,
            clock_port: DEFAULT_CLOCK_PORT,
            render_lock_budget: DEFAULT_LOCK_BUDGET,
        }
    }
}

impl CameraConfig {
    /// Check lane numbers and the timezone offset.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.race_state().map(|_| ())?;

        if !(-23..=23).contains(&self.tz_offset_hours) {
            return Err(ConfigError::TimezoneOutOfRange(self.tz_offset_hours));
        }

        Ok(())
    }

    /// Build the initial race state for this camera.
    pub fn race_state(&self) -> Result<RaceState, ConfigError> {
        RaceState::new(self.left_lane, self.right_lane, self.test_mode)
    }

    /// Broker client id, `<hostname>-<instance>`.
    pub fn client_id(&self, hostname: &str) -> String {
        format!("{}-{}", hostname, self.instance)
    }
}
