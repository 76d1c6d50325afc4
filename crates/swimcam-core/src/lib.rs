//! Race-timing core for synchronized swim-race cameras.
//!
//! Every camera at a venue burns the same race clock into its video. This
//! crate holds the parts that make the clocks agree:
//!
//! - [discovery] finds the time/config authority on the network.
//! - [RaceState] records whether a race is running and when it started.
//! - [handle_control_message] applies `START`/`RESET` messages from the
//!   broker.
//! - [render_overlay] turns a frame timestamp and the race state into the
//!   overlay text for that frame.
//! - [SharedRace] lets the broker thread and the video thread share one
//!   race state without ever seeing a half-applied update.
//!
//! # Usage
//!
//! ```rust
//! use std::time::Duration;
//! use swimcam_core::{FrameContext, SharedRace, new_race_state};
//!
//! let race = SharedRace::new(new_race_state(1, 2, false)?);
//!
//! // Delivered by the broker.
//! race.apply(b"START|43200000000000|200m Freestyle");
//!
//! // Per frame, from the video pipeline. The pipeline epoch is the race
//! // start here, and the frame is 65.22 s into the pipeline.
//! let frame = FrameContext::new(
//!     Duration::from_millis(65_220),
//!     Duration::from_secs(12 * 3600),
//! );
//! let text = race.render(&frame, -5).unwrap();
//! assert_eq!(text, "07:01:05.220\n00:01:05.220 200m Freestyle");
//! # Ok::<(), swimcam_core::ConfigError>(())
//! ```

pub mod clock;
mod config;
pub mod discovery;
mod message;
pub mod overlay;
mod race;
mod shared;

pub use clock::{ManualClock, SyncClock, SystemClock, wait_for_sync};
pub use config::{
    CameraConfig, ConfigError, DEFAULT_BROKER_PORT, DEFAULT_CLOCK_PORT, DEFAULT_DISCOVERY_PORT,
    DEFAULT_TZ_OFFSET_HOURS, LaneSide,
};
pub use discovery::{Advertiser, discover_authority, resolve_authority};
pub use message::{ControlMessage, START_TOPIC, handle_control_message};
pub use overlay::{FrameContext, OverlaySink, OverlayStyle, drive_frame, render_overlay, render_time};
pub use race::{INVALID_START_TEXT, Lane, MAX_LANE, RaceState, WAITING_TEXT, new_race_state};
pub use shared::{ControlFeed, DEFAULT_LOCK_BUDGET, SharedRace, control_feed};
