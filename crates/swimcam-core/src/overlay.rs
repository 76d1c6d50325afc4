//! Per-frame overlay text.
//!
//! Each outgoing video frame gets up to three lines:
//!
//! ```text
//! 14:03:27.512                   wall clock, timezone adjusted
//! 00:01:05.220 200m Freestyle    elapsed race time and label
//! Test Frame # 118               test mode only
//! ```

use crate::race::{RaceState, WAITING_TEXT};
use std::time::Duration;
use tracing::debug;

const SECS_PER_HOUR: u64 = 60 * 60;

/// Timing information for a single video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameContext {
    /// Pipeline-relative timestamp of the buffer, if it has one.
    pub frame_timestamp: Option<Duration>,

    /// Clock-domain instant of pipeline time zero, once the pipeline is
    /// running.
    pub pipeline_base_time: Option<Duration>,
}

impl FrameContext {
    pub fn new(frame_timestamp: Duration, pipeline_base_time: Duration) -> Self {
        Self {
            frame_timestamp: Some(frame_timestamp),
            pipeline_base_time: Some(pipeline_base_time),
        }
    }

    /// Clock-domain instant the frame represents.
    pub fn wall_time(&self) -> Option<Duration> {
        self.pipeline_base_time?.checked_add(self.frame_timestamp?)
    }
}

/// Receives overlay text, once per rendered frame.
pub trait OverlaySink {
    fn set_overlay_text(&mut self, text: String);
}

impl<F> OverlaySink for F
where
    F: FnMut(String),
{
    fn set_overlay_text(&mut self, text: String) {
        self(text)
    }
}

/// Layout the video pipeline applies to the overlay element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayStyle {
    pub valignment: VAlign,
    pub halignment: HAlign,
    pub line_alignment: HAlign,
    pub shaded_background: bool,
    pub shading_value: u8,
    pub font_desc: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    Baseline,
    Bottom,
    Top,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            valignment: VAlign::Top,
            halignment: HAlign::Left,
            line_alignment: HAlign::Left,
            shaded_background: true,
            shading_value: 250,
            font_desc: "Monospace".to_string(),
        }
    }
}

/// Format a clock value as `HH:MM:SS.mmm`.
///
/// The hour field is shifted by `tz_offset_hours` and wrapped into
/// `0..24`; there is no date component. An absent time renders as an
/// empty string.
pub fn render_time(time: Option<Duration>, tz_offset_hours: i32) -> String {
    let Some(time) = time else {
        return String::new();
    };

    let total_secs = time.as_secs();
    let hours = shift_hours(total_secs / SECS_PER_HOUR, tz_offset_hours);
    let mins = (total_secs / 60) % 60;
    let secs = total_secs % 60;
    let millis = time.subsec_millis();

    format!("{hours:02}:{mins:02}:{secs:02}.{millis:03}")
}

fn shift_hours(raw_hours: u64, tz_offset_hours: i32) -> u64 {
    let hours = (raw_hours % 24) as i64 + i64::from(tz_offset_hours);
    hours.rem_euclid(24) as u64
}

/// Compute the overlay text for one frame.
///
/// Returns `None` when the frame has no timestamp or the pipeline has no
/// base time yet; the previously displayed text must then be left alone.
/// In test mode every rendered frame bumps `state.frame_counter`.
pub fn render_overlay(
    frame: &FrameContext,
    state: &mut RaceState,
    tz_offset_hours: i32,
) -> Option<String> {
    let Some(frame_timestamp) = frame.frame_timestamp else {
        debug!("buffer without valid timestamp");
        return None;
    };
    let Some(base_time) = frame.pipeline_base_time else {
        debug!("media without valid base time");
        return None;
    };
    let wall_time = base_time.checked_add(frame_timestamp)?;

    let wall_line = render_time(Some(wall_time), tz_offset_hours);
    let race_line = race_line(state, base_time, wall_time);

    let text = if state.test_mode {
        state.frame_counter += 1;
        format!(
            "{wall_line}\n{race_line}\nTest Frame # {}",
            state.frame_counter
        )
    } else {
        format!("{wall_line}\n{race_line}")
    };

    Some(text)
}

fn race_line(state: &RaceState, base_time: Duration, wall_time: Duration) -> String {
    let Some(origin) = state.active_origin() else {
        return WAITING_TEXT.to_string();
    };

    // A start later than the pipeline epoch is suppressed, which also
    // hides every race started after this pipeline came up.
    if origin > base_time {
        return WAITING_TEXT.to_string();
    }

    match wall_time.checked_sub(origin) {
        Some(elapsed) => format!("{} {}", render_time(Some(elapsed), 0), state.status_text),
        None => WAITING_TEXT.to_string(),
    }
}

/// Render `frame` and hand the text to `sink`. Skipped frames leave the
/// sink untouched. Returns whether the sink was updated.
pub fn drive_frame<S>(
    frame: &FrameContext,
    state: &mut RaceState,
    tz_offset_hours: i32,
    sink: &mut S,
) -> bool
where
    S: OverlaySink + ?Sized,
{
    match render_overlay(frame, state, tz_offset_hours) {
        Some(text) => {
            sink.set_overlay_text(text);
            true
        }
        None => false,
    }
}
