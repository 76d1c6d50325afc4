//! Start/reset control messages delivered over the broker.
//!
//! The payload is UTF-8 text with `|` separated fields:
//!
//! ```text
//! START|<start time in nanoseconds>|<race label>
//! RESET
//! ```
//!
//! Any first field that does not begin with `START` resets the race clock.

use crate::race::{INVALID_START_TEXT, RaceState, WAITING_TEXT};
use std::time::Duration;
use tracing::{debug, warn};

/// Topic the starter publishes control messages on.
pub const START_TOPIC: &str = "swimcam/start";

const FIELD_SEPARATOR: char = '|';
const START_KEYWORD: &str = "START";
const RESET_KEYWORD: &str = "RESET";

/// A decoded control message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// Start the race clock at `origin` (clock domain).
    Start { origin: Duration, label: String },

    /// A start command whose start time is not a base-10 `u64`.
    InvalidStart,

    /// Stop the race clock. Produced for any non-start keyword.
    Reset,
}

impl ControlMessage {
    /// Decode a raw payload. Returns `None` when it contains no fields.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let text = String::from_utf8_lossy(payload);
        if text.is_empty() {
            return None;
        }

        let mut fields = text.split(FIELD_SEPARATOR);
        let keyword = fields.next()?;

        if !keyword.starts_with(START_KEYWORD) {
            return Some(Self::Reset);
        }

        let Some(origin) = fields.next().and_then(parse_start_time) else {
            return Some(Self::InvalidStart);
        };
        let label = fields.next().unwrap_or_default().to_string();

        Some(Self::Start { origin, label })
    }

    /// Build a start message.
    pub fn start(origin: Duration, label: impl Into<String>) -> Self {
        Self::Start {
            origin,
            label: label.into(),
        }
    }

    /// Encode for publication. `InvalidStart` has no wire form of its own
    /// and is encoded as a start without a usable time.
    pub fn to_payload(&self) -> String {
        match self {
            Self::Start { origin, label } => {
                format!("{START_KEYWORD}|{}|{label}", origin.as_nanos())
            }
            Self::InvalidStart => format!("{START_KEYWORD}|"),
            Self::Reset => RESET_KEYWORD.to_string(),
        }
    }

    /// Apply the message to the race state.
    pub fn apply(self, state: &mut RaceState) {
        match self {
            Self::Start { origin, label } => state.start(origin, label),
            Self::InvalidStart => state.stop(INVALID_START_TEXT),
            Self::Reset => state.stop(WAITING_TEXT),
        }
    }
}

/// Accepts plain ASCII digits only; signs, whitespace and overflow are
/// rejected.
fn parse_start_time(field: &str) -> Option<Duration> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse::<u64>().ok().map(Duration::from_nanos)
}

/// Parse `raw_payload` and update `state` accordingly.
///
/// This is the only write path into [RaceState]; concurrent callers must
/// serialize access, see [SharedRace](crate::SharedRace).
pub fn handle_control_message(raw_payload: &[u8], state: &mut RaceState) {
    debug!(payload = %String::from_utf8_lossy(raw_payload), "got control message");

    let Some(message) = ControlMessage::parse(raw_payload) else {
        debug!("ignoring empty control message");
        return;
    };

    match &message {
        ControlMessage::Start { origin, label } => {
            debug!(origin_ns = origin.as_nanos() as u64, label = %label, "race started");
        }
        ControlMessage::InvalidStart => {
            warn!(
                payload = %String::from_utf8_lossy(raw_payload),
                "start time conversion failure"
            );
        }
        ControlMessage::Reset => debug!("race reset"),
    }

    message.apply(state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race::new_race_state;

    fn state() -> RaceState {
        new_race_state(1, 2, false).unwrap()
    }

    #[test]
    fn test_start_message() {
        let mut state = state();
        handle_control_message(b"START|1000000000|200m Freestyle", &mut state);

        assert!(state.running);
        assert_eq!(state.start_origin, Some(Duration::from_nanos(1_000_000_000)));
        assert_eq!(state.status_text, "200m Freestyle");
    }

    #[test]
    fn test_start_without_label() {
        let mut state = state();
        handle_control_message(b"START|42", &mut state);

        assert!(state.running);
        assert_eq!(state.start_origin, Some(Duration::from_nanos(42)));
        assert_eq!(state.status_text, "");
    }

    #[test]
    fn test_start_prefix_match() {
        let mut state = state();
        handle_control_message(b"STARTED|7|Heat 2", &mut state);
        assert!(state.running);
        assert_eq!(state.status_text, "Heat 2");
    }

    #[test]
    fn test_invalid_start_clears_running() {
        let mut state = state();
        handle_control_message(b"START|1000|Heat 1", &mut state);
        handle_control_message(b"START|notanumber|x", &mut state);

        assert!(!state.running);
        assert_eq!(state.status_text, INVALID_START_TEXT);
        // The stale origin is retained but not active.
        assert_eq!(state.start_origin, Some(Duration::from_nanos(1000)));
        assert_eq!(state.active_origin(), None);
    }

    #[test]
    fn test_invalid_start_variants() {
        for payload in [
            &b"START"[..],
            b"START|",
            b"START|+5|x",
            b"START|-5|x",
            b"START| 5|x",
            b"START|18446744073709551616|x",
        ] {
            assert_eq!(
                ControlMessage::parse(payload),
                Some(ControlMessage::InvalidStart),
                "payload {:?}",
                String::from_utf8_lossy(payload)
            );
        }
    }

    #[test]
    fn test_max_start_time() {
        let message = ControlMessage::parse(b"START|18446744073709551615|x").unwrap();
        assert_eq!(
            message,
            ControlMessage::start(Duration::from_nanos(u64::MAX), "x")
        );
    }

    #[test]
    fn test_reset_and_other_keywords() {
        for payload in [&b"STOP"[..], b"RESET", b"anything|1|2", b"start|1|lower"] {
            let mut state = state();
            handle_control_message(b"START|1|x", &mut state);
            handle_control_message(payload, &mut state);

            assert!(!state.running);
            assert_eq!(state.status_text, WAITING_TEXT);
        }
    }

    #[test]
    fn test_empty_payload_is_noop() {
        let mut state = state();
        handle_control_message(b"START|1|x", &mut state);
        let before = state.clone();

        handle_control_message(b"", &mut state);
        assert_eq!(state, before);
    }

    #[test]
    fn test_payload_encoding() {
        let start = ControlMessage::start(Duration::from_nanos(1_600_000_000_123_456_789), "Race #3");
        assert_eq!(start.to_payload(), "START|1600000000123456789|Race #3");
        assert_eq!(ControlMessage::parse(start.to_payload().as_bytes()), Some(start));

        assert_eq!(ControlMessage::Reset.to_payload(), "RESET");
        assert_eq!(
            ControlMessage::parse(ControlMessage::InvalidStart.to_payload().as_bytes()),
            Some(ControlMessage::InvalidStart)
        );
    }
}
