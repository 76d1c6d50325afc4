//! The race state shared between the message-delivery context and the
//! media-processing context.

use crate::{
    message::handle_control_message,
    overlay::{FrameContext, OverlaySink, render_overlay},
    race::RaceState,
};
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

/// Default time a render waits on the state lock before skipping a frame.
pub const DEFAULT_LOCK_BUDGET: Duration = Duration::from_millis(2);

/// A cloneable handle to the single race state of a camera process.
///
/// Control messages are applied under one lock acquisition, and a render
/// reads the whole record (and bumps the frame counter) under one lock
/// acquisition, so a frame never sees a running flag from one message
/// paired with an origin or label from another.
#[derive(Debug, Clone)]
pub struct SharedRace {
    state: Arc<Mutex<RaceState>>,
    lock_budget: Duration,
}

impl SharedRace {
    pub fn new(state: RaceState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            lock_budget: DEFAULT_LOCK_BUDGET,
        }
    }

    /// Set how long [render](Self::render) may wait for the lock.
    pub fn with_lock_budget(mut self, lock_budget: Duration) -> Self {
        self.lock_budget = lock_budget;
        self
    }

    pub fn lock_budget(&self) -> Duration {
        self.lock_budget
    }

    /// Apply a raw control-message payload.
    pub fn apply(&self, payload: &[u8]) {
        let mut state = self.state.lock();
        handle_control_message(payload, &mut state);
    }

    /// A consistent copy of the current state.
    pub fn snapshot(&self) -> RaceState {
        self.state.lock().clone()
    }

    /// Render the overlay for one frame.
    ///
    /// Never blocks longer than the lock budget. If the lock cannot be
    /// taken in time the frame is skipped, as with a frame that has no
    /// timestamp.
    pub fn render(&self, frame: &FrameContext, tz_offset_hours: i32) -> Option<String> {
        frame.frame_timestamp?;
        frame.pipeline_base_time?;

        let Some(mut state) = self.state.try_lock_for(self.lock_budget) else {
            warn!(
                budget = ?self.lock_budget,
                "race state busy, leaving overlay unchanged"
            );
            return None;
        };
        render_overlay(frame, &mut state, tz_offset_hours)
    }

    /// Render and deliver to `sink`. Returns whether the sink was updated.
    pub fn drive<S>(&self, frame: &FrameContext, tz_offset_hours: i32, sink: &mut S) -> bool
    where
        S: OverlaySink + ?Sized,
    {
        match self.render(frame, tz_offset_hours) {
            Some(text) => {
                sink.set_overlay_text(text);
                true
            }
            None => false,
        }
    }
}

/// Forwards payloads from a transport callback into a [SharedRace].
///
/// The transport keeps the sender returned by [control_feed] and pushes
/// every payload it receives; [ControlFeed::run] applies them in arrival
/// order.
pub struct ControlFeed {
    rx: flume::Receiver<Vec<u8>>,
    race: SharedRace,
}

/// Create a bounded control feed for `race`.
pub fn control_feed(race: SharedRace, capacity: usize) -> (flume::Sender<Vec<u8>>, ControlFeed) {
    let (tx, rx) = flume::bounded(capacity);
    (tx, ControlFeed { rx, race })
}

impl ControlFeed {
    /// Apply payloads until every sender is dropped.
    pub async fn run(self) {
        while let Ok(payload) = self.rx.recv_async().await {
            self.race.apply(&payload);
        }
        debug!("control feed closed");
    }

    /// Blocking variant of [run](Self::run) for a dedicated thread.
    pub fn run_blocking(self) {
        for payload in self.rx.iter() {
            self.race.apply(&payload);
        }
        debug!("control feed closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race::{WAITING_TEXT, new_race_state};
    use std::thread;

    fn race(test_mode: bool) -> SharedRace {
        SharedRace::new(new_race_state(1, 2, test_mode).unwrap())
    }

    #[test]
    fn test_apply_and_snapshot() {
        let race = race(false);
        race.apply(b"START|1000000000|200m Freestyle");

        let snapshot = race.snapshot();
        assert!(snapshot.running);
        assert_eq!(snapshot.start_origin, Some(Duration::from_secs(1)));
        assert_eq!(snapshot.status_text, "200m Freestyle");
    }

    #[test]
    fn test_render_skips_while_locked() {
        let race = race(true).with_lock_budget(Duration::from_millis(1));
        let frame = FrameContext::new(Duration::ZERO, Duration::from_secs(3600));

        let guard = race.state.lock();
        assert_eq!(race.render(&frame, 0), None);
        drop(guard);

        let text = race.render(&frame, 0).unwrap();
        assert_eq!(text, "01:00:00.000\nWaiting for start...\nTest Frame # 1");
    }

    #[test]
    fn test_render_skip_does_not_count_frame() {
        let race = race(true);
        assert_eq!(race.render(&FrameContext::default(), 0), None);
        assert_eq!(race.snapshot().frame_counter, 0);
    }

    #[test]
    fn test_sink_untouched_on_skip() {
        let race = race(false);
        let mut shown: Vec<String> = Vec::new();
        let mut sink = |text: String| shown.push(text);

        assert!(!race.drive(&FrameContext::default(), 0, &mut sink));
        assert!(race.drive(&FrameContext::new(Duration::ZERO, Duration::ZERO), 0, &mut sink));
        assert_eq!(shown.len(), 1);
        assert!(shown[0].ends_with(WAITING_TEXT));
    }

    #[test]
    fn test_control_feed_blocking() {
        let race = race(false);
        let (tx, feed) = control_feed(race.clone(), 4);
        let worker = thread::spawn(move || feed.run_blocking());

        tx.send(b"START|5|Heat 1".to_vec()).unwrap();
        tx.send(b"RESET".to_vec()).unwrap();
        tx.send(b"START|9|Heat 2".to_vec()).unwrap();
        drop(tx);
        worker.join().unwrap();

        let snapshot = race.snapshot();
        assert!(snapshot.running);
        assert_eq!(snapshot.start_origin, Some(Duration::from_nanos(9)));
        assert_eq!(snapshot.status_text, "Heat 2");
    }
}
