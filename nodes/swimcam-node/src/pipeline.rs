//! A live test-pattern video source standing in for the capture pipeline.
//!
//! Frames are timestamped with the running time since the pipeline
//! started, and the pipeline base time is the clock-domain instant of
//! that start, as a live media pipeline would report them.

use std::{sync::Arc, time::Duration};
use swimcam_core::{FrameContext, OverlaySink, SharedRace, SyncClock};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

/// Produces one [FrameContext] per call once started.
pub struct TestPattern {
    clock: Arc<dyn SyncClock>,
    frame_interval: Duration,
    base_time: Option<Duration>,
}

impl TestPattern {
    pub fn new(clock: Arc<dyn SyncClock>, frame_interval: Duration) -> Self {
        Self {
            clock,
            frame_interval,
            base_time: None,
        }
    }

    /// Take the current clock instant as pipeline time zero.
    pub fn start(&mut self) {
        let base_time = self.clock.now();
        info!(base_time = ?base_time, "pipeline started");
        self.base_time = Some(base_time);
    }

    pub fn base_time(&self) -> Option<Duration> {
        self.base_time
    }

    /// The frame captured now. Before [start](Self::start) frames carry
    /// no base time.
    pub fn next_frame(&self) -> FrameContext {
        let now = self.clock.now();
        FrameContext {
            frame_timestamp: Some(now.saturating_sub(self.base_time.unwrap_or(now))),
            pipeline_base_time: self.base_time,
        }
    }

    /// Start the pipeline and render one overlay per frame interval,
    /// forever.
    pub async fn run<S>(mut self, race: SharedRace, tz_offset_hours: i32, sink: &mut S)
    where
        S: OverlaySink + ?Sized,
    {
        let mut ticker = interval(self.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.start();

        loop {
            ticker.tick().await;
            let frame = self.next_frame();
            race.drive(&frame, tz_offset_hours, sink);
        }
    }
}

/// Logs every overlay update. Stands in for the text overlay element.
#[derive(Debug, Default)]
pub struct LogSink {
    updates: u64,
    last: Option<String>,
}

impl LogSink {
    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }
}

impl OverlaySink for LogSink {
    fn set_overlay_text(&mut self, text: String) {
        self.updates += 1;
        debug!(frame = self.updates, overlay = %text.replace('\n', " | "), "overlay updated");
        self.last = Some(text);
    }
}
