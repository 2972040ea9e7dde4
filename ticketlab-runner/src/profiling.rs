//! Stage timing.
//!
//! A [`StageTimer`] measures one named stage and emits a `debug` event with
//! the elapsed time when dropped. Events go through `tracing`, so they are
//! shown or hidden by the subscriber's filter (`RUST_LOG=ticketlab_runner=debug`).
//!
//! ```
//! use ticketlab_runner::profiling::StageTimer;
//!
//! fn load() {
//!     let _timer = StageTimer::new("load_history");
//!     // Work happens here...
//! }
//! ```

use std::time::{Duration, Instant};

use tracing::debug;

/// Scope guard that logs its stage duration on drop.
#[derive(Debug)]
pub struct StageTimer {
    stage: &'static str,
    start: Instant,
}

impl StageTimer {
    #[inline]
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            start: Instant::now(),
        }
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        debug!(
            stage = self.stage,
            elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0,
            "stage finished"
        );
    }
}

/// Time a closure, returning its result and duration.
pub fn time_stage<F, R>(stage: &'static str, f: F) -> (R, Duration)
where
    F: FnOnce() -> R,
{
    let timer = StageTimer::new(stage);
    let result = f();
    (result, timer.elapsed())
}
