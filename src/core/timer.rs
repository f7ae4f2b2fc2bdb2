//! A monotonic stopwatch.

use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

/// The observable state of a [`Timer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Freshly created or reset. No measurement taken yet.
    Idle,
    /// Between a `start()` and the matching `stop()`.
    Running,
    /// Stopped explicitly or by reading the elapsed time.
    Stopped,
}

/// A two-mark stopwatch backed by the monotonic clock.
///
/// A `Timer` can be driven by hand with [`start`](Self::start) and
/// [`stop`](Self::stop), or bound to a lexical scope with
/// [`scope`](Self::scope), which restarts it on entry and stops it when the
/// guard is dropped, whatever the exit path.
///
/// Reading [`elapsed`](Self::elapsed) while the timer runs stops it first.
#[derive(Debug, Clone)]
pub struct Timer {
    // Stands in for the unset start mark: a stop without a start is
    // measured from the moment the timer was created or last reset.
    origin: Instant,
    start_mark: Option<Instant>,
    stop_mark: Option<Instant>,
    running: bool,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Creates an idle timer.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            start_mark: None,
            stop_mark: None,
            running: false,
        }
    }

    /// Creates a timer that is already running.
    pub fn started() -> Self {
        let mut timer = Self::new();
        timer.start();
        timer
    }

    /// Clears both marks and returns to [`TimerState::Idle`].
    /// With `start` set, the timer is started again right away.
    pub fn reset(&mut self, start: bool) {
        self.origin = Instant::now();
        self.start_mark = None;
        self.stop_mark = None;
        self.running = false;
        if start {
            self.start();
        }
    }

    /// Records the start mark. Calling it while running restarts the measurement.
    pub fn start(&mut self) {
        self.start_mark = Some(Instant::now());
        self.running = true;
    }

    /// Records the stop mark.
    pub fn stop(&mut self) {
        self.stop_mark = Some(Instant::now());
        self.running = false;
    }

    /// Whether the timer is between `start()` and `stop()`.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The current state of the timer.
    pub fn state(&self) -> TimerState {
        if self.running {
            TimerState::Running
        } else if self.stop_mark.is_some() {
            TimerState::Stopped
        } else {
            TimerState::Idle
        }
    }

    /// Time between the start and stop marks.
    ///
    /// A running timer is stopped first. An idle timer reads as zero, and a
    /// timer stopped without ever being started is measured from its
    /// creation or last reset. The result is never negative.
    pub fn elapsed(&mut self) -> Duration {
        if self.running {
            self.stop();
        }
        match (self.start_mark, self.stop_mark) {
            (Some(start), Some(stop)) => stop.saturating_duration_since(start),
            (None, Some(stop)) => stop.saturating_duration_since(self.origin),
            (_, None) => Duration::ZERO,
        }
    }

    /// Binds the timer to the current scope.
    ///
    /// The timer is reset and started now, and stopped when the returned
    /// guard goes out of scope, including while unwinding from a panic.
    pub fn scope(&mut self) -> TimerScope<'_> {
        self.reset(true);
        TimerScope { timer: self }
    }

    /// Runs `f` inside a [`scope`](Self::scope) and returns its value with
    /// the time it took.
    pub fn time<T>(&mut self, f: impl FnOnce() -> T) -> (T, Duration) {
        let value = {
            let _scope = self.scope();
            f()
        };
        (value, self.elapsed())
    }
}

/// Guard returned by [`Timer::scope`]. Stops the timer when dropped.
#[derive(Debug)]
pub struct TimerScope<'a> {
    timer: &'a mut Timer,
}

impl Deref for TimerScope<'_> {
    type Target = Timer;

    fn deref(&self) -> &Timer {
        &*self.timer
    }
}

impl DerefMut for TimerScope<'_> {
    fn deref_mut(&mut self) -> &mut Timer {
        &mut *self.timer
    }
}

impl Drop for TimerScope<'_> {
    fn drop(&mut self) {
        self.timer.stop();
    }
}
