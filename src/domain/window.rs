//! Lookback windows and the counts taken over them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliseconds in the minute window.
pub const MINUTE_MS: u64 = 60_000;
/// Milliseconds in the hour window.
pub const HOUR_MS: u64 = 3_600_000;
/// Milliseconds in the day window, the longest one tracked.
pub const DAY_MS: u64 = 86_400_000;

/// A fixed-duration lookback period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    /// Last 60 seconds
    Minute,
    /// Last 60 minutes
    Hour,
    /// Last 24 hours
    Day,
}

impl Window {
    /// All windows, shortest first.
    pub const ALL: [Window; 3] = [Window::Minute, Window::Hour, Window::Day];

    /// The longest tracked window. Pruning never discards anything inside it.
    pub const LONGEST: Window = Window::Day;

    /// Length of the window in milliseconds.
    pub const fn millis(self) -> u64 {
        match self {
            Window::Minute => MINUTE_MS,
            Window::Hour => HOUR_MS,
            Window::Day => DAY_MS,
        }
    }

    /// Exclusive lower bound of the window ending at `now`.
    ///
    /// An event belongs to the window iff its timestamp is strictly greater
    /// than the bound. Returns `None` when the window reaches back before the
    /// epoch, in which case every event belongs to it.
    pub fn lower_bound(self, now: u64) -> Option<u64> {
        now.checked_sub(self.millis())
    }

    /// Check if an event at `timestamp` falls inside the window ending at `now`.
    pub fn contains(self, timestamp: u64, now: u64) -> bool {
        match self.lower_bound(now) {
            Some(bound) => timestamp > bound,
            None => true,
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Window::Minute => f.write_str("minute"),
            Window::Hour => f.write_str("hour"),
            Window::Day => f.write_str("day"),
        }
    }
}

/// Event counts over the three canonical windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowCounts {
    /// Events in the last minute
    pub minute: u64,
    /// Events in the last hour
    pub hour: u64,
    /// Events in the last day
    pub day: u64,
}

impl WindowCounts {
    /// Create counts from explicit values.
    pub const fn new(minute: u64, hour: u64, day: u64) -> Self {
        Self { minute, hour, day }
    }

    /// Count for one window.
    pub fn get(&self, window: Window) -> u64 {
        match window {
            Window::Minute => self.minute,
            Window::Hour => self.hour,
            Window::Day => self.day,
        }
    }

    /// Add one event at `timestamp` to every window ending at `now` that contains it.
    pub(crate) fn tally(&mut self, timestamp: u64, now: u64) {
        if Window::Day.contains(timestamp, now) {
            self.day += 1;
            if Window::Hour.contains(timestamp, now) {
                self.hour += 1;
                if Window::Minute.contains(timestamp, now) {
                    self.minute += 1;
                }
            }
        }
    }
}

impl fmt::Display for WindowCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/min, {}/h, {}/day", self.minute, self.hour, self.day)
    }
}
