// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Playback pacing.
//!
//! Recorded data has no natural rate, so producers sleep to approximate the
//! sensor's cadence:
//!
//! - [`Pacing::FixedDelay`] sleeps a constant after every line, matching the
//!   decoder's emission rate for plain file playback.
//! - [`Pacing::WallClock`] gives every file or frame a time budget and sleeps
//!   whatever is left of it once processing is done.

use std::{
    thread,
    time::{Duration, Instant},
};

/// Default per-line delay for directory playback.
pub const DEFAULT_LINE_DELAY: Duration = Duration::from_micros(200);

/// Default budget per LiDAR frame, and per file on the radar fast path.
pub const DEFAULT_FRAME_PERIOD: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pacing {
    /// Run as fast as possible.
    None,
    /// Sleep this long after each processed line.
    FixedDelay(Duration),
    /// Each unit of work (file or frame) takes at least this long.
    WallClock(Duration),
}

impl Pacing {
    /// Call after each processed line.
    #[inline]
    pub fn after_line(&self) {
        if let Pacing::FixedDelay(delay) = self {
            if !delay.is_zero() {
                thread::sleep(*delay);
            }
        }
    }

    /// Call after finishing a file or frame that was started at `started`.
    pub fn after_unit(&self, started: Instant) {
        if let Some(sleep) = self.unit_sleep(started.elapsed()) {
            thread::sleep(sleep);
        }
    }

    /// How long [`Pacing::after_unit`] sleeps for a unit that took `elapsed`.
    pub fn unit_sleep(&self, elapsed: Duration) -> Option<Duration> {
        match self {
            Pacing::WallClock(period) => {
                let sleep = remaining(*period, elapsed);
                (!sleep.is_zero()).then_some(sleep)
            }
            _ => None,
        }
    }
}

/// Time left of `period` after `elapsed`, never negative.
#[inline]
pub fn remaining(period: Duration, elapsed: Duration) -> Duration {
    period.saturating_sub(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_never_negative() {
        let period = Duration::from_millis(100);
        assert_eq!(remaining(period, Duration::from_millis(30)), Duration::from_millis(70));
        assert_eq!(remaining(period, period), Duration::ZERO);
        assert_eq!(remaining(period, Duration::from_millis(250)), Duration::ZERO);
    }

    #[test]
    fn test_unit_sleep_policies() {
        let wall = Pacing::WallClock(Duration::from_millis(100));
        assert_eq!(
            wall.unit_sleep(Duration::from_millis(40)),
            Some(Duration::from_millis(60))
        );
        assert_eq!(wall.unit_sleep(Duration::from_millis(100)), None);
        assert_eq!(wall.unit_sleep(Duration::from_secs(3)), None);

        let fixed = Pacing::FixedDelay(DEFAULT_LINE_DELAY);
        assert_eq!(fixed.unit_sleep(Duration::ZERO), None);
        assert_eq!(Pacing::None.unit_sleep(Duration::ZERO), None);
    }

    #[test]
    fn test_wall_clock_sleeps_budget() {
        let pacing = Pacing::WallClock(Duration::from_millis(20));
        let start = Instant::now();
        pacing.after_unit(start);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_fixed_delay_sleeps() {
        let pacing = Pacing::FixedDelay(Duration::from_millis(5));
        let start = Instant::now();
        for _ in 0..3 {
            pacing.after_line();
        }
        assert!(start.elapsed() >= Duration::from_millis(15));
    }
}
