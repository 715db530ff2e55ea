// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Fixed-rate consumer loop.
//!
//! The renderer is not part of this crate. [`DisplayLoop`] drains every
//! queue once per tick and hands the frames to a [`FrameConsumer`], then
//! sleeps to the next tick boundary. An empty queue is a quiet tick, never
//! an error.

use crate::{
    lidar::LidarFrame,
    playback::{PlaybackState, Progress},
    queue::QueueReceiver,
    radar::SectorFrame,
};
use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};
use tracing::{debug, warn};

/// Default display rate.
pub const DEFAULT_FRAME_RATE: u32 = 60;

/// Frames older than this when drained are reported as stale.
pub const DEFAULT_STALE_THRESHOLD: Duration = Duration::from_millis(110);

/// Receives drained frames. Implemented by the renderer.
pub trait FrameConsumer {
    fn sector_frame(&mut self, frame: SectorFrame);

    fn lidar_frame(&mut self, frame: LidarFrame);

    /// Called once per tick after the queues were drained.
    fn tick(&mut self, _progress: Progress) {}
}

/// Counts of what one tick drained.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub sector_frames: usize,
    pub lidar_frames: usize,
    pub stale: usize,
}

pub struct DisplayLoop {
    radar: QueueReceiver<SectorFrame>,
    lidar: Option<QueueReceiver<LidarFrame>>,
    state: Arc<PlaybackState>,
    period: Duration,
    stale_threshold: Duration,
}

impl DisplayLoop {
    pub fn new(radar: QueueReceiver<SectorFrame>, state: Arc<PlaybackState>) -> Self {
        Self {
            radar,
            lidar: None,
            state,
            period: Duration::from_secs(1) / DEFAULT_FRAME_RATE,
            stale_threshold: DEFAULT_STALE_THRESHOLD,
        }
    }

    pub fn with_lidar(mut self, lidar: QueueReceiver<LidarFrame>) -> Self {
        self.lidar = Some(lidar);
        self
    }

    /// Ticks per second; zero is treated as one.
    pub fn with_frame_rate(mut self, rate: u32) -> Self {
        self.period = Duration::from_secs(1) / rate.max(1);
        self
    }

    pub fn with_stale_threshold(mut self, threshold: Duration) -> Self {
        self.stale_threshold = threshold;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Drain every queue once and feed `consumer`.
    pub fn run_once<C: FrameConsumer>(&self, consumer: &mut C) -> TickSummary {
        let mut summary = TickSummary::default();
        // Paused playback holds frames back on purpose
        let check_stale = !self.state.is_paused();

        for frame in self.radar.drain() {
            let delay = frame.received_time.elapsed();
            if check_stale && delay > self.stale_threshold {
                summary.stale += 1;
                warn!(
                    "sector {} is {:.3}s old, display is falling behind",
                    frame.sector_index,
                    delay.as_secs_f64()
                );
            }
            summary.sector_frames += 1;
            consumer.sector_frame(frame);
        }

        if let Some(lidar) = &self.lidar {
            for frame in lidar.drain() {
                let delay = frame.frame_time.elapsed();
                if check_stale && delay > self.stale_threshold {
                    summary.stale += 1;
                    warn!(
                        "lidar frame {} is {:.3}s old, display is falling behind",
                        frame.index,
                        delay.as_secs_f64()
                    );
                }
                summary.lidar_frames += 1;
                consumer.lidar_frame(frame);
            }
        }

        consumer.tick(self.state.progress());
        summary
    }

    /// Tick until playback stops.
    pub fn run<C: FrameConsumer>(&self, consumer: &mut C) {
        debug!("display loop running at {:?} per tick", self.period);
        let mut target_time = Instant::now() + self.period;

        while self.state.is_running() {
            self.run_once(consumer);

            let now = Instant::now();
            if target_time > now {
                thread::sleep(target_time - now);
                target_time += self.period;
            } else {
                // Overran; resynchronise instead of bursting to catch up
                target_time = now + self.period;
            }
        }

        // Frames queued during shutdown
        self.run_once(consumer);
        debug!("display loop stopped");
    }
}
