// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use clap::{Parser, ValueEnum};
use std::{path::PathBuf, time::Duration};
use tracing::level_filters::LevelFilter;

use edgefirst_radarstream::{
    pacing::Pacing,
    queue::{OverflowPolicy, QueueCapacities},
    radar::{Error, SourceMode},
};

/// What the binary does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Stream from the live multicast feed
    Live,
    /// Replay one recording through the file decoder
    File,
    /// Play a directory of per-rotation text files
    Directory,
    /// Split a recording into per-rotation text files
    Record,
}

impl Mode {
    /// Source mode for playback, `None` for recording.
    pub fn source_mode(&self) -> Option<SourceMode> {
        match self {
            Mode::Live => Some(SourceMode::Live),
            Mode::File => Some(SourceMode::File),
            Mode::Directory => Some(SourceMode::Directory),
            Mode::Record => None,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Data source mode.
    #[arg(long, env, default_value = "live")]
    pub mode: Mode,

    /// Recording to replay (file, record) or directory of rotation files
    /// (directory).  Unused in live mode.
    #[arg(env)]
    pub target: Option<PathBuf>,

    /// Multicast address the live decoder joins.
    #[arg(long, env, default_value = "239.192.43.79")]
    pub multicast_addr: String,

    /// Live decoder binary.
    #[arg(long, env, default_value = "./src/SPxLiveStream")]
    pub live_decoder: String,

    /// File decoder binary, used by the file and record modes.
    #[arg(long, env, default_value = "./src/SPxDataStream")]
    pub file_decoder: String,

    /// Directory of LiDAR frame files played alongside the radar.
    #[arg(long, env)]
    pub lidar_dir: Option<PathBuf>,

    /// Extension of the rotation files in directory mode.
    #[arg(long, env, default_value = "txt")]
    pub extension: String,

    /// Extension of the LiDAR frame files.
    #[arg(long, env, default_value = "pcd")]
    pub lidar_extension: String,

    /// Radar queue capacity in live mode.
    #[arg(long, env, default_value = "10")]
    pub live_queue: usize,

    /// Radar queue capacity in file mode.
    #[arg(long, env, default_value = "10")]
    pub file_queue: usize,

    /// Radar queue capacity in directory mode.
    #[arg(long, env, default_value = "36")]
    pub directory_queue: usize,

    /// LiDAR queue capacity.
    #[arg(long, env, default_value = "128")]
    pub lidar_queue: usize,

    /// What to drop when a queue is full.
    #[arg(long, env, default_value = "drop-newest")]
    pub overflow: OverflowPolicy,

    /// Delay after each line in directory mode, in microseconds.
    #[arg(long, env, default_value = "200")]
    pub line_delay_us: u64,

    /// Minimum time per file in directory mode, in milliseconds.  When set,
    /// replaces the per-line delay.
    #[arg(long, env)]
    pub file_period_ms: Option<u64>,

    /// Time per LiDAR frame in milliseconds.
    #[arg(long, env, default_value = "100")]
    pub lidar_period_ms: u64,

    /// Display ticks per second.
    #[arg(long, env, default_value = "60")]
    pub frame_rate: u32,

    /// Warn when a frame is older than this when displayed, in milliseconds.
    #[arg(long, env, default_value = "110")]
    pub stale_ms: u64,

    /// Time given to the decoder to exit on shutdown, in milliseconds.
    #[arg(long, env, default_value = "1000")]
    pub stop_timeout_ms: u64,

    /// Output directory for record mode.  Defaults to the recording's file
    /// stem.
    #[arg(long, env)]
    pub out_dir: Option<PathBuf>,

    /// Application log level
    #[arg(long, env, default_value = "info")]
    pub rust_log: LevelFilter,
}

impl Args {
    pub fn capacities(&self) -> QueueCapacities {
        QueueCapacities {
            live: self.live_queue,
            file: self.file_queue,
            directory: self.directory_queue,
            lidar: self.lidar_queue,
        }
    }

    /// Pacing for directory playback.
    pub fn directory_pacing(&self) -> Pacing {
        match self.file_period_ms {
            Some(ms) => Pacing::WallClock(Duration::from_millis(ms)),
            None => Pacing::FixedDelay(Duration::from_micros(self.line_delay_us)),
        }
    }

    pub fn lidar_pacing(&self) -> Pacing {
        Pacing::WallClock(Duration::from_millis(self.lidar_period_ms))
    }

    pub fn stale_threshold(&self) -> Duration {
        Duration::from_millis(self.stale_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /// Target path, required by every mode except live.
    pub fn require_target(&self) -> Result<&PathBuf, Error> {
        self.target
            .as_ref()
            .ok_or_else(|| Error::Config(format!("{:?} mode needs a target path", self.mode)))
    }

    /// Where record mode writes its rotation files.
    pub fn record_dir(&self) -> Result<PathBuf, Error> {
        if let Some(dir) = &self.out_dir {
            return Ok(dir.clone());
        }
        let target = self.require_target()?;
        let stem = target
            .file_stem()
            .ok_or_else(|| Error::Config(format!("{} has no file name", target.display())))?;
        Ok(PathBuf::from(stem))
    }
}
