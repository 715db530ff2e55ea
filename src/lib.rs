// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! EdgeFirst Radar Stream Library
//!
//! Ingests marine radar sweeps and LiDAR point-cloud frames and hands them
//! to a real-time display through bounded, load-shedding queues.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   ┌───────────┐   ┌──────────────────┐   ┌────────────┐
//! │ LineSource       │──►│ decoder   │──►│ SectorAccumulator│──►│            │
//! │ (decoder process)│   └───────────┘   └──────────────────┘   │ bounded    │   ┌─────────────┐
//! │ rotation files   │                                          │ queues     │──►│ DisplayLoop │
//! ├──────────────────┤   ┌───────────┐                          │            │   │ (60 Hz)     │
//! │ PCD frame files  │──►│ pcd       │─────────────────────────►│            │   └─────────────┘
//! └──────────────────┘   └───────────┘                          └────────────┘
//!          ▲
//!          └──── PlaybackState (pause / seek / shutdown) ◄── PlaybackController
//! ```
//!
//! Every producer runs on its own named thread and polls the shared
//! [`playback::PlaybackState`] on every iteration. Producers never block on
//! the display: a full queue drops a frame and counts it.
//!
//! # Modules
//!
//! - [`radar`]: Common types and error handling
//! - [`decoder`]: Text record decoding
//! - [`sector`]: Grouping returns into 30° sector frames
//! - [`lidar`]: LiDAR point storage
//! - [`pcd`]: LiDAR frame file reader
//! - [`queue`]: Bounded frame queue
//! - [`playback`]: Playback state machine and commands
//! - [`pacing`]: Real-time pacing of recorded data
//! - [`line_source`]: Decoder process abstraction for testing
//! - [`producer`]: Live, file, directory and LiDAR producers
//! - [`display`]: Fixed-rate consumer loop
//! - [`recorder`]: Splitting a decoder stream into rotation files
//!
//! # Example
//!
//! ```ignore
//! use edgefirst_radarstream::{
//!     decoder::{RecordFormat, decode_line},
//!     sector::SectorAccumulator,
//! };
//!
//! let mut acc = SectorAccumulator::new();
//! for line in lines {
//!     if let Some(ret) = decode_line(&line, RecordFormat::Csv)? {
//!         if let Some(frame) = acc.push(ret) {
//!             // Sector complete
//!             println!("sector {}: {} returns", frame.sector_index, frame.len());
//!         }
//!     }
//! }
//! if let Some(frame) = acc.finish() {
//!     // Trailing partial sector
//! }
//! ```

pub mod decoder;
pub mod display;
pub mod lidar;
pub mod line_source;
pub mod pacing;
pub mod pcd;
pub mod playback;
pub mod producer;
pub mod queue;
pub mod radar;
pub mod recorder;
pub mod sector;

// Re-exports for convenience
pub use display::{DisplayLoop, FrameConsumer};
pub use lidar::{LidarFrame, Points};
pub use line_source::{LineSource, ProcessSource, ScriptedSource};
pub use playback::{PlaybackCommand, PlaybackController, PlaybackState, PlayerState, Seek};
pub use queue::{OverflowPolicy, Push, QueueCapacities, QueueReceiver, QueueSender};
pub use radar::{Error, Return, SectorFrame, SourceMode};
pub use sector::SectorAccumulator;
