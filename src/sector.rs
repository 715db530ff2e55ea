// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Sector accumulator.
//!
//! Groups consecutive returns into 30° sector frames. A frame is emitted when
//! the sweep leaves a sector whose buffer holds data; whatever is still
//! buffered when the stream ends is emitted once by
//! [`SectorAccumulator::finish`].
//!
//! ```text
//!  azimuth:  5   10   35   40   65  <end>
//!  sector:   0    0    1    1    2
//!                      │         │    │
//!                      ▼         ▼    ▼
//!  emitted:      [5,10]@0  [35,40]@1  [65]@2
//! ```

use crate::radar::{Return, SectorFrame, SECTOR_COUNT};
use std::time::Instant;

/// Per-sector buffers with a cursor on the sector currently being swept.
#[derive(Debug)]
pub struct SectorAccumulator {
    buffers: [Vec<Return>; SECTOR_COUNT],
    current_sector: usize,
}

impl SectorAccumulator {
    pub fn new() -> Self {
        Self {
            buffers: Default::default(),
            current_sector: 0,
        }
    }

    /// Sector of the most recent return.
    pub fn current_sector(&self) -> usize {
        self.current_sector
    }

    /// Number of returns buffered across all sectors.
    pub fn buffered(&self) -> usize {
        self.buffers.iter().map(Vec::len).sum()
    }

    /// Add a return, emitting the outgoing sector's frame when the sweep
    /// crosses into a new sector.
    pub fn push(&mut self, ret: Return) -> Option<SectorFrame> {
        let sector = ret.sector();

        let emitted = if sector != self.current_sector {
            self.take(self.current_sector)
        } else {
            None
        };

        self.buffers[sector].push(ret);
        self.current_sector = sector;
        emitted
    }

    /// Flush the buffered sector at end of stream.
    ///
    /// Returns `None` once everything has been emitted, so calling this more
    /// than once never duplicates data.
    pub fn finish(&mut self) -> Option<SectorFrame> {
        if let Some(frame) = self.take(self.current_sector) {
            return Some(frame);
        }

        // Normally only the cursor's buffer holds data
        (0..SECTOR_COUNT).find_map(|sector| self.take(sector))
    }

    /// Discard everything buffered and move the cursor back to sector 0.
    pub fn reset(&mut self) {
        for buffer in &mut self.buffers {
            buffer.clear();
        }
        self.current_sector = 0;
    }

    fn take(&mut self, sector: usize) -> Option<SectorFrame> {
        if self.buffers[sector].is_empty() {
            return None;
        }

        Some(SectorFrame {
            sector_index: sector,
            returns: std::mem::take(&mut self.buffers[sector]),
            received_time: Instant::now(),
        })
    }
}

impl Default for SectorAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
