// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Bounded, load-shedding frame queue.
//!
//! Producers must never block on the display. A [`QueueSender`] therefore
//! never waits: when the queue is full the configured [`OverflowPolicy`]
//! decides which frame is lost, and the loss is reported back to the
//! producer and counted in [`QueueStats`].
//!
//! ```text
//!  producer ──push──► [ f0 f1 f2 ... fN-1 ] ──drain──► consumer
//!                      full? drop newest (default) or evict oldest
//! ```
//!
//! The queue is a [`kanal`] bounded channel. The consumer side drains every
//! queued item once per display tick.

use crate::radar::Error;
use clap::ValueEnum;
use kanal::{Receiver, Sender};
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use tracing::{trace, warn};

/// What to do with a frame that arrives while the queue is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OverflowPolicy {
    /// Drop the incoming frame and keep the backlog.
    #[default]
    DropNewest,
    /// Evict the oldest queued frame to make room for the incoming one.
    DropOldest,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OverflowPolicy::DropNewest => write!(f, "drop-newest"),
            OverflowPolicy::DropOldest => write!(f, "drop-oldest"),
        }
    }
}

/// Outcome of a non-blocking push.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Push {
    /// Frame was queued.
    Accepted,
    /// Queue was full; the incoming frame was dropped.
    Dropped,
    /// Queue was full; the oldest frame was dropped and the incoming one
    /// queued.
    Evicted,
}

impl Push {
    /// True when a frame was lost to overflow.
    pub fn is_overflow(&self) -> bool {
        !matches!(self, Push::Accepted)
    }
}

/// Per-queue counters shared between both handles.
#[derive(Debug, Default)]
pub struct QueueStats {
    accepted: AtomicU64,
    dropped: AtomicU64,
}

impl QueueStats {
    /// Frames queued since creation.
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Frames lost to overflow since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Queue capacities per source.
///
/// The defaults are the capacities the viewer shipped with. They are
/// tunables, not derived limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueCapacities {
    pub live: usize,
    pub file: usize,
    pub directory: usize,
    pub lidar: usize,
}

impl Default for QueueCapacities {
    fn default() -> Self {
        Self {
            live: 10,
            file: 10,
            directory: 36,
            lidar: 128,
        }
    }
}

impl QueueCapacities {
    /// Radar queue capacity for a source mode.
    pub fn radar(&self, mode: crate::radar::SourceMode) -> usize {
        use crate::radar::SourceMode;
        match mode {
            SourceMode::Live => self.live,
            SourceMode::File => self.file,
            SourceMode::Directory => self.directory,
        }
    }
}

/// Create a bounded queue returning the producer and consumer handles.
///
/// Capacity must be at least one.
pub fn bounded<T>(
    name: &str,
    capacity: usize,
    policy: OverflowPolicy,
) -> Result<(QueueSender<T>, QueueReceiver<T>), Error> {
    if capacity == 0 {
        return Err(Error::Config(format!(
            "queue {} capacity must be at least 1",
            name
        )));
    }

    let (tx, rx) = kanal::bounded(capacity);
    let stats = Arc::new(QueueStats::default());
    let name: Arc<str> = Arc::from(name);

    let sender = QueueSender {
        tx,
        evict: rx.clone(),
        policy,
        capacity,
        stats: stats.clone(),
        name: name.clone(),
    };
    let receiver = QueueReceiver {
        rx,
        capacity,
        stats,
        name,
    };

    Ok((sender, receiver))
}

/// Producer handle. Cloneable; pushes never block.
pub struct QueueSender<T> {
    tx: Sender<T>,
    // Only used by DropOldest to make room.
    evict: Receiver<T>,
    policy: OverflowPolicy,
    capacity: usize,
    stats: Arc<QueueStats>,
    name: Arc<str>,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            evict: self.evict.clone(),
            policy: self.policy,
            capacity: self.capacity,
            stats: self.stats.clone(),
            name: self.name.clone(),
        }
    }
}

impl<T> QueueSender<T> {
    /// Queue a frame without blocking.
    pub fn push(&self, item: T) -> Push {
        let mut slot = Some(item);

        if self.try_push(&mut slot) {
            self.stats.accepted.fetch_add(1, Ordering::Relaxed);
            return Push::Accepted;
        }

        let outcome = match self.policy {
            OverflowPolicy::DropNewest => Push::Dropped,
            OverflowPolicy::DropOldest => {
                // Another producer may refill the slot between the eviction
                // and the retry; then the incoming frame is the one lost.
                let evicted = matches!(self.evict.try_recv(), Ok(Some(_)));
                if evicted && self.try_push(&mut slot) {
                    self.stats.accepted.fetch_add(1, Ordering::Relaxed);
                    Push::Evicted
                } else {
                    Push::Dropped
                }
            }
        };

        self.stats.dropped.fetch_add(1, Ordering::Relaxed);
        warn!(
            queue = %self.name,
            capacity = self.capacity,
            dropped = self.stats.dropped(),
            "queue full, {}",
            match outcome {
                Push::Evicted => "dropped oldest frame",
                _ => "dropped incoming frame",
            }
        );
        outcome
    }

    fn try_push(&self, slot: &mut Option<T>) -> bool {
        match self.tx.try_send_option(slot) {
            Ok(sent) => sent,
            Err(e) => {
                trace!(queue = %self.name, "push on closed queue: {:?}", e);
                false
            }
        }
    }

    /// Number of frames currently queued.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }
}

/// Consumer handle.
pub struct QueueReceiver<T> {
    rx: Receiver<T>,
    capacity: usize,
    stats: Arc<QueueStats>,
    name: Arc<str>,
}

impl<T> QueueReceiver<T> {
    /// Remove every frame currently queued, oldest first.
    ///
    /// Frames pushed while draining are left for the next call, so one drain
    /// takes at most `capacity` frames plus what raced in.
    pub fn drain(&self) -> Vec<T> {
        let mut items = Vec::with_capacity(self.rx.len());
        while let Ok(Some(item)) = self.rx.try_recv() {
            items.push(item);
            if items.len() >= self.capacity * 2 {
                break;
            }
        }
        items
    }

    /// Take the oldest queued frame, if any.
    pub fn try_pop(&self) -> Option<T> {
        self.rx.try_recv().ok().flatten()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }
}
