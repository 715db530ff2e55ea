// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Frame producers.
//!
//! Each producer runs on its own thread and talks to the rest of the system
//! only through its output queue and the shared [`PlaybackState`]:
//!
//! ```text
//!  decoder process ──► run_stream ────┐
//!  *.txt directory ──► run_directory ─┼──► QueueSender<SectorFrame>
//!  *.pcd directory ──► run_lidar ─────┴──► QueueSender<LidarFrame>
//! ```
//!
//! Producers check `running` at the top of every iteration and before every
//! blocking read, never block on a push, and flush buffered returns when
//! their stream ends.

use crate::{
    decoder::{RecordFormat, decode_line},
    lidar::LidarFrame,
    line_source::LineSource,
    pacing::Pacing,
    pcd::read_frame,
    playback::PlaybackState,
    queue::QueueSender,
    radar::{Error, SectorFrame},
    sector::SectorAccumulator,
};
use std::{
    fs::File,
    io::{BufRead as _, BufReader, Lines},
    path::PathBuf,
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};
use tracing::{debug, error, info, info_span, trace, warn};

/// Default interval at which idle or paused producers re-check the state.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Counters reported by a producer when it exits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProducerStats {
    /// Lines read from the source
    pub lines: u64,
    /// Lines skipped as malformed
    pub parse_errors: u64,
    /// Frames accepted by the queue
    pub frames: u64,
    /// Frames lost to queue overflow
    pub dropped: u64,
    /// Files or frame files that could not be read
    pub io_errors: u64,
}

impl ProducerStats {
    fn record_push(&mut self, outcome: crate::queue::Push) {
        use crate::queue::Push;
        match outcome {
            Push::Accepted => self.frames += 1,
            Push::Dropped => self.dropped += 1,
            Push::Evicted => {
                self.frames += 1;
                self.dropped += 1;
            }
        }
    }
}

/// Decode one line into the accumulator and queue any completed frame.
fn ingest_line(
    line: &str,
    format: RecordFormat,
    acc: &mut SectorAccumulator,
    queue: &QueueSender<SectorFrame>,
    stats: &mut ProducerStats,
) {
    stats.lines += 1;
    match decode_line(line, format) {
        Ok(Some(ret)) => {
            if let Some(frame) = acc.push(ret) {
                stats.record_push(queue.push(frame));
            }
        }
        Ok(None) => {}
        Err(e) => {
            stats.parse_errors += 1;
            trace!("skipping line: {}", e);
        }
    }
}

fn flush(acc: &mut SectorAccumulator, queue: &QueueSender<SectorFrame>, stats: &mut ProducerStats) {
    if let Some(frame) = acc.finish() {
        stats.record_push(queue.push(frame));
    }
}

/// Options for [`run_stream`].
#[derive(Clone, Copy, Debug)]
pub struct StreamOptions {
    /// Record layout of the source lines
    pub format: RecordFormat,
    /// Upper bound on a blocking read before `running` is re-checked
    pub poll_interval: Duration,
    /// Stop reading while paused (file replay); live feeds ignore pause
    pub pausable: bool,
    /// Return when the source ends instead of idling until shutdown
    pub exit_on_end: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            format: RecordFormat::Csv,
            poll_interval: DEFAULT_POLL_INTERVAL,
            pausable: false,
            exit_on_end: false,
        }
    }
}

/// Stream producer for the live and single-file modes.
///
/// Reads lines from `source` until shutdown. When the source ends (the
/// decoder exited or finished the file) the buffered sector is flushed and
/// the queue simply stops receiving data; that is a stall, not an error. On
/// return the source has been stopped.
pub async fn run_stream<S: LineSource>(
    mut source: S,
    queue: QueueSender<SectorFrame>,
    state: Arc<PlaybackState>,
    options: StreamOptions,
) -> ProducerStats {
    let mut acc = SectorAccumulator::new();
    let mut stats = ProducerStats::default();
    let mut ended = false;

    while state.is_running() {
        if ended || (options.pausable && state.is_paused()) {
            if ended && options.exit_on_end {
                break;
            }
            tokio::time::sleep(options.poll_interval).await;
            continue;
        }

        match tokio::time::timeout(options.poll_interval, source.next_line()).await {
            // Nothing within the poll interval; re-check running
            Err(_) => continue,
            Ok(Ok(Some(line))) => ingest_line(&line, options.format, &mut acc, &queue, &mut stats),
            Ok(Ok(None)) => {
                flush(&mut acc, &queue, &mut stats);
                warn!(
                    "radar source ended after {} lines, queue will stall",
                    stats.lines
                );
                ended = true;
            }
            Ok(Err(e)) => {
                warn!("radar source read error: {}", e);
                if !source.has_more() {
                    flush(&mut acc, &queue, &mut stats);
                    ended = true;
                }
            }
        }
    }

    flush(&mut acc, &queue, &mut stats);
    source.stop().await;
    info!(
        "stream producer exiting: {} lines, {} frames, {} dropped, {} parse errors",
        stats.lines, stats.frames, stats.dropped, stats.parse_errors
    );
    stats
}

/// How a pass over one file ended.
#[derive(Debug, PartialEq, Eq)]
enum FileOutcome {
    /// Every line was read
    Completed,
    /// Paused mid-file; the reader is kept so resume continues from here
    Paused,
    /// The file could not be opened
    Unreadable,
    /// A seek or shutdown was observed mid-file
    Interrupted,
}

/// Directory producer.
///
/// Plays `files` starting at the state's current index, advancing and
/// wrapping at end of each file. Pausing keeps the reader and the partial
/// sector, so resume continues mid-file without repeating frames. While
/// paused, a seek triggers an immediate, unpaced decode of exactly the
/// selected file so the display shows the new position without resuming.
pub struct DirectoryProducer {
    files: Vec<PathBuf>,
    queue: QueueSender<SectorFrame>,
    state: Arc<PlaybackState>,
    pacing: Pacing,
    poll_interval: Duration,
    acc: SectorAccumulator,
    // File being played, kept open across a pause
    reader: Option<(usize, Lines<BufReader<File>>)>,
    stats: ProducerStats,
}

impl DirectoryProducer {
    pub fn new(
        files: Vec<PathBuf>,
        queue: QueueSender<SectorFrame>,
        state: Arc<PlaybackState>,
        pacing: Pacing,
    ) -> Self {
        Self {
            files,
            queue,
            state,
            pacing,
            poll_interval: DEFAULT_POLL_INTERVAL,
            acc: SectorAccumulator::new(),
            reader: None,
            stats: ProducerStats::default(),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn stats(&self) -> ProducerStats {
        self.stats
    }

    /// Run until shutdown.
    pub fn run(mut self) -> Result<ProducerStats, Error> {
        if self.files.is_empty() {
            return Err(Error::SourceExhausted("no files to play".to_string()));
        }

        // File the display currently shows; a paused seek away from it
        // triggers the isolated decode.
        let mut shown: Option<usize> = None;
        let mut failed_in_row = 0;

        while self.state.is_running() {
            let index = self.state.current_file_index().min(self.files.len() - 1);

            if self.state.is_paused() {
                if shown != Some(index) {
                    self.reader = None;
                    self.decode_selected(index);
                    shown = Some(index);
                }
                thread::sleep(self.poll_interval);
                continue;
            }

            let started = Instant::now();
            match self.play_file(index) {
                FileOutcome::Completed => {
                    failed_in_row = 0;
                    let next = self.state.advance_from(index);
                    // A seek that won the advance has not been shown yet
                    shown = (next == (index + 1) % self.files.len()).then_some(next);
                    self.pacing.after_unit(started);
                }
                FileOutcome::Paused => shown = Some(index),
                FileOutcome::Unreadable => {
                    failed_in_row += 1;
                    if failed_in_row == self.files.len() {
                        warn!("no file in the listing is readable, retrying");
                    }
                    self.state.advance_from(index);
                    thread::sleep(self.poll_interval);
                }
                FileOutcome::Interrupted => {}
            }
        }

        flush(&mut self.acc, &self.queue, &mut self.stats);
        info!(
            "directory producer exiting: {} lines, {} frames, {} dropped, {} parse errors",
            self.stats.lines, self.stats.frames, self.stats.dropped, self.stats.parse_errors
        );
        Ok(self.stats)
    }

    fn open(&mut self, index: usize) -> Option<BufReader<File>> {
        let path = &self.files[index];
        match File::open(path) {
            Ok(file) => Some(BufReader::new(file)),
            Err(e) => {
                self.stats.io_errors += 1;
                error!("skipping {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Paced sequential playback of one file, resuming a paused reader.
    fn play_file(&mut self, index: usize) -> FileOutcome {
        let _span = info_span!("play_file", index).entered();

        let mut lines = match self.reader.take() {
            Some((held, lines)) if held == index => lines,
            _ => {
                self.acc.reset();
                match self.open(index) {
                    Some(reader) => reader.lines(),
                    None => return FileOutcome::Unreadable,
                }
            }
        };

        loop {
            if !self.state.is_running() {
                return FileOutcome::Interrupted;
            }
            if self.state.current_file_index() != index {
                debug!("seek observed, abandoning file {}", index);
                self.acc.reset();
                return FileOutcome::Interrupted;
            }
            if self.state.is_paused() {
                self.reader = Some((index, lines));
                return FileOutcome::Paused;
            }

            match lines.next() {
                None => break,
                Some(Ok(line)) => ingest_line(
                    &line,
                    RecordFormat::Whitespace,
                    &mut self.acc,
                    &self.queue,
                    &mut self.stats,
                ),
                Some(Err(e)) => {
                    self.stats.io_errors += 1;
                    error!("read error in {}: {}", self.files[index].display(), e);
                    break;
                }
            }
            self.pacing.after_line();
        }

        flush(&mut self.acc, &self.queue, &mut self.stats);
        FileOutcome::Completed
    }

    /// Unpaced decode of exactly one file while paused.
    fn decode_selected(&mut self, index: usize) {
        let _span = info_span!("decode_selected", index).entered();
        self.acc.reset();

        let Some(reader) = self.open(index) else {
            return;
        };

        for line in reader.lines() {
            if !self.state.is_running() {
                break;
            }
            match line {
                Ok(line) => ingest_line(
                    &line,
                    RecordFormat::Whitespace,
                    &mut self.acc,
                    &self.queue,
                    &mut self.stats,
                ),
                Err(e) => {
                    self.stats.io_errors += 1;
                    error!("read error in {}: {}", self.files[index].display(), e);
                    break;
                }
            }
        }

        flush(&mut self.acc, &self.queue, &mut self.stats);
    }
}

/// LiDAR producer.
///
/// Reads `frames` in order, looping back to the first frame after the last,
/// one frame per pacing budget. Unreadable frames are logged and skipped.
pub fn run_lidar(
    frames: Vec<(u64, PathBuf)>,
    queue: QueueSender<LidarFrame>,
    state: Arc<PlaybackState>,
    pacing: Pacing,
    poll_interval: Duration,
) -> Result<ProducerStats, Error> {
    if frames.is_empty() {
        return Err(Error::SourceExhausted("no LiDAR frames to play".to_string()));
    }

    let mut stats = ProducerStats::default();

    'outer: while state.is_running() {
        for (index, path) in &frames {
            while state.is_paused() {
                if !state.is_running() {
                    break 'outer;
                }
                thread::sleep(poll_interval);
            }
            if !state.is_running() {
                break 'outer;
            }

            let started = Instant::now();
            match read_frame(path, *index) {
                Ok(frame) => {
                    trace!("frame {}: {} points", index, frame.len());
                    stats.record_push(queue.push(frame));
                }
                Err(e) => {
                    stats.io_errors += 1;
                    error!("skipping LiDAR frame {}: {}", path.display(), e);
                }
            }
            pacing.after_unit(started);
        }
    }

    info!(
        "lidar producer exiting: {} frames, {} dropped, {} unreadable",
        stats.frames, stats.dropped, stats.io_errors
    );
    Ok(stats)
}

/// Spawn a named producer thread.
pub fn spawn_named<F, T>(name: &str, f: F) -> Result<JoinHandle<T>, Error>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    Ok(thread::Builder::new().name(name.to_string()).spawn(f)?)
}

/// Spawn [`run_stream`] on its own thread with a current-thread runtime.
///
/// `start` builds the line source inside the runtime, so process sources can
/// register with its reactor.
pub fn spawn_stream<S, F>(
    name: &str,
    start: F,
    queue: QueueSender<SectorFrame>,
    state: Arc<PlaybackState>,
    options: StreamOptions,
) -> Result<JoinHandle<Result<ProducerStats, Error>>, Error>
where
    S: LineSource + 'static,
    F: FnOnce() -> Result<S, Error> + Send + 'static,
{
    spawn_named(name, move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        rt.block_on(async move {
            let source = match start() {
                Ok(source) => source,
                Err(e) => {
                    // A decoder that cannot start is a stall for the display,
                    // not a crash.
                    error!("radar source failed to start: {}", e);
                    return Err(e);
                }
            };
            Ok(run_stream(source, queue, state, options).await)
        })
    })
}
