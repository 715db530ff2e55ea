// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Line source abstraction for the external decoder.
//!
//! The radar decoder is a separate native process that prints one record per
//! line on its standard output. This module provides a [`LineSource`] trait
//! that hides the process behind a narrow start / next line / stop interface,
//! enabling:
//!
//! - **Live operation**: [`ProcessSource`] spawns the decoder on a multicast
//!   address and streams its output
//! - **File replay**: the same decoder replaying a recording
//! - **Testing**: [`ScriptedSource`] replays pre-defined lines
//!
//! # Example
//!
//! ```ignore
//! use edgefirst_radarstream::line_source::{LineSource, ProcessSource};
//!
//! let mut source = ProcessSource::spawn("./src/SPxLiveStream", ["-a", "239.192.43.79"])?;
//! while let Some(line) = source.next_line().await? {
//!     // decode line
//! }
//! source.stop().await;
//! ```

use crate::radar::Error;
use std::{
    ffi::OsStr,
    future::Future,
    pin::Pin,
    process::Stdio,
    time::Duration,
};
use tokio::{
    io::{AsyncBufReadExt as _, BufReader},
    process::{Child, ChildStdout, Command},
};
use tracing::{debug, info, warn};

/// Default time given to the decoder to exit after a terminate request.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(1);

/// Trait for line sources.
pub trait LineSource: Send {
    /// Read the next line, without its terminator.
    ///
    /// # Returns
    /// - `Ok(Some(line))` - next line
    /// - `Ok(None)` - the source has ended
    /// - `Err` - I/O error
    ///
    /// Dropping the future before it completes loses no data; the partial
    /// line is kept for the next call.
    fn next_line<'a>(
        &'a mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, Error>> + Send + 'a>>;

    /// Check if more lines may arrive.
    fn has_more(&self) -> bool;

    /// Release the source. For processes this requests a graceful exit and
    /// waits a bounded time for it.
    fn stop<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// Decoder process source.
///
/// Standard error is drained in the background and logged at debug level so
/// a chatty decoder can never fill its pipe and stall.
pub struct ProcessSource {
    child: Child,
    stdout: BufReader<ChildStdout>,
    partial: Vec<u8>,
    finished: bool,
    stop_timeout: Duration,
    program: String,
}

impl ProcessSource {
    /// Spawn `program` with `args`. Must be called within a tokio runtime.
    pub fn spawn<I, S>(program: &str, args: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Process(format!("failed to start {}: {}", program, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Process(format!("{} has no stdout pipe", program)))?;

        if let Some(stderr) = child.stderr.take() {
            let name = program.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(decoder = %name, "stderr: {}", line);
                }
            });
        }

        info!("started decoder {} (pid {:?})", program, child.id());

        Ok(Self {
            child,
            stdout: BufReader::new(stdout),
            partial: Vec::with_capacity(4096),
            finished: false,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            program: program.to_string(),
        })
    }

    /// Set how long [`LineSource::stop`] waits before killing the process.
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// OS process id, `None` once the process has been reaped.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn take_line(&mut self) -> String {
        let mut end = self.partial.len();
        while end > 0 && matches!(self.partial[end - 1], b'\n' | b'\r') {
            end -= 1;
        }
        let line = String::from_utf8_lossy(&self.partial[..end]).into_owned();
        self.partial.clear();
        line
    }

    async fn read_line(&mut self) -> Result<Option<String>, Error> {
        if self.finished {
            return Ok(None);
        }

        let n = self.stdout.read_until(b'\n', &mut self.partial).await?;
        if n == 0 {
            self.finished = true;
            if self.partial.is_empty() {
                return Ok(None);
            }
        }
        Ok(Some(self.take_line()))
    }

    async fn terminate(&mut self) {
        if let Ok(Some(status)) = self.child.try_wait() {
            debug!("decoder {} already exited: {}", self.program, status);
            return;
        }

        request_terminate(&self.child);

        match tokio::time::timeout(self.stop_timeout, self.child.wait()).await {
            Ok(Ok(status)) => info!("decoder {} exited: {}", self.program, status),
            Ok(Err(e)) => warn!("decoder {} wait failed: {}", self.program, e),
            Err(_) => {
                warn!(
                    "decoder {} ignored terminate for {:?}, killing",
                    self.program, self.stop_timeout
                );
                if let Err(e) = self.child.kill().await {
                    warn!("decoder {} kill failed: {}", self.program, e);
                }
            }
        }
    }
}

#[cfg(unix)]
fn request_terminate(child: &Child) {
    if let Some(pid) = child.id() {
        let err = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if err != 0 {
            debug!(
                "SIGTERM to {} failed: {}",
                pid,
                std::io::Error::last_os_error()
            );
        }
    }
}

#[cfg(not(unix))]
fn request_terminate(_child: &Child) {
    // No graceful signal available; the bounded wait falls through to kill.
}

impl LineSource for ProcessSource {
    fn next_line<'a>(
        &'a mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, Error>> + Send + 'a>> {
        Box::pin(self.read_line())
    }

    fn has_more(&self) -> bool {
        !self.finished
    }

    fn stop<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(self.terminate())
    }
}

/// Scripted line source for unit testing.
///
/// Provides a sequence of pre-defined lines for testing ingestion logic
/// without the decoder binary.
pub struct ScriptedSource {
    lines: Vec<String>,
    index: usize,
    stopped: bool,
}

impl ScriptedSource {
    /// Create a new scripted source with the given lines.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            index: 0,
            stopped: false,
        }
    }

    /// Get the number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Get the current index.
    pub fn current_index(&self) -> usize {
        self.index
    }

    /// True once [`LineSource::stop`] has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl LineSource for ScriptedSource {
    fn next_line<'a>(
        &'a mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, Error>> + Send + 'a>> {
        Box::pin(async move {
            if self.stopped || self.index >= self.lines.len() {
                return Ok(None);
            }
            let line = self.lines[self.index].clone();
            self.index += 1;
            Ok(Some(line))
        })
    }

    fn has_more(&self) -> bool {
        !self.stopped && self.index < self.lines.len()
    }

    fn stop<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            self.stopped = true;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_source() {
        let mut source = ScriptedSource::new(["a", "b"]);
        assert!(source.has_more());
        assert_eq!(source.len(), 2);

        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("a"));
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("b"));
        assert!(!source.has_more());
        assert_eq!(source.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_scripted_source_stop() {
        let mut source = ScriptedSource::new(["a", "b"]);
        source.stop().await;
        assert!(source.is_stopped());
        assert!(!source.has_more());
        assert_eq!(source.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_spawn_missing_binary() {
        let res = ProcessSource::spawn("./definitely-not-a-decoder", ["-a", "239.0.0.1"]);
        assert!(matches!(res, Err(Error::Process(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_lines() {
        let mut source = ProcessSource::spawn(
            "sh",
            ["-c", "printf '1,2,3\\r\\n4,5,6\\nno-newline'; echo oops >&2"],
        )
        .unwrap();

        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("1,2,3"));
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("4,5,6"));
        assert_eq!(
            source.next_line().await.unwrap().as_deref(),
            Some("no-newline")
        );
        assert_eq!(source.next_line().await.unwrap(), None);
        assert!(!source.has_more());
        source.stop().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_stop_terminates() {
        let mut source = ProcessSource::spawn("sleep", ["30"])
            .unwrap()
            .with_stop_timeout(Duration::from_secs(2));

        // Nothing is printed; a bounded read times out without losing state
        let res = tokio::time::timeout(Duration::from_millis(50), source.next_line()).await;
        assert!(res.is_err());

        let start = std::time::Instant::now();
        source.stop().await;
        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(source.id().is_none());
    }
}
