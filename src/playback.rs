// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Playback state shared between the controller and the producers.
//!
//! [`PlaybackState`] is a set of independent atomics. The
//! [`PlaybackController`] writes the command fields (pause, seek, shutdown)
//! and the directory producer writes the end-of-file index advance. Readers
//! poll the fields every iteration and tolerate seeing an update one poll
//! late; no operation updates more than one field as a unit.
//!
//! ```text
//!              enumerate (>= 1 file)        toggle_pause
//!   Stopped ───────────────────────► Playing ◄──────────► Paused
//!      ▲                                │                    │
//!      └────────────── shutdown ────────┴────────────────────┘
//! ```

use crate::radar::{Error, SourceMode};
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};
use tracing::{debug, info};

/// Step used by the relative seek commands.
pub const SEEK_STEP: isize = 5;

/// Playback state machine position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerState {
    Stopped,
    Playing,
    Paused,
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PlayerState::Stopped => write!(f, "Stopped"),
            PlayerState::Playing => write!(f, "Playing"),
            PlayerState::Paused => write!(f, "Paused"),
        }
    }
}

/// Seek target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Seek {
    Absolute(usize),
    Relative(isize),
}

/// Snapshot for progress displays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub current_file_index: usize,
    pub total_files: usize,
    pub state: PlayerState,
}

/// Shared playback flags.
#[derive(Debug)]
pub struct PlaybackState {
    mode: SourceMode,
    current_file_index: AtomicUsize,
    total_files: AtomicUsize,
    paused: AtomicBool,
    running: AtomicBool,
    terminated: AtomicBool,
}

impl PlaybackState {
    pub fn new(mode: SourceMode) -> Self {
        Self {
            mode,
            current_file_index: AtomicUsize::new(0),
            total_files: AtomicUsize::new(0),
            paused: AtomicBool::new(false),
            running: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
        }
    }

    pub fn mode(&self) -> SourceMode {
        self.mode
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    #[inline]
    pub fn current_file_index(&self) -> usize {
        self.current_file_index.load(Ordering::Acquire)
    }

    #[inline]
    pub fn total_files(&self) -> usize {
        self.total_files.load(Ordering::Acquire)
    }

    pub fn state(&self) -> PlayerState {
        if !self.is_running() {
            PlayerState::Stopped
        } else if self.is_paused() {
            PlayerState::Paused
        } else {
            PlayerState::Playing
        }
    }

    pub fn progress(&self) -> Progress {
        Progress {
            current_file_index: self.current_file_index(),
            total_files: self.total_files(),
            state: self.state(),
        }
    }

    /// Advance past a file that finished playing, wrapping to the first file
    /// after the last.
    ///
    /// Only moves the index if it still points at `finished`; a seek that
    /// landed while the file was playing wins. Returns the index to play
    /// next.
    pub fn advance_from(&self, finished: usize) -> usize {
        let total = self.total_files();
        let next = if finished + 1 >= total { 0 } else { finished + 1 };

        match self.current_file_index.compare_exchange(
            finished,
            next,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                if next == 0 {
                    debug!("playback wrapped to first file");
                }
                next
            }
            Err(sought) => sought,
        }
    }
}

/// Writes playback commands into a shared [`PlaybackState`].
///
/// Cheap to clone; every clone drives the same state.
#[derive(Clone, Debug)]
pub struct PlaybackController {
    state: Arc<PlaybackState>,
}

impl PlaybackController {
    pub fn new(mode: SourceMode) -> Self {
        Self {
            state: Arc::new(PlaybackState::new(mode)),
        }
    }

    /// Handle given to producers and consumers.
    pub fn state(&self) -> Arc<PlaybackState> {
        self.state.clone()
    }

    pub fn player_state(&self) -> PlayerState {
        self.state.state()
    }

    /// Start a stream source (live or single file). No-op once shut down.
    pub fn start(&self) -> Result<(), Error> {
        self.ensure_not_terminated()?;
        self.state.running.store(true, Ordering::Release);
        Ok(())
    }

    /// List the playable files of `directory` with the given extension,
    /// sorted by name, and start playing from the first.
    ///
    /// An empty listing leaves playback stopped and returns
    /// [`Error::SourceExhausted`].
    pub fn enumerate(&self, directory: &Path, extension: &str) -> Result<Vec<PathBuf>, Error> {
        self.ensure_not_terminated()?;

        let mut files: Vec<PathBuf> = std::fs::read_dir(directory)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
            })
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(Error::SourceExhausted(format!(
                "no *.{} files in {}",
                extension,
                directory.display()
            )));
        }

        info!(
            "found {} files in {}",
            files.len(),
            directory.display()
        );
        self.load(files.len());
        Ok(files)
    }

    /// Start directory playback over `total` already-listed files.
    pub(crate) fn load(&self, total: usize) {
        self.state.total_files.store(total, Ordering::Release);
        self.state.current_file_index.store(0, Ordering::Release);
        self.state.running.store(total > 0, Ordering::Release);
    }

    pub fn toggle_pause(&self) -> PlayerState {
        if self.state.is_running() {
            let paused = !self.state.is_paused();
            self.state.paused.store(paused, Ordering::Release);
            debug!("playback {}", if paused { "paused" } else { "resumed" });
        }
        self.state.state()
    }

    /// Move to another file, clamped to the listing. Returns the new index.
    ///
    /// Ignored while stopped. A paused directory producer re-decodes the
    /// selected file immediately; a playing one abandons its current file.
    pub fn seek(&self, target: Seek) -> usize {
        let current = self.state.current_file_index();
        let total = self.state.total_files();
        if !self.state.is_running() || total == 0 {
            return current;
        }

        let last = total - 1;
        let index = match target {
            Seek::Absolute(index) => index.min(last),
            Seek::Relative(delta) => current.saturating_add_signed(delta).min(last),
        };

        if index != current {
            self.state.current_file_index.store(index, Ordering::Release);
            debug!("seek {:?}: {} -> {}", target, current, index);
        }
        index
    }

    /// Stop every producer. Terminal.
    pub fn shutdown(&self) {
        self.state.terminated.store(true, Ordering::Release);
        self.state.running.store(false, Ordering::Release);
        info!("playback shutdown requested");
    }

    /// Apply a command from the UI.
    pub fn apply(&self, command: PlaybackCommand) {
        match command {
            PlaybackCommand::TogglePause => {
                self.toggle_pause();
            }
            PlaybackCommand::Seek(target) => {
                self.seek(target);
            }
            PlaybackCommand::Shutdown => self.shutdown(),
        }
    }

    fn ensure_not_terminated(&self) -> Result<(), Error> {
        if self.state.terminated.load(Ordering::Acquire) {
            return Err(Error::Config("playback has been shut down".to_string()));
        }
        Ok(())
    }
}

/// Commands the UI layer can issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackCommand {
    TogglePause,
    Seek(Seek),
    Shutdown,
}

impl FromStr for PlaybackCommand {
    type Err = Error;

    /// Parse the text command set: `space`/`pause`, `left`, `right`,
    /// `seek <index>`, `seek +N`/`seek -N`, `quit`/`q`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let command = words.next().unwrap_or("").to_ascii_lowercase();

        let parsed = match command.as_str() {
            "space" | "pause" | "p" => PlaybackCommand::TogglePause,
            "left" => PlaybackCommand::Seek(Seek::Relative(-SEEK_STEP)),
            "right" => PlaybackCommand::Seek(Seek::Relative(SEEK_STEP)),
            "quit" | "q" | "exit" => PlaybackCommand::Shutdown,
            "seek" => {
                let arg = words
                    .next()
                    .ok_or_else(|| Error::Parse("seek needs a target".to_string()))?;
                let invalid = || Error::Parse(format!("invalid seek target: {:?}", arg));
                if arg.starts_with('+') || arg.starts_with('-') {
                    PlaybackCommand::Seek(Seek::Relative(arg.parse().map_err(|_| invalid())?))
                } else {
                    PlaybackCommand::Seek(Seek::Absolute(arg.parse().map_err(|_| invalid())?))
                }
            }
            _ => return Err(Error::Parse(format!("unknown command: {:?}", s.trim()))),
        };

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory_controller(total: usize) -> PlaybackController {
        let ctl = PlaybackController::new(SourceMode::Directory);
        ctl.load(total);
        ctl
    }

    #[test]
    fn test_initial_state_stopped() {
        let ctl = PlaybackController::new(SourceMode::Directory);
        assert_eq!(ctl.player_state(), PlayerState::Stopped);
        // Commands are ignored while stopped
        assert_eq!(ctl.toggle_pause(), PlayerState::Stopped);
        assert_eq!(ctl.seek(Seek::Absolute(3)), 0);
    }

    #[test]
    fn test_toggle_pause() {
        let ctl = directory_controller(3);
        assert_eq!(ctl.player_state(), PlayerState::Playing);
        assert_eq!(ctl.toggle_pause(), PlayerState::Paused);
        assert_eq!(ctl.toggle_pause(), PlayerState::Playing);
    }

    #[test]
    fn test_seek_clamped() {
        let ctl = directory_controller(50);
        assert_eq!(ctl.seek(Seek::Relative(-100)), 0);
        assert_eq!(ctl.seek(Seek::Relative(1000)), 49);
        assert_eq!(ctl.seek(Seek::Absolute(500)), 49);
        assert_eq!(ctl.seek(Seek::Absolute(10)), 10);
        assert_eq!(ctl.seek(Seek::Relative(-SEEK_STEP)), 5);
        assert_eq!(ctl.state().current_file_index(), 5);
    }

    #[test]
    fn test_seek_while_paused() {
        let ctl = directory_controller(20);
        ctl.toggle_pause();
        assert_eq!(ctl.seek(Seek::Relative(SEEK_STEP)), 5);
        assert_eq!(ctl.player_state(), PlayerState::Paused);
    }

    #[test]
    fn test_advance_wraps() {
        let ctl = directory_controller(3);
        let state = ctl.state();
        assert_eq!(state.advance_from(0), 1);
        assert_eq!(state.advance_from(1), 2);
        assert_eq!(state.advance_from(2), 0);
        assert_eq!(state.current_file_index(), 0);
    }

    #[test]
    fn test_advance_loses_to_seek() {
        let ctl = directory_controller(10);
        let state = ctl.state();
        // Producer is playing file 0 when the user seeks to 7
        ctl.seek(Seek::Absolute(7));
        assert_eq!(state.advance_from(0), 7);
        assert_eq!(state.current_file_index(), 7);
    }

    #[test]
    fn test_shutdown_terminal() {
        let ctl = directory_controller(4);
        ctl.toggle_pause();
        ctl.shutdown();
        assert_eq!(ctl.player_state(), PlayerState::Stopped);
        assert!(ctl.start().is_err());
        assert_eq!(ctl.toggle_pause(), PlayerState::Stopped);
    }

    #[test]
    fn test_enumerate_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.md"), "x").unwrap();

        let ctl = PlaybackController::new(SourceMode::Directory);
        let res = ctl.enumerate(dir.path(), "txt");
        assert!(matches!(res, Err(Error::SourceExhausted(_))));
        assert_eq!(ctl.player_state(), PlayerState::Stopped);
    }

    #[test]
    fn test_enumerate_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["radar_data_00003.txt", "radar_data_00001.txt", "radar_data_00002.TXT"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.txt")).unwrap();

        let ctl = PlaybackController::new(SourceMode::Directory);
        let files = ctl.enumerate(dir.path(), "txt").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["radar_data_00001.txt", "radar_data_00002.TXT", "radar_data_00003.txt"]
        );
        assert_eq!(ctl.player_state(), PlayerState::Playing);
        assert_eq!(ctl.state().total_files(), 3);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("space".parse::<PlaybackCommand>().unwrap(), PlaybackCommand::TogglePause);
        assert_eq!(
            "left".parse::<PlaybackCommand>().unwrap(),
            PlaybackCommand::Seek(Seek::Relative(-5))
        );
        assert_eq!(
            "RIGHT".parse::<PlaybackCommand>().unwrap(),
            PlaybackCommand::Seek(Seek::Relative(5))
        );
        assert_eq!(
            "seek 12".parse::<PlaybackCommand>().unwrap(),
            PlaybackCommand::Seek(Seek::Absolute(12))
        );
        assert_eq!(
            "seek -3".parse::<PlaybackCommand>().unwrap(),
            PlaybackCommand::Seek(Seek::Relative(-3))
        );
        assert_eq!("q".parse::<PlaybackCommand>().unwrap(), PlaybackCommand::Shutdown);
        assert!("seek".parse::<PlaybackCommand>().is_err());
        assert!("seek x".parse::<PlaybackCommand>().is_err());
        assert!("jump".parse::<PlaybackCommand>().is_err());
    }

    #[test]
    fn test_apply() {
        let ctl = directory_controller(30);
        ctl.apply(PlaybackCommand::Seek(Seek::Absolute(20)));
        ctl.apply(PlaybackCommand::TogglePause);
        assert_eq!(
            ctl.state().progress(),
            Progress {
                current_file_index: 20,
                total_files: 30,
                state: PlayerState::Paused,
            }
        );
        ctl.apply(PlaybackCommand::Shutdown);
        assert_eq!(ctl.player_state(), PlayerState::Stopped);
    }
}
