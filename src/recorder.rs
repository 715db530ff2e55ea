// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Rotation recorder.
//!
//! Converts a decoder stream into the directory playback format: one file
//! per antenna rotation, named `radar_data_NNNNN.txt` with a 1-based rotation
//! counter, one whitespace record per return. A rotation ends at the north
//! crossing, where the azimuth drops below the previous return's.

use crate::{
    decoder::{RecordFormat, decode_line, encode_whitespace},
    line_source::LineSource,
    playback::PlaybackState,
    radar::{Error, Return},
};
use std::{
    fs::{self, File},
    io::{BufWriter, Write as _},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tracing::{debug, info, trace, warn};

/// File name for a rotation number.
pub fn rotation_file_name(rotation: u32) -> String {
    format!("radar_data_{:05}.txt", rotation)
}

pub struct RotationRecorder {
    out_dir: PathBuf,
    writer: Option<BufWriter<File>>,
    rotation: u32,
    last_azimuth: Option<f32>,
    records: u64,
}

impl RotationRecorder {
    /// Create a recorder writing into `out_dir`, creating it if needed.
    pub fn new(out_dir: &Path) -> Result<Self, Error> {
        fs::create_dir_all(out_dir)?;
        Ok(Self {
            out_dir: out_dir.to_path_buf(),
            writer: None,
            rotation: 0,
            last_azimuth: None,
            records: 0,
        })
    }

    /// Number of rotation files started so far.
    pub fn rotations(&self) -> u32 {
        self.rotation
    }

    /// Records written so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Append one return. Returns true when it started a new rotation file.
    pub fn record(&mut self, ret: &Return) -> Result<bool, Error> {
        let crossed = match self.last_azimuth {
            Some(last) => ret.azimuth < last,
            None => true,
        };
        self.last_azimuth = Some(ret.azimuth);

        if crossed {
            self.rotate()?;
        }

        if let Some(writer) = self.writer.as_mut() {
            writeln!(writer, "{}", encode_whitespace(ret))?;
            self.records += 1;
        }
        Ok(crossed)
    }

    fn rotate(&mut self) -> Result<(), Error> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        self.rotation += 1;
        let path = self.out_dir.join(rotation_file_name(self.rotation));
        self.writer = Some(BufWriter::new(File::create(&path)?));
        info!("started rotation file {}", path.display());
        Ok(())
    }

    /// Flush and close the current file. Returns the number of rotation
    /// files written.
    pub fn finish(&mut self) -> Result<u32, Error> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(self.rotation)
    }
}

/// Record a decoder stream until it ends or playback stops.
///
/// Malformed lines are skipped. Write failures abort the recording.
pub async fn record_stream<S: LineSource>(
    mut source: S,
    mut recorder: RotationRecorder,
    state: Arc<PlaybackState>,
    poll_interval: Duration,
) -> Result<RotationRecorder, Error> {
    let mut skipped = 0u64;

    let result = loop {
        if !state.is_running() {
            debug!("recording stopped");
            break Ok(());
        }

        let line = match tokio::time::timeout(poll_interval, source.next_line()).await {
            Err(_) => continue,
            Ok(Ok(Some(line))) => line,
            Ok(Ok(None)) => break Ok(()),
            Ok(Err(e)) => {
                warn!("decoder read error: {}", e);
                if source.has_more() {
                    continue;
                }
                break Ok(());
            }
        };

        match decode_line(&line, RecordFormat::Csv) {
            Ok(Some(ret)) => {
                if let Err(e) = recorder.record(&ret) {
                    break Err(e);
                }
            }
            Ok(None) => {}
            Err(e) => {
                skipped += 1;
                trace!("skipping line: {}", e);
            }
        }
    };

    source.stop().await;
    recorder.finish()?;
    info!(
        "recorded {} returns into {} rotation files, {} lines skipped",
        recorder.records(),
        recorder.rotations(),
        skipped
    );
    result.map(|_| recorder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{line_source::ScriptedSource, playback::PlaybackController, radar::SourceMode};

    fn ret(azimuth: f32) -> Return {
        Return {
            azimuth,
            range_max: 64.0,
            timestamp: 1000,
            intensity: vec![0, 5, 255],
        }
    }

    fn lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_rotation_file_name() {
        assert_eq!(rotation_file_name(1), "radar_data_00001.txt");
        assert_eq!(rotation_file_name(123), "radar_data_00123.txt");
    }

    #[test]
    fn test_split_at_north_crossing() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = RotationRecorder::new(dir.path()).unwrap();

        let azimuths = [10.0, 120.0, 350.0, 2.0, 180.0, 359.0, 0.5];
        let started: Vec<bool> = azimuths
            .iter()
            .map(|&a| recorder.record(&ret(a)).unwrap())
            .collect();
        assert_eq!(started, vec![true, false, false, true, false, false, true]);
        assert_eq!(recorder.finish().unwrap(), 3);
        assert_eq!(recorder.records(), 7);

        let first = lines(&dir.path().join("radar_data_00001.txt"));
        assert_eq!(first.len(), 3);
        assert_eq!(first[0], "10.0000000 64.0 1000 0 5 255");
        assert_eq!(lines(&dir.path().join("radar_data_00002.txt")).len(), 3);
        assert_eq!(lines(&dir.path().join("radar_data_00003.txt")).len(), 1);
    }

    #[test]
    fn test_recorded_files_replay() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = RotationRecorder::new(&dir.path().join("run")).unwrap();
        recorder.record(&ret(42.5)).unwrap();
        recorder.finish().unwrap();

        let line = &lines(&dir.path().join("run").join("radar_data_00001.txt"))[0];
        let decoded = decode_line(line, RecordFormat::Whitespace).unwrap().unwrap();
        assert_eq!(decoded, ret(42.5));
    }

    #[tokio::test]
    async fn test_record_stream() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = PlaybackController::new(SourceMode::File);
        ctl.start().unwrap();

        let source = ScriptedSource::new([
            "banner line",
            "100.0,50.0,1,1,2",
            "200.0,50.0,2,1,2",
            "5.0,50.0,3,1,2",
        ]);
        let recorder = RotationRecorder::new(dir.path()).unwrap();
        let recorder = record_stream(source, recorder, ctl.state(), Duration::from_millis(10))
            .await
            .unwrap();

        assert_eq!(recorder.rotations(), 2);
        assert_eq!(recorder.records(), 3);
        assert_eq!(lines(&dir.path().join("radar_data_00002.txt")).len(), 1);
    }
}
