// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Common radar types and error handling.
//!
//! A [`Return`] is one decoded spoke: the azimuth it was sampled at, the
//! maximum range of the current sweep and the intensity profile over range.
//! Returns are batched into [`SectorFrame`]s by the
//! [`crate::sector::SectorAccumulator`] before being handed to the display.

use clap::ValueEnum;
use std::{fmt, time::Instant};

/// Number of azimuth sectors in one sweep.
pub const SECTOR_COUNT: usize = 12;

/// Angular width of one sector in degrees.
pub const SECTOR_WIDTH: f32 = 30.0;

/// A single decoded radar return.
#[derive(Clone, Debug, PartialEq)]
pub struct Return {
    /// Azimuth in degrees, normalised to `[0, 360)`.
    pub azimuth: f32,
    /// Maximum unambiguous range of the current sweep in meters.
    pub range_max: f32,
    /// Decoder timestamp in milliseconds.
    pub timestamp: i64,
    /// Intensity samples indexed by increasing range.
    pub intensity: Vec<u16>,
}

impl Return {
    /// Sector this return belongs to, see [`sector_index`].
    #[inline]
    pub fn sector(&self) -> usize {
        sector_index(self.azimuth)
    }

    /// Range in meters covered by each intensity sample.
    pub fn range_resolution(&self) -> f32 {
        match self.intensity.len() {
            0 | 1 => self.range_max,
            n => self.range_max / (n - 1) as f32,
        }
    }
}

/// Sector for an azimuth in degrees: `floor(azimuth / 30) mod 12`.
///
/// Always in `[0, 11]`, including for azimuths outside `[0, 360)`.
#[inline]
pub fn sector_index(azimuth: f32) -> usize {
    let sector = (azimuth / SECTOR_WIDTH).floor() as i64;
    sector.rem_euclid(SECTOR_COUNT as i64) as usize
}

/// Contiguous run of returns observed in one sector before the sweep moved
/// on.
#[derive(Clone, Debug)]
pub struct SectorFrame {
    /// Sector index in `[0, 11]`.
    pub sector_index: usize,
    /// Returns in arrival order.
    pub returns: Vec<Return>,
    /// When the frame was emitted by the accumulator.
    pub received_time: Instant,
}

impl SectorFrame {
    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    /// Maximum range reported by the first return, used by displays to scale
    /// range rings.
    pub fn range_max(&self) -> Option<f32> {
        self.returns.first().map(|r| r.range_max)
    }

    /// Timestamp of the last return in the frame.
    pub fn last_timestamp(&self) -> Option<i64> {
        self.returns.last().map(|r| r.timestamp)
    }
}

/// Source of radar data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum SourceMode {
    /// Live network feed through the external decoder process.
    #[default]
    Live,
    /// Single recording replayed through the external decoder process.
    File,
    /// Directory of per-rotation text files.
    Directory,
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SourceMode::Live => write!(f, "live"),
            SourceMode::File => write!(f, "file"),
            SourceMode::Directory => write!(f, "directory"),
        }
    }
}

/// Common error type for ingestion.
///
/// Per-record errors ([`Error::Parse`]) are recovered by the caller; only
/// [`Error::SourceExhausted`] and configuration errors stop a producer.
#[derive(Debug)]
pub enum Error {
    /// I/O error (file, pipe or process operations)
    Io(std::io::Error),
    /// Malformed or non-numeric record field
    Parse(String),
    /// Directory enumeration found nothing to play
    SourceExhausted(String),
    /// External decoder process could not be started
    Process(String),
    /// Invalid configuration value
    Config(String),
    /// Malformed point-cloud frame
    InvalidFrame(String),
    /// Unsupported point-cloud data encoding
    UnsupportedFormat(String),
    /// Unexpected end of data at given byte position
    UnexpectedEnd(usize),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Parse(msg) => write!(f, "parse error: {}", msg),
            Error::SourceExhausted(msg) => write!(f, "source exhausted: {}", msg),
            Error::Process(msg) => write!(f, "decoder process error: {}", msg),
            Error::Config(msg) => write!(f, "configuration error: {}", msg),
            Error::InvalidFrame(msg) => write!(f, "invalid frame: {}", msg),
            Error::UnsupportedFormat(format) => write!(f, "unsupported format: {}", format),
            Error::UnexpectedEnd(len) => write!(f, "unexpected end of data at {} bytes", len),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_index_range() {
        let mut azimuth = 0.0f32;
        while azimuth < 360.0 {
            let sector = sector_index(azimuth);
            assert!(sector < SECTOR_COUNT, "azimuth {} -> {}", azimuth, sector);
            assert_eq!(sector, (azimuth / 30.0).floor() as usize % 12);
            azimuth += 0.25;
        }
    }

    #[test]
    fn test_sector_index_boundaries() {
        assert_eq!(sector_index(0.0), 0);
        assert_eq!(sector_index(29.999), 0);
        assert_eq!(sector_index(30.0), 1);
        assert_eq!(sector_index(359.99), 11);
        // Out of range azimuths still land in a valid sector
        assert_eq!(sector_index(360.0), 0);
        assert_eq!(sector_index(-10.0), 11);
    }

    #[test]
    fn test_range_resolution() {
        let ret = Return {
            azimuth: 0.0,
            range_max: 50.0,
            timestamp: 0,
            intensity: vec![0; 101],
        };
        assert_eq!(ret.range_resolution(), 0.5);
    }

    #[test]
    fn test_error_display() {
        let err = Error::UnexpectedEnd(42);
        assert_eq!(err.to_string(), "unexpected end of data at 42 bytes");
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, Error::Io(_)));
    }
}
