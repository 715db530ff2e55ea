// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! LiDAR frame file reader.
//!
//! Frames are stored one per file as binary PCD: an ASCII header of
//! key/value lines terminated by the `DATA` line, immediately followed by the
//! point records.
//!
//! ```text
//! VERSION 0.7
//! FIELDS x y z intensity
//! SIZE 4 4 4 4
//! TYPE F F F F
//! COUNT 1 1 1 1
//! WIDTH 2
//! HEIGHT 1
//! POINTS 2
//! DATA binary
//! <x f32><y f32><z f32><intensity f32> × POINTS   (little-endian, packed)
//! ```
//!
//! Frame files are played in order of the frame number embedded in their
//! name (`frame_9.pcd` before `frame_10.pcd`).

use crate::{
    lidar::{LidarFrame, Points},
    radar::Error,
};
use std::{
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::debug;

/// Size of one point record: four packed `f32`.
pub const POINT_RECORD_SIZE: usize = 16;

/// Parsed frame header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PcdHeader {
    /// Declared number of points
    pub points: usize,
    /// Field names, if a `FIELDS` line was present
    pub fields: Vec<String>,
    /// Data encoding from the `DATA` line
    pub data: String,
    /// Byte offset of the first point record
    pub data_offset: usize,
}

/// Parse the ASCII header at the start of `bytes`.
pub fn parse_header(bytes: &[u8]) -> Result<PcdHeader, Error> {
    let mut offset = 0;
    let mut points = None;
    let mut fields = Vec::new();

    while offset < bytes.len() {
        let end = match bytes[offset..].iter().position(|&b| b == b'\n') {
            Some(pos) => offset + pos,
            None => {
                return Err(Error::InvalidFrame(
                    "header ends without a DATA line".to_string(),
                ));
            }
        };

        let line = std::str::from_utf8(&bytes[offset..end])
            .map_err(|_| Error::InvalidFrame(format!("non-ASCII header at byte {}", offset)))?
            .trim();
        offset = end + 1;

        let mut words = line.split_whitespace();
        match words.next() {
            Some("POINTS") => {
                let count = words.next().and_then(|n| n.parse::<usize>().ok());
                points = Some(count.ok_or_else(|| {
                    Error::InvalidFrame(format!("invalid POINTS line: {:?}", line))
                })?);
            }
            Some("FIELDS") => fields = words.map(str::to_string).collect(),
            Some(key) if key.starts_with("DATA") => {
                let data = words.next().unwrap_or("binary").to_ascii_lowercase();
                let points = points
                    .ok_or_else(|| Error::InvalidFrame("header has no POINTS line".to_string()))?;
                return Ok(PcdHeader {
                    points,
                    fields,
                    data,
                    data_offset: offset,
                });
            }
            _ => {}
        }
    }

    Err(Error::InvalidFrame(
        "header ends without a DATA line".to_string(),
    ))
}

/// Decode a complete frame file.
///
/// Exactly `POINTS` records are read; trailing bytes are ignored.
pub fn parse_frame(bytes: &[u8], index: u64) -> Result<LidarFrame, Error> {
    let header = parse_header(bytes)?;
    if header.data != "binary" {
        return Err(Error::UnsupportedFormat(format!("DATA {}", header.data)));
    }

    let end = header
        .points
        .checked_mul(POINT_RECORD_SIZE)
        .and_then(|len| len.checked_add(header.data_offset))
        .ok_or_else(|| Error::InvalidFrame(format!("POINTS {} is too large", header.points)))?;
    // Checked before allocating so a bogus POINTS never sizes the buffers
    if bytes.len() < end {
        return Err(Error::UnexpectedEnd(bytes.len()));
    }

    let mut points = Points::with_capacity(header.points);
    for record in bytes[header.data_offset..end].chunks_exact(POINT_RECORD_SIZE) {
        points.push(
            read_f32(record, 0),
            read_f32(record, 4),
            read_f32(record, 8),
            read_f32(record, 12),
        );
    }

    Ok(LidarFrame {
        index,
        points,
        frame_time: Instant::now(),
    })
}

#[inline]
fn read_f32(record: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([
        record[offset],
        record[offset + 1],
        record[offset + 2],
        record[offset + 3],
    ])
}

/// Read and decode one frame file.
pub fn read_frame(path: &Path, index: u64) -> Result<LidarFrame, Error> {
    let bytes = std::fs::read(path)?;
    parse_frame(&bytes, index)
}

/// Frame number embedded in a file name: the last run of digits in its stem.
pub fn frame_index(path: &Path) -> Option<u64> {
    let stem = path.file_stem()?.to_str()?;
    let end = stem.rfind(|c: char| c.is_ascii_digit())? + 1;
    let start = stem[..end]
        .rfind(|c: char| !c.is_ascii_digit())
        .map_or(0, |pos| pos + 1);
    stem[start..end].parse().ok()
}

/// List the frame files of `directory` with the given extension, ordered by
/// frame number. Files without a number are skipped.
pub fn list_frames(directory: &Path, extension: &str) -> Result<Vec<(u64, PathBuf)>, Error> {
    let mut frames = Vec::new();

    for entry in std::fs::read_dir(directory)? {
        let path = entry?.path();
        if !path.is_file()
            || !path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        {
            continue;
        }

        match frame_index(&path) {
            Some(index) => frames.push((index, path)),
            None => debug!("skipping {}: no frame number", path.display()),
        }
    }

    frames.sort();
    Ok(frames)
}

/// Encode a frame in the binary layout [`parse_frame`] reads.
pub fn encode_frame(points: &Points) -> Vec<u8> {
    let header = format!(
        "VERSION 0.7\nFIELDS x y z intensity\nSIZE 4 4 4 4\nTYPE F F F F\nCOUNT 1 1 1 1\n\
         WIDTH {n}\nHEIGHT 1\nVIEWPOINT 0 0 0 1 0 0 0\nPOINTS {n}\nDATA binary\n",
        n = points.len()
    );

    let mut bytes = Vec::with_capacity(header.len() + points.len() * POINT_RECORD_SIZE);
    bytes.extend_from_slice(header.as_bytes());
    for (x, y, z, i) in points.iter() {
        bytes.extend_from_slice(&x.to_le_bytes());
        bytes.extend_from_slice(&y.to_le_bytes());
        bytes.extend_from_slice(&z.to_le_bytes());
        bytes.extend_from_slice(&i.to_le_bytes());
    }
    bytes
}
