// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Text record decoder.
//!
//! The external decoder process emits one CSV record per radar return:
//!
//! ```text
//! azimuth,range_max,timestamp,intensity_0,...,intensity_{K-1}
//! ```
//!
//! Recorded directories hold the same fields separated by whitespace, one
//! record per line. Anything else the decoder prints (banners, summaries)
//! fails to decode and is skipped by the caller.

use crate::radar::{Error, Return};
use std::fmt::Write as _;

/// Field layout of a text record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordFormat {
    /// Comma separated, as printed by the decoder process.
    Csv,
    /// Whitespace separated, as stored in recorded directories.
    Whitespace,
}

/// Decode one line into a [`Return`].
///
/// Returns `Ok(None)` for blank lines. Any malformed field is an
/// [`Error::Parse`]; decoding a single record is never fatal to the stream.
pub fn decode_line(line: &str, format: RecordFormat) -> Result<Option<Return>, Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    match format {
        RecordFormat::Csv => decode_fields(line.split(',').map(str::trim)),
        RecordFormat::Whitespace => decode_fields(line.split_whitespace()),
    }
    .map(Some)
}

fn decode_fields<'a>(mut fields: impl Iterator<Item = &'a str>) -> Result<Return, Error> {
    let azimuth = parse_float(fields.next(), "azimuth")?;
    let range_max = parse_float(fields.next(), "range_max")?;
    let timestamp = match fields.next() {
        Some(field) => field
            .parse::<i64>()
            .map_err(|_| Error::Parse(format!("invalid timestamp: {:?}", field)))?,
        None => return Err(Error::Parse("missing timestamp".to_string())),
    };

    let intensity = fields
        .filter(|field| !field.is_empty())
        .map(|field| {
            field
                .parse::<u16>()
                .map_err(|_| Error::Parse(format!("invalid intensity sample: {:?}", field)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Return {
        azimuth: normalize_azimuth(azimuth),
        range_max,
        timestamp,
        intensity,
    })
}

fn parse_float(field: Option<&str>, name: &str) -> Result<f32, Error> {
    let field = field.ok_or_else(|| Error::Parse(format!("missing {}", name)))?;
    match field.parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(Error::Parse(format!("invalid {}: {:?}", name, field))),
    }
}

/// Wrap an azimuth into `[0, 360)`.
#[inline]
pub fn normalize_azimuth(azimuth: f32) -> f32 {
    let wrapped = azimuth.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Render a return as a whitespace record, the inverse of
/// [`RecordFormat::Whitespace`] decoding.
pub fn encode_whitespace(ret: &Return) -> String {
    let mut line = String::with_capacity(32 + ret.intensity.len() * 4);
    let _ = write!(line, "{:.7} {:.1} {}", ret.azimuth, ret.range_max, ret.timestamp);
    for sample in &ret.intensity {
        let _ = write!(line, " {}", sample);
    }
    line
}
