// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Point-cloud frame types.

use std::time::Instant;

/// Point cloud storage.
///
/// Structure-of-arrays layout: each field is a separate vector so consumers
/// can hand whole columns to plotting or SIMD code. Iterate with
/// [`Points::iter`] to get `(x, y, z, intensity)` tuples in file order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Points {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub z: Vec<f32>,
    pub intensity: Vec<f32>,
}

impl Points {
    /// Create an empty Points structure with room for `capacity` points
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
            z: Vec::with_capacity(capacity),
            intensity: Vec::with_capacity(capacity),
        }
    }

    /// Create an empty Points structure
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, x: f32, y: f32, z: f32, intensity: f32) {
        self.x.push(x);
        self.y.push(y);
        self.z.push(z);
        self.intensity.push(intensity);
    }

    /// Clear all points while retaining capacity
    pub fn clear(&mut self) {
        self.x.clear();
        self.y.clear();
        self.z.clear();
        self.intensity.clear();
    }

    /// Get the current number of points
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Points as `(x, y, z, intensity)` tuples.
    pub fn iter(&self) -> impl Iterator<Item = (f32, f32, f32, f32)> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .zip(&self.z)
            .zip(&self.intensity)
            .map(|(((x, y), z), i)| (*x, *y, *z, *i))
    }
}

/// One point-cloud frame read from disk.
#[derive(Clone, Debug)]
pub struct LidarFrame {
    /// Frame number parsed from the file name
    pub index: u64,
    /// Point cloud data
    pub points: Points,
    /// When the frame was read
    pub frame_time: Instant,
}

impl LidarFrame {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_basic() {
        let mut points = Points::with_capacity(4);
        assert!(points.is_empty());

        points.push(1.0, 2.0, 3.0, 10.0);
        points.push(4.0, 5.0, 6.0, 20.0);
        assert_eq!(points.len(), 2);

        let tuples: Vec<_> = points.iter().collect();
        assert_eq!(tuples, vec![(1.0, 2.0, 3.0, 10.0), (4.0, 5.0, 6.0, 20.0)]);

        points.clear();
        assert!(points.is_empty());
        assert_eq!(points, Points::empty());
    }
}
