// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Chromaloop projector-camera loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ChromaloopError, Result};

/// Unique identifier for one experiment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point in image coordinates (x to the right, y down).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Exactly four points outlining the projected region in a captured frame.
///
/// The order is meaningless until the quadrilateral has been canonicalized
/// (top-left first, clockwise).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quadrilateral(pub [Point2D; 4]);

impl Quadrilateral {
    pub fn new(points: [Point2D; 4]) -> Self {
        Self(points)
    }

    /// Build from plain `(x, y)` pairs.
    pub fn from_pairs(pairs: [(f64, f64); 4]) -> Self {
        Self(pairs.map(Point2D::from))
    }

    /// Build from an arbitrary point list, failing unless exactly four points
    /// were supplied.
    pub fn try_from_points(points: &[Point2D]) -> Result<Self> {
        let array: [Point2D; 4] =
            points
                .try_into()
                .map_err(|_| ChromaloopError::CornerSelection {
                    expected: 4,
                    got: points.len(),
                })?;
        Ok(Self(array))
    }

    pub fn points(&self) -> &[Point2D; 4] {
        &self.0
    }

    /// Enclosed area via the shoelace formula. Assumes the points are in
    /// perimeter order (either direction).
    pub fn area(&self) -> f64 {
        let mut twice = 0.0;
        for i in 0..4 {
            let a = self.0[i];
            let b = self.0[(i + 1) % 4];
            twice += a.x * b.y - b.x * a.y;
        }
        twice.abs() / 2.0
    }
}

/// Normalized pixel-difference score in `[0, 1]`; 0 means identical.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct DistanceScore(f64);

impl DistanceScore {
    pub const IDENTICAL: DistanceScore = DistanceScore(0.0);

    /// Wrap a raw score, clamping into `[0, 1]` to absorb rounding.
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for DistanceScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// Canny hysteresis thresholds `(low, high)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CannyThresholds {
    pub low: f32,
    pub high: f32,
}

impl CannyThresholds {
    pub const fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }

    /// Derive edge thresholds from an automatic binarization level:
    /// `(0.4 * level, level)`.
    pub fn from_level(level: u8) -> Self {
        let high = level as f32;
        Self {
            low: 0.4 * high,
            high,
        }
    }
}

/// Outcome of one displayed frame of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    pub run_id: RunId,
    /// Zero-based index of the reference frame within the run.
    pub frame_index: u32,
    /// Distance between reference and rectified capture, one entry per
    /// measurement cycle (a single entry for per-frame strategies).
    pub cycle_distances: Vec<DistanceScore>,
    pub captured_at: DateTime<Utc>,
}

impl FrameRecord {
    /// Distance observed on the final cycle of the frame.
    pub fn final_distance(&self) -> Option<DistanceScore> {
        self.cycle_distances.last().copied()
    }
}
