// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// chromaloop-geometry — Geometric rectification of captured frames.
//
// Orders corner points, solves the four-point homography onto the reference
// grid, resamples captured frames through it, and finds the projected region
// automatically when no corners are supplied.

pub mod corners;
pub mod homography;
pub mod quad;
pub mod rectify;

pub use corners::{CornerFinder, find_corners};
pub use homography::{Homography, compute_homography, warp};
pub use quad::canonicalize;
pub use rectify::{CornerSource, Rectifier, rectify};
