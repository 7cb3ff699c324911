// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rectification: crop the projected region out of a captured frame and
// resample it onto the reference frame's pixel grid.

use chromaloop_core::Quadrilateral;
use chromaloop_core::config::DetectionConfig;
use chromaloop_core::error::Result;
use image::RgbImage;
use tracing::{debug, instrument};

use crate::corners::CornerFinder;
use crate::homography::{compute_homography, warp};
use crate::quad::canonicalize;

/// Where the rectifier gets the projected region's corners from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CornerSource {
    /// Known corners, in any order; canonicalized before use.
    Supplied(Quadrilateral),
    /// Detect the region in the captured frame itself.
    AutoDetect,
}

/// Aligns captured frames to the reference grid.
#[derive(Debug, Clone, Default)]
pub struct Rectifier {
    finder: CornerFinder,
}

impl Rectifier {
    pub fn new(detection: DetectionConfig) -> Result<Self> {
        Ok(Self {
            finder: CornerFinder::new(detection)?,
        })
    }

    pub fn finder(&self) -> &CornerFinder {
        &self.finder
    }

    /// Resolve the canonical corners for `captured`.
    pub fn corners(&self, captured: &RgbImage, source: &CornerSource) -> Result<Quadrilateral> {
        match source {
            CornerSource::Supplied(quad) => Ok(canonicalize(quad)),
            CornerSource::AutoDetect => self.finder.find_corners(captured),
        }
    }

    /// Warp the projected region of `captured` onto a
    /// `reference_width` x `reference_height` frame.
    #[instrument(skip(self, captured, source), fields(src_w = captured.width(), src_h = captured.height()))]
    pub fn rectify(
        &self,
        captured: &RgbImage,
        source: &CornerSource,
        reference_width: u32,
        reference_height: u32,
    ) -> Result<RgbImage> {
        let quad = self.corners(captured, source)?;
        debug!(corners = ?quad.points(), "Rectifying with corners");
        let homography = compute_homography(&quad, reference_width, reference_height)?;
        warp(captured, &homography, reference_width, reference_height)
    }
}

/// Rectify with default detection tuning.
pub fn rectify(
    captured: &RgbImage,
    source: &CornerSource,
    reference_width: u32,
    reference_height: u32,
) -> Result<RgbImage> {
    Rectifier::default().rectify(captured, source, reference_width, reference_height)
}
