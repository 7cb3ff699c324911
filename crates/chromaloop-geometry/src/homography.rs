// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Four-point homography estimation and perspective resampling.

use chromaloop_core::error::{ChromaloopError, Result};
use chromaloop_core::{Point2D, Quadrilateral};
use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use tracing::{debug, instrument};

/// Relative cross-product magnitude below which three points count as
/// collinear.
const COLLINEAR_TOLERANCE: f64 = 1e-6;

/// A 3x3 projective transform between two four-point sets.
#[derive(Debug, Clone, Copy)]
pub struct Homography {
    projection: Projection,
}

impl Homography {
    /// Transform mapping each `src[i]` onto `dst[i]`.
    ///
    /// Fails with `DegenerateGeometry` when either point set has three
    /// (nearly) collinear points or no projective map fits them.
    pub fn from_correspondences(src: &[Point2D; 4], dst: &[Point2D; 4]) -> Result<Self> {
        ensure_general_position(src, "source")?;
        ensure_general_position(dst, "destination")?;

        let from = src.map(|p| (p.x as f32, p.y as f32));
        let to = dst.map(|p| (p.x as f32, p.y as f32));
        let projection = Projection::from_control_points(from, to).ok_or_else(|| {
            ChromaloopError::DegenerateGeometry("point correspondences are singular".into())
        })?;
        Ok(Self { projection })
    }

    /// Homography taking a canonical (top-left first, clockwise)
    /// quadrilateral onto the rectangle `(0,0), (W,0), (W,H), (0,H)`.
    pub fn to_rectangle(src: &Quadrilateral, target_width: u32, target_height: u32) -> Result<Self> {
        let (w, h) = (target_width as f64, target_height as f64);
        let dst = [
            Point2D::new(0.0, 0.0),
            Point2D::new(w, 0.0),
            Point2D::new(w, h),
            Point2D::new(0.0, h),
        ];
        Self::from_correspondences(src.points(), &dst)
    }

    /// The underlying `imageproc` transform.
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Map a point through the transform. `None` when it lands on the line
    /// at infinity.
    pub fn map_point(&self, p: Point2D) -> Option<Point2D> {
        let (x, y) = self.projection * (p.x as f32, p.y as f32);
        (x.is_finite() && y.is_finite()).then(|| Point2D::new(x as f64, y as f64))
    }
}

/// Solve the homography mapping `src` onto a `target_width` x
/// `target_height` rectangle. `src` must already be canonical.
#[instrument(skip(src))]
pub fn compute_homography(
    src: &Quadrilateral,
    target_width: u32,
    target_height: u32,
) -> Result<Homography> {
    let homography = Homography::to_rectangle(src, target_width, target_height)?;
    debug!(projection = ?homography.projection(), "Homography solved");
    Ok(homography)
}

/// Resample `image` through `homography` onto a fresh
/// `target_width` x `target_height` frame.
///
/// Each destination pixel is inverse-mapped into the source and sampled
/// bilinearly; pixels that map outside the source stay black. The output
/// always has exactly the requested dimensions.
#[instrument(skip(image, homography), fields(src_w = image.width(), src_h = image.height()))]
pub fn warp(
    image: &RgbImage,
    homography: &Homography,
    target_width: u32,
    target_height: u32,
) -> Result<RgbImage> {
    let mut output = RgbImage::new(target_width, target_height);
    warp_into(
        image,
        homography.projection(),
        Interpolation::Bilinear,
        Rgb([0u8, 0, 0]),
        &mut output,
    );
    debug!(target_width, target_height, "Warp complete");
    Ok(output)
}

// -- Helpers ------------------------------------------------------------------

/// Reject point sets with coincident or (nearly) collinear triples.
fn ensure_general_position(points: &[Point2D; 4], label: &str) -> Result<()> {
    let mut extent_sq: f64 = 0.0;
    for i in 0..4 {
        for j in (i + 1)..4 {
            let d = points[i].distance_to(&points[j]);
            extent_sq = extent_sq.max(d * d);
        }
    }
    if extent_sq < f64::EPSILON {
        return Err(ChromaloopError::DegenerateGeometry(format!(
            "{label} points coincide"
        )));
    }

    const TRIPLES: [(usize, usize, usize); 4] = [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)];
    for (a, b, c) in TRIPLES {
        let (pa, pb, pc) = (points[a], points[b], points[c]);
        let cross = (pb.x - pa.x) * (pc.y - pa.y) - (pb.y - pa.y) * (pc.x - pa.x);
        if cross.abs() <= COLLINEAR_TOLERANCE * extent_sq {
            return Err(ChromaloopError::DegenerateGeometry(format!(
                "{label} points {a}, {b}, {c} are collinear"
            )));
        }
    }
    Ok(())
}
