// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contour-based detection of the projected quadrilateral in a captured frame.

use chromaloop_core::config::DetectionConfig;
use chromaloop_core::error::{ChromaloopError, Result};
use chromaloop_core::kernel::gaussian_kernel;
use chromaloop_core::{CannyThresholds, Point2D, Quadrilateral};
use image::{GrayImage, RgbImage};
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::separable_filter_equal;
use imageproc::geometry::{approximate_polygon_dp, arc_length, contour_area};
use imageproc::morphology::{dilate, erode};
use tracing::{debug, info, instrument, warn};

use crate::quad::canonicalize;

/// Finds the projected region in a captured frame.
///
/// The projected image is assumed to be the largest bright-edged region the
/// camera sees, which holds as long as the camera is pointed at the
/// projection and the room lighting is reasonable.
#[derive(Debug, Clone, Default)]
pub struct CornerFinder {
    config: DetectionConfig,
}

impl CornerFinder {
    pub fn new(config: DetectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Finder with default tuning and an optional Canny threshold override.
    ///
    /// Fails with `InvalidConfig` unless `0 <= low <= high`.
    pub fn with_threshold(manual_threshold: Option<CannyThresholds>) -> Result<Self> {
        Self::new(DetectionConfig {
            manual_threshold,
            ..DetectionConfig::default()
        })
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Locate the four corners of the projected region.
    ///
    /// ## Pipeline
    ///
    /// 1. Convert to grayscale
    /// 2. Gaussian blur (5x5 by default)
    /// 3. Pick Canny thresholds: the manual pair if configured, otherwise
    ///    `(0.4 * t, t)` with `t` the Otsu level of the blurred frame
    /// 4. Canny edge detection
    /// 5. Dilate (11x11) to close gaps between edge fragments
    /// 6. Erode (7x7) to strip noise
    /// 7. Take the outermost contour enclosing the largest area
    /// 8. Simplify it with Douglas-Peucker, epsilon = 2% of its perimeter
    /// 9. Require exactly four vertices and canonicalize them
    #[instrument(skip_all, fields(width = captured.width(), height = captured.height()))]
    pub fn find_corners(&self, captured: &RgbImage) -> Result<Quadrilateral> {
        info!("Starting corner detection");

        let blurred = self.blurred_gray(captured)?;

        let thresholds = match self.config.manual_threshold {
            Some(manual) => manual,
            None => auto_thresholds(&blurred),
        };
        debug!(low = thresholds.low, high = thresholds.high, "Canny thresholds");

        let edges = self.closed_edges(&blurred, thresholds);

        let contours = find_contours::<i32>(&edges);
        debug!(contour_count = contours.len(), "Contours extracted");

        let Some(largest) = largest_external_contour(&contours) else {
            warn!("No external contour found");
            return Err(ChromaloopError::CornerDetectionFailure { vertices: 0 });
        };

        let perimeter = arc_length(&largest.points, true);
        let epsilon = self.config.epsilon_fraction * perimeter;
        let mut approx = approximate_polygon_dp(&largest.points, epsilon, true);
        if approx.len() > 1 && approx.first() == approx.last() {
            approx.pop();
        }
        debug!(perimeter, epsilon, vertices = approx.len(), "Contour simplified");

        if approx.len() != 4 {
            warn!(vertices = approx.len(), "Simplified contour is not a quadrilateral");
            return Err(ChromaloopError::CornerDetectionFailure {
                vertices: approx.len(),
            });
        }

        let corners: [Point2D; 4] =
            std::array::from_fn(|i| Point2D::new(approx[i].x as f64, approx[i].y as f64));
        let quad = canonicalize(&Quadrilateral::new(corners));

        info!(corners = ?quad.points(), "Corners detected");
        Ok(quad)
    }

    /// Grayscale conversion followed by the configured Gaussian blur.
    pub fn blurred_gray(&self, captured: &RgbImage) -> Result<GrayImage> {
        let gray = image::imageops::grayscale(captured);
        let kernel = gaussian_kernel(self.config.blur_kernel, 0.0)?;
        Ok(separable_filter_equal(&gray, &kernel))
    }

    /// Canny edges thickened by dilation and thinned by erosion.
    fn closed_edges(&self, blurred: &GrayImage, thresholds: CannyThresholds) -> GrayImage {
        let edges = canny(blurred, thresholds.low, thresholds.high);
        let dilated = dilate(&edges, Norm::LInf, radius(self.config.dilate_kernel));
        erode(&dilated, Norm::LInf, radius(self.config.erode_kernel))
    }
}

/// Detect the projected quadrilateral with default tuning.
pub fn find_corners(
    captured: &RgbImage,
    manual_threshold: Option<CannyThresholds>,
) -> Result<Quadrilateral> {
    CornerFinder::with_threshold(manual_threshold)?.find_corners(captured)
}

/// Canny thresholds derived from the Otsu level of a blurred grayscale
/// frame.
pub fn auto_thresholds(blurred: &GrayImage) -> CannyThresholds {
    let level = otsu_level(blurred);
    CannyThresholds::from_level(level)
}

// -- Helpers ------------------------------------------------------------------

/// Square structuring element of side `size` as an L-infinity radius.
fn radius(size: usize) -> u8 {
    (size / 2).min(u8::MAX as usize) as u8
}

/// The top-level outer contour with the largest enclosed area.
fn largest_external_contour(contours: &[Contour<i32>]) -> Option<&Contour<i32>> {
    contours
        .iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .max_by(|a, b| enclosed_area(a).total_cmp(&enclosed_area(b)))
}

/// Unsigned area; `contour_area` is signed by orientation.
fn enclosed_area(contour: &Contour<i32>) -> f64 {
    contour_area(&contour.points).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// Dark 240x200 frame with a bright filled quadrilateral given by the
    /// half-plane test against its (clockwise) corners.
    fn frame_with_quad(corners: [(f64, f64); 4]) -> RgbImage {
        RgbImage::from_fn(240, 200, |x, y| {
            let (px, py) = (x as f64 + 0.5, y as f64 + 0.5);
            let inside = (0..4).all(|i| {
                let (ax, ay) = corners[i];
                let (bx, by) = corners[(i + 1) % 4];
                (bx - ax) * (py - ay) - (by - ay) * (px - ax) >= 0.0
            });
            if inside {
                Rgb([235, 230, 220])
            } else {
                Rgb([25, 20, 30])
            }
        })
    }

    fn assert_near(found: &Quadrilateral, expected: [(f64, f64); 4], tol: f64) {
        for (p, (ex, ey)) in found.points().iter().zip(expected) {
            assert!(
                (p.x - ex).abs() <= tol && (p.y - ey).abs() <= tol,
                "expected ({ex}, {ey}) within {tol}, got {p:?} in {found:?}"
            );
        }
    }

    #[test]
    fn finds_axis_aligned_rectangle() {
        let corners = [(50.0, 40.0), (190.0, 40.0), (190.0, 160.0), (50.0, 160.0)];
        let frame = frame_with_quad(corners);
        let quad = find_corners(&frame, None).expect("rectangle detected");
        assert_near(&quad, corners, 8.0);
    }

    #[test]
    fn finds_tilted_quadrilateral_in_canonical_order() {
        let corners = [(60.0, 30.0), (200.0, 50.0), (185.0, 170.0), (40.0, 150.0)];
        let frame = frame_with_quad(corners);
        let quad = find_corners(&frame, None).expect("quadrilateral detected");
        assert_near(&quad, corners, 8.0);
    }

    #[test]
    fn blank_frame_fails_with_no_vertices() {
        let frame = RgbImage::from_pixel(120, 90, Rgb([128, 128, 128]));
        match find_corners(&frame, None) {
            Err(ChromaloopError::CornerDetectionFailure { vertices }) => assert_eq!(vertices, 0),
            other => panic!("expected CornerDetectionFailure, got {other:?}"),
        }
    }

    #[test]
    fn triangle_is_not_a_quadrilateral() {
        let frame = RgbImage::from_fn(240, 200, |x, y| {
            // Right triangle with legs along x = 40 and y = 170.
            let inside = x >= 40 && y <= 170 && (y as i32 - 30) >= (x as i32 - 40);
            if inside { Rgb([230, 230, 230]) } else { Rgb([20, 20, 20]) }
        });
        match find_corners(&frame, None) {
            Err(ChromaloopError::CornerDetectionFailure { vertices }) => assert_ne!(vertices, 4),
            other => panic!("expected CornerDetectionFailure, got {other:?}"),
        }
    }

    #[test]
    fn manual_threshold_matching_otsu_gives_same_corners() {
        let corners = [(55.0, 35.0), (195.0, 45.0), (190.0, 165.0), (45.0, 155.0)];
        let frame = frame_with_quad(corners);

        let finder = CornerFinder::default();
        let blurred = finder.blurred_gray(&frame).expect("valid blur kernel");
        let derived = auto_thresholds(&blurred);

        let automatic = find_corners(&frame, None).expect("automatic path");
        let manual = find_corners(&frame, Some(derived)).expect("manual path");
        assert_eq!(automatic, manual);
    }

    #[test]
    fn explicit_manual_threshold_is_honoured() {
        let corners = [(50.0, 40.0), (190.0, 40.0), (190.0, 160.0), (50.0, 160.0)];
        let frame = frame_with_quad(corners);
        let quad = find_corners(&frame, Some(CannyThresholds::new(50.0, 150.0)))
            .expect("rectangle detected");
        assert_near(&quad, corners, 8.0);
    }

    #[test]
    fn inverted_manual_threshold_is_rejected() {
        let corners = [(50.0, 40.0), (190.0, 40.0), (190.0, 160.0), (50.0, 160.0)];
        let frame = frame_with_quad(corners);
        assert!(matches!(
            find_corners(&frame, Some(CannyThresholds::new(150.0, 50.0))),
            Err(ChromaloopError::InvalidConfig(_))
        ));
        assert!(matches!(
            find_corners(&frame, Some(CannyThresholds::new(f32::NAN, 50.0))),
            Err(ChromaloopError::InvalidConfig(_))
        ));
        assert!(CornerFinder::with_threshold(Some(CannyThresholds::new(-1.0, 50.0))).is_err());
    }

    #[test]
    fn largest_region_wins() {
        let mask = GrayImage::from_fn(60, 40, |x, y| {
            let small = (5..15).contains(&x) && (5..15).contains(&y);
            let large = (25..55).contains(&x) && (8..35).contains(&y);
            image::Luma([if small || large { 255 } else { 0 }])
        });
        let contours = find_contours::<i32>(&mask);
        let largest = largest_external_contour(&contours).expect("two regions");
        let min_x = largest.points.iter().map(|p| p.x).min();
        let max_x = largest.points.iter().map(|p| p.x).max();
        assert_eq!((min_x, max_x), (Some(25), Some(54)));
        assert!(enclosed_area(largest) > 500.0);
    }

    #[test]
    fn invalid_detection_config_is_rejected() {
        let config = DetectionConfig {
            dilate_kernel: 10,
            ..DetectionConfig::default()
        };
        assert!(CornerFinder::new(config).is_err());
    }
}
