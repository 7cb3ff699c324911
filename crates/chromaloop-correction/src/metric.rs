// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Normalized pixel-difference metric.

use chromaloop_core::DistanceScore;
use chromaloop_core::error::{Result, ensure_same_shape};
use image::RgbImage;

/// Sum of absolute channel differences divided by the largest possible sum
/// (`255 * element count`).
///
/// 0 means identical, 1 means every channel is at the opposite extreme. The
/// score is symmetric. Two empty images of equal shape score 0.
pub fn distance(img1: &RgbImage, img2: &RgbImage) -> Result<DistanceScore> {
    ensure_same_shape(img1.dimensions(), img2.dimensions())?;

    let count = img1.as_raw().len();
    if count == 0 {
        return Ok(DistanceScore::IDENTICAL);
    }

    let total: u64 = img1
        .as_raw()
        .iter()
        .zip(img2.as_raw())
        .map(|(&a, &b)| (a as i32 - b as i32).unsigned_abs() as u64)
        .sum();

    Ok(DistanceScore::new(total as f64 / (255.0 * count as f64)))
}
