// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Global mean colour transfer.

use chromaloop_core::CorrectionMap;
use chromaloop_core::error::{Result, ensure_same_shape};
use image::RgbImage;

/// `mean(reference) - mean(capture)` per channel.
///
/// This is the uniform offset that, added to what was displayed, would have
/// cancelled the drift observed in `capture`.
pub fn mean_offset(reference: &RgbImage, capture: &RgbImage) -> Result<[f32; 3]> {
    ensure_same_shape(reference.dimensions(), capture.dimensions())?;
    Ok(offset_between(capture, reference))
}

/// [`mean_offset`] broadcast over the reference frame.
pub fn mean_offset_map(reference: &RgbImage, capture: &RgbImage) -> Result<CorrectionMap> {
    let offset = mean_offset(reference, capture)?;
    Ok(CorrectionMap::broadcast(
        reference.width(),
        reference.height(),
        offset,
    ))
}

/// Shift every pixel of `src` by `mean(target) - mean(src)` per channel.
///
/// Shapes may differ; only the means of `target` are used. The result is
/// clamped to `[0, 255]` and truncated.
pub fn color_correct(src: &RgbImage, target: &RgbImage) -> RgbImage {
    let offset = offset_between(src, target);
    let mut out = src.clone();
    for pixel in out.pixels_mut() {
        for (channel, &delta) in pixel.0.iter_mut().zip(offset.iter()) {
            *channel = (*channel as f32 + delta).clamp(0.0, 255.0) as u8;
        }
    }
    out
}

fn offset_between(from: &RgbImage, to: &RgbImage) -> [f32; 3] {
    let want = CorrectionMap::from_image(to).channel_means();
    let have = CorrectionMap::from_image(from).channel_means();
    [want[0] - have[0], want[1] - have[1], want[2] - have[2]]
}
