// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// 1D Gaussian kernels for separable smoothing.

use crate::error::{ChromaloopError, Result};

/// Fixed smoothing tables used for small kernels when no sigma is given.
const SMALL_KERNELS: [&[f32]; 4] = [
    &[1.0],
    &[0.25, 0.5, 0.25],
    &[0.0625, 0.25, 0.375, 0.25, 0.0625],
    &[0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125],
];

/// Build a normalized 1D Gaussian kernel of odd length `size`.
///
/// A non-positive `sigma` is derived from the size as
/// `0.3 * ((size - 1) * 0.5 - 1) + 0.8`; in that case kernels of length
/// 7 or less use the fixed binomial-style tables.
pub fn gaussian_kernel(size: usize, sigma: f64) -> Result<Vec<f32>> {
    if size == 0 || size % 2 == 0 {
        return Err(ChromaloopError::InvalidConfig(format!(
            "gaussian kernel size must be odd and positive, got {size}"
        )));
    }
    if !sigma.is_finite() {
        return Err(ChromaloopError::InvalidConfig(format!(
            "gaussian sigma must be finite, got {sigma}"
        )));
    }

    if sigma <= 0.0 && size <= 7 {
        return Ok(SMALL_KERNELS[size / 2].to_vec());
    }

    let sigma = if sigma > 0.0 {
        sigma
    } else {
        0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8
    };

    let center = (size as f64 - 1.0) / 2.0;
    let scale = -0.5 / (sigma * sigma);
    let raw: Vec<f64> = (0..size)
        .map(|i| {
            let x = i as f64 - center;
            (scale * x * x).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();

    Ok(raw.into_iter().map(|v| (v / sum) as f32).collect())
}
