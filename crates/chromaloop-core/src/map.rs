// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Signed, full-resolution correction maps.
//
// Every correction the loop produces is one of these, even when it is a single
// per-channel offset: uniform corrections are broadcast across the frame at
// construction time.

use image::{ImageBuffer, Rgb, Rgb32FImage, RgbImage};

use crate::error::{Result, ensure_same_shape};

/// A height x width x 3 grid of signed `f32` channel offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionMap {
    map: Rgb32FImage,
}

impl CorrectionMap {
    // -- Construction ---------------------------------------------------------

    /// The identity correction.
    pub fn zeros(width: u32, height: u32) -> Self {
        Self {
            map: Rgb32FImage::new(width, height),
        }
    }

    /// A uniform per-channel offset spread over the whole frame.
    pub fn broadcast(width: u32, height: u32, offset: [f32; 3]) -> Self {
        Self {
            map: ImageBuffer::from_pixel(width, height, Rgb(offset)),
        }
    }

    /// Widen an 8-bit image into a map holding its channel values.
    pub fn from_image(image: &RgbImage) -> Self {
        let map = ImageBuffer::from_fn(image.width(), image.height(), |x, y| {
            let Rgb([r, g, b]) = *image.get_pixel(x, y);
            Rgb([r as f32, g as f32, b as f32])
        });
        Self { map }
    }

    /// Per-pixel `minuend - subtrahend`, widened before subtracting.
    pub fn difference(minuend: &RgbImage, subtrahend: &RgbImage) -> Result<Self> {
        ensure_same_shape(minuend.dimensions(), subtrahend.dimensions())?;
        let mut out = Self::zeros(minuend.width(), minuend.height());
        for (value, (&a, &b)) in out
            .map
            .iter_mut()
            .zip(minuend.as_raw().iter().zip(subtrahend.as_raw()))
        {
            *value = a as f32 - b as f32;
        }
        Ok(out)
    }

    /// Wrap a raw interleaved RGB buffer. Returns `None` when the buffer
    /// length does not match `width * height * 3`.
    pub fn from_raw(width: u32, height: u32, data: Vec<f32>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, data).map(|map| Self { map })
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.map.width()
    }

    pub fn height(&self) -> u32 {
        self.map.height()
    }

    /// `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        self.map.dimensions()
    }

    /// Channel offsets at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> [f32; 3] {
        self.map.get_pixel(x, y).0
    }

    /// Interleaved RGB values, row-major.
    pub fn as_slice(&self) -> &[f32] {
        self.map.as_raw()
    }

    /// Mutable interleaved RGB values, row-major.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.map
    }

    /// Per-channel mean over the whole map. Zero for an empty map.
    pub fn channel_means(&self) -> [f32; 3] {
        let count = self.map.width() as f64 * self.map.height() as f64;
        if count == 0.0 {
            return [0.0; 3];
        }
        let mut sums = [0.0f64; 3];
        for pixel in self.map.pixels() {
            for (sum, &value) in sums.iter_mut().zip(pixel.0.iter()) {
                *sum += value as f64;
            }
        }
        sums.map(|s| (s / count) as f32)
    }

    // -- Arithmetic -----------------------------------------------------------

    /// Elementwise `self += other`.
    pub fn accumulate(&mut self, other: &CorrectionMap) -> Result<()> {
        ensure_same_shape(self.dimensions(), other.dimensions())?;
        for (value, &delta) in self.map.iter_mut().zip(other.map.iter()) {
            *value += delta;
        }
        Ok(())
    }

    /// Elementwise `self - other`.
    pub fn subtract(&self, other: &CorrectionMap) -> Result<CorrectionMap> {
        ensure_same_shape(self.dimensions(), other.dimensions())?;
        let mut out = self.clone();
        for (value, &b) in out.map.iter_mut().zip(other.map.iter()) {
            *value -= b;
        }
        Ok(out)
    }

    /// Restrict every value to `[lower, upper]`.
    pub fn clamp(&mut self, lower: f32, upper: f32) {
        for value in self.map.iter_mut() {
            *value = value.clamp(lower, upper);
        }
    }

    /// Restrict every value to `[-bound, bound]`.
    pub fn clamp_symmetric(&mut self, bound: f32) {
        let bound = bound.abs();
        self.clamp(-bound, bound);
    }

    /// Add this correction to an 8-bit frame, clamping to `[0, 255]` and
    /// truncating back to bytes.
    pub fn apply_to(&self, image: &RgbImage) -> Result<RgbImage> {
        ensure_same_shape(self.dimensions(), image.dimensions())?;
        let mut out = image.clone();
        for (channel, &offset) in out.iter_mut().zip(self.map.iter()) {
            *channel = to_channel(*channel as f32 + offset);
        }
        Ok(out)
    }

    /// Narrow to an 8-bit image, clamping to `[0, 255]` and truncating.
    pub fn to_image(&self) -> RgbImage {
        let mut out = RgbImage::new(self.width(), self.height());
        for (channel, &value) in out.iter_mut().zip(self.map.iter()) {
            *channel = to_channel(value);
        }
        out
    }

    // -- Filtering ------------------------------------------------------------

    /// Separable low-pass filter: the same odd-length 1D `kernel` is run
    /// along rows and then columns. Borders reflect without repeating the
    /// edge sample (`dcb|abcd|cba`).
    pub fn filtered(&self, kernel: &[f32]) -> CorrectionMap {
        let (width, height) = self.dimensions();
        if width == 0 || height == 0 || kernel.is_empty() {
            return self.clone();
        }
        let radius = (kernel.len() / 2) as isize;
        let (w, h) = (width as usize, height as usize);
        let src = self.map.as_raw();

        let mut rows = vec![0.0f32; src.len()];
        for y in 0..h {
            for x in 0..w {
                let mut acc = [0.0f32; 3];
                for (k, &kv) in kernel.iter().enumerate() {
                    let sx = reflect101(x as isize + k as isize - radius, w);
                    let base = (y * w + sx) * 3;
                    for c in 0..3 {
                        acc[c] += src[base + c] * kv;
                    }
                }
                rows[(y * w + x) * 3..(y * w + x) * 3 + 3].copy_from_slice(&acc);
            }
        }

        let mut result = Self::zeros(width, height);
        let out: &mut [f32] = &mut result.map;
        for y in 0..h {
            for x in 0..w {
                let mut acc = [0.0f32; 3];
                for (k, &kv) in kernel.iter().enumerate() {
                    let sy = reflect101(y as isize + k as isize - radius, h);
                    let base = (sy * w + x) * 3;
                    for c in 0..3 {
                        acc[c] += rows[base + c] * kv;
                    }
                }
                out[(y * w + x) * 3..(y * w + x) * 3 + 3].copy_from_slice(&acc);
            }
        }

        result
    }
}

fn to_channel(value: f32) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

/// Map a possibly out-of-range index into `0..len` by mirroring about the
/// edge samples.
fn reflect101(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = (2 * len - 2) as isize;
    let r = i.rem_euclid(period) as usize;
    if r < len { r } else { 2 * len - 2 - r }
}
