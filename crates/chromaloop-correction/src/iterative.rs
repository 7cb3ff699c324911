// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Iterative spatially-filtered feedback.
//
// Unlike the frame-to-frame controllers, this one corrects a single reference
// frame over several display/capture cycles. Each cycle measures the per-pixel
// error between what was displayed and what the camera saw, smooths it, bounds
// the smoothed step, and folds both into the running correction.

use chromaloop_core::CorrectionMap;
use chromaloop_core::config::FilterMode;
use chromaloop_core::error::{ChromaloopError, Result};
use chromaloop_core::kernel::gaussian_kernel;
use image::RgbImage;
use tracing::{debug, info};

use crate::strategy::{CorrectionStrategy, check_observation};

/// Correction state for the reference frame currently being worked on.
#[derive(Debug, Clone)]
struct ActiveFrame {
    base: RgbImage,
    correction: CorrectionMap,
    /// Filtered step from the first cycle, kept for `FirstCycleOnly`.
    first_filtered: Option<CorrectionMap>,
    cycle: usize,
}

impl ActiveFrame {
    fn begin(reference: &RgbImage) -> Self {
        Self {
            base: reference.clone(),
            correction: CorrectionMap::zeros(reference.width(), reference.height()),
            first_filtered: None,
            cycle: 0,
        }
    }

    /// What is on screen: base plus correction, clipped to `[0, 255]`.
    fn estimate(&self) -> Result<RgbImage> {
        self.correction.apply_to(&self.base)
    }

    /// [`Self::estimate`] before truncation to bytes. Errors are measured
    /// against this so sub-unit corrections still count.
    fn estimate_map(&self) -> Result<CorrectionMap> {
        let mut estimate = CorrectionMap::from_image(&self.base);
        estimate.accumulate(&self.correction)?;
        estimate.clamp(0.0, 255.0);
        Ok(estimate)
    }
}

/// Closed-loop per-pixel controller with `iterations` cycles per frame.
#[derive(Debug, Clone)]
pub struct IterativeSpatialFeedback {
    width: u32,
    height: u32,
    iterations: usize,
    kernel: Vec<f32>,
    clamp_bound: f32,
    filter_mode: FilterMode,
    frame: Option<ActiveFrame>,
}

impl IterativeSpatialFeedback {
    pub fn new(
        width: u32,
        height: u32,
        iterations: usize,
        kernel_size: usize,
        sigma: f64,
        clamp_bound: f32,
        filter_mode: FilterMode,
    ) -> Result<Self> {
        if iterations == 0 {
            return Err(ChromaloopError::InvalidConfig(
                "iterative correction needs at least one iteration".into(),
            ));
        }
        if !(clamp_bound.is_finite() && clamp_bound >= 0.0) {
            return Err(ChromaloopError::InvalidConfig(format!(
                "clamp bound must be non-negative, got {clamp_bound}"
            )));
        }
        let kernel = gaussian_kernel(kernel_size, sigma)?;
        Ok(Self {
            width,
            height,
            iterations,
            kernel,
            clamp_bound,
            filter_mode,
            frame: None,
        })
    }

    /// Kernel 25, sigma 5, bound 2.
    pub fn with_defaults(
        width: u32,
        height: u32,
        iterations: usize,
        filter_mode: FilterMode,
    ) -> Result<Self> {
        Self::new(width, height, iterations, 25, 5.0, 2.0, filter_mode)
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.filter_mode
    }

    /// Cycles completed on the current frame, 0 before the first observation.
    pub fn cycles_completed(&self) -> usize {
        self.frame.as_ref().map_or(0, |f| f.cycle)
    }

    /// True when `reference` is the frame being corrected and it still has
    /// cycles left.
    fn is_active_for(&self, reference: &RgbImage) -> bool {
        self.frame
            .as_ref()
            .is_some_and(|f| f.cycle < self.iterations && f.base == *reference)
    }

}

/// Smoothed error, bounded to `[-bound, bound]`.
fn bounded_step(error: &CorrectionMap, kernel: &[f32], bound: f32) -> CorrectionMap {
    let mut step = error.filtered(kernel);
    step.clamp_symmetric(bound);
    step
}

impl CorrectionStrategy for IterativeSpatialFeedback {
    fn name(&self) -> &'static str {
        "iterative_spatial"
    }

    fn observe(&mut self, reference: &RgbImage, aligned_capture: &RgbImage) -> Result<()> {
        check_observation((self.width, self.height), reference, aligned_capture)?;

        if !self.is_active_for(reference) {
            debug!("Starting correction of a new frame");
            self.frame = Some(ActiveFrame::begin(reference));
        }
        let Some(frame) = self.frame.as_mut() else {
            return Ok(());
        };

        let error = frame
            .estimate_map()?
            .subtract(&CorrectionMap::from_image(aligned_capture))?;

        let step = match self.filter_mode {
            FilterMode::EveryCycle => bounded_step(&error, &self.kernel, self.clamp_bound),
            FilterMode::FirstCycleOnly => frame
                .first_filtered
                .get_or_insert_with(|| bounded_step(&error, &self.kernel, self.clamp_bound))
                .clone(),
        };

        frame.correction.accumulate(&error)?;
        frame.correction.accumulate(&step)?;
        frame.cycle += 1;

        debug!(
            cycle = frame.cycle,
            of = self.iterations,
            mean_error = ?error.channel_means(),
            "Feedback cycle applied"
        );
        if frame.cycle == self.iterations {
            info!(correction = ?frame.correction.channel_means(), "Frame correction complete");
        }
        Ok(())
    }

    fn current_correction(&self) -> CorrectionMap {
        self.frame
            .as_ref()
            .map(|f| f.correction.clone())
            .unwrap_or_else(|| CorrectionMap::zeros(self.width, self.height))
    }

    fn cycles_per_frame(&self) -> usize {
        self.iterations
    }

    /// Drops whatever an interrupted attempt left behind.
    fn begin_frame(&mut self, reference: &RgbImage) {
        debug!(iterations = self.iterations, "Starting correction of a new frame");
        self.frame = Some(ActiveFrame::begin(reference));
    }

    /// The corrected estimate while `reference` is being worked on; the bare
    /// reference when it is a new frame.
    fn display_frame(&self, reference: &RgbImage) -> Result<RgbImage> {
        match &self.frame {
            Some(frame) if self.is_active_for(reference) => frame.estimate(),
            _ => Ok(reference.clone()),
        }
    }
}
