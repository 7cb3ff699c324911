// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Correction controllers.
//
// Every controller sees one `(reference, aligned capture)` pair per
// observation and answers with a full-resolution correction map to add to the
// next displayed frame. Uniform corrections are broadcast up front, so callers
// never care which controller produced a map.

use chromaloop_core::CorrectionMap;
use chromaloop_core::config::StrategyConfig;
use chromaloop_core::error::{Result, ensure_same_shape};
use image::RgbImage;
use tracing::{debug, info};

use crate::buffer::CorrectionBuffer;
use crate::color::mean_offset_map;
use crate::iterative::IterativeSpatialFeedback;

/// A stateful colour-correction controller.
pub trait CorrectionStrategy {
    /// Short identifier used in logs and records.
    fn name(&self) -> &'static str;

    /// Update internal state from one observation.
    fn observe(&mut self, reference: &RgbImage, aligned_capture: &RgbImage) -> Result<()>;

    /// The correction to add to the next displayed frame.
    fn current_correction(&self) -> CorrectionMap;

    /// How many display/capture cycles one reference frame gets.
    fn cycles_per_frame(&self) -> usize {
        1
    }

    /// Called once before the first cycle of every frame attempt.
    fn begin_frame(&mut self, _reference: &RgbImage) {}

    /// The frame to display for `reference`: reference plus correction,
    /// clamped to `[0, 255]`.
    fn display_frame(&self, reference: &RgbImage) -> Result<RgbImage> {
        self.current_correction().apply_to(reference)
    }
}

/// Reject observations whose frames do not match the controller's frame size.
pub(crate) fn check_observation(
    frame: (u32, u32),
    reference: &RgbImage,
    aligned_capture: &RgbImage,
) -> Result<()> {
    ensure_same_shape(frame, reference.dimensions())?;
    ensure_same_shape(reference.dimensions(), aligned_capture.dimensions())
}

// -- Baseline -----------------------------------------------------------------

/// Never corrects. Measures how far the rig drifts on its own.
#[derive(Debug, Clone)]
pub struct Baseline {
    width: u32,
    height: u32,
}

impl Baseline {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl CorrectionStrategy for Baseline {
    fn name(&self) -> &'static str {
        "baseline"
    }

    fn observe(&mut self, reference: &RgbImage, aligned_capture: &RgbImage) -> Result<()> {
        check_observation((self.width, self.height), reference, aligned_capture)
    }

    fn current_correction(&self) -> CorrectionMap {
        CorrectionMap::zeros(self.width, self.height)
    }
}

// -- StaticOnce ---------------------------------------------------------------

/// Mean offset of the first observation, frozen for the rest of the run.
#[derive(Debug, Clone)]
pub struct StaticOnce {
    width: u32,
    height: u32,
    frozen: Option<CorrectionMap>,
}

impl StaticOnce {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frozen: None,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }
}

impl CorrectionStrategy for StaticOnce {
    fn name(&self) -> &'static str {
        "static_once"
    }

    fn observe(&mut self, reference: &RgbImage, aligned_capture: &RgbImage) -> Result<()> {
        check_observation((self.width, self.height), reference, aligned_capture)?;
        if self.frozen.is_none() {
            let map = mean_offset_map(reference, aligned_capture)?;
            info!(offset = ?map.channel_means(), "Static correction frozen");
            self.frozen = Some(map);
        }
        Ok(())
    }

    fn current_correction(&self) -> CorrectionMap {
        self.frozen
            .clone()
            .unwrap_or_else(|| CorrectionMap::zeros(self.width, self.height))
    }
}

// -- Trailing buffers ---------------------------------------------------------

/// Which statistic a [`TrailingBuffer`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferStatistic {
    Mean,
    Median,
}

/// Per-frame mean offsets kept in a bounded history and summarised by their
/// elementwise mean or median.
#[derive(Debug, Clone)]
pub struct TrailingBuffer {
    width: u32,
    height: u32,
    statistic: BufferStatistic,
    buffer: CorrectionBuffer,
}

impl TrailingBuffer {
    pub fn new(width: u32, height: u32, capacity: usize, statistic: BufferStatistic) -> Result<Self> {
        Ok(Self {
            width,
            height,
            statistic,
            buffer: CorrectionBuffer::new(capacity)?,
        })
    }

    pub fn mean(width: u32, height: u32, capacity: usize) -> Result<Self> {
        Self::new(width, height, capacity, BufferStatistic::Mean)
    }

    pub fn median(width: u32, height: u32, capacity: usize) -> Result<Self> {
        Self::new(width, height, capacity, BufferStatistic::Median)
    }

    pub fn statistic(&self) -> BufferStatistic {
        self.statistic
    }

    pub fn buffer(&self) -> &CorrectionBuffer {
        &self.buffer
    }
}

impl CorrectionStrategy for TrailingBuffer {
    fn name(&self) -> &'static str {
        match self.statistic {
            BufferStatistic::Mean => "trailing_mean",
            BufferStatistic::Median => "trailing_median",
        }
    }

    fn observe(&mut self, reference: &RgbImage, aligned_capture: &RgbImage) -> Result<()> {
        check_observation((self.width, self.height), reference, aligned_capture)?;
        let map = mean_offset_map(reference, aligned_capture)?;
        debug!(offset = ?map.channel_means(), "Frame offset measured");
        self.buffer.push(map)
    }

    fn current_correction(&self) -> CorrectionMap {
        let summary = match self.statistic {
            BufferStatistic::Mean => self.buffer.mean(),
            BufferStatistic::Median => self.buffer.median(),
        };
        summary.unwrap_or_else(|| CorrectionMap::zeros(self.width, self.height))
    }
}

// -- Tagged dispatch ----------------------------------------------------------

/// Any controller, chosen at run time from configuration.
#[derive(Debug, Clone)]
pub enum Strategy {
    Baseline(Baseline),
    StaticOnce(StaticOnce),
    Trailing(TrailingBuffer),
    IterativeSpatial(IterativeSpatialFeedback),
}

impl Strategy {
    /// Build the configured controller for `width` x `height` reference
    /// frames.
    pub fn from_config(config: &StrategyConfig, width: u32, height: u32) -> Result<Self> {
        config.validate()?;
        let strategy = match config {
            StrategyConfig::Baseline => Self::Baseline(Baseline::new(width, height)),
            StrategyConfig::StaticOnce => Self::StaticOnce(StaticOnce::new(width, height)),
            StrategyConfig::TrailingMean { capacity } => {
                Self::Trailing(TrailingBuffer::mean(width, height, *capacity)?)
            }
            StrategyConfig::TrailingMedian { capacity } => {
                Self::Trailing(TrailingBuffer::median(width, height, *capacity)?)
            }
            StrategyConfig::IterativeSpatial {
                iterations,
                kernel_size,
                sigma,
                clamp_bound,
                filter_mode,
            } => Self::IterativeSpatial(IterativeSpatialFeedback::new(
                width,
                height,
                *iterations,
                *kernel_size,
                *sigma,
                *clamp_bound,
                *filter_mode,
            )?),
        };
        info!(strategy = strategy.name(), width, height, "Correction strategy ready");
        Ok(strategy)
    }

    fn inner(&self) -> &dyn CorrectionStrategy {
        match self {
            Self::Baseline(s) => s,
            Self::StaticOnce(s) => s,
            Self::Trailing(s) => s,
            Self::IterativeSpatial(s) => s,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn CorrectionStrategy {
        match self {
            Self::Baseline(s) => s,
            Self::StaticOnce(s) => s,
            Self::Trailing(s) => s,
            Self::IterativeSpatial(s) => s,
        }
    }
}

impl CorrectionStrategy for Strategy {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn observe(&mut self, reference: &RgbImage, aligned_capture: &RgbImage) -> Result<()> {
        self.inner_mut().observe(reference, aligned_capture)
    }

    fn current_correction(&self) -> CorrectionMap {
        self.inner().current_correction()
    }

    fn cycles_per_frame(&self) -> usize {
        self.inner().cycles_per_frame()
    }

    fn begin_frame(&mut self, reference: &RgbImage) {
        self.inner_mut().begin_frame(reference)
    }

    fn display_frame(&self, reference: &RgbImage) -> Result<RgbImage> {
        self.inner().display_frame(reference)
    }
}
