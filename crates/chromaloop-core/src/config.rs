// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Run configuration.

use serde::{Deserialize, Serialize};

use crate::error::{ChromaloopError, Result};
use crate::types::{CannyThresholds, Point2D};

/// Whether the iterative controller re-filters the error on every cycle or
/// filters once on the first cycle and reuses that delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    #[default]
    EveryCycle,
    FirstCycleOnly,
}

/// Which correction controller a run uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// Never correct; measures uncorrected drift.
    Baseline,
    /// Mean offset measured on the first frame, frozen afterwards.
    StaticOnce,
    /// Mean of the last `capacity` per-frame mean offsets.
    TrailingMean { capacity: usize },
    /// Median of the last `capacity` per-frame mean offsets.
    TrailingMedian { capacity: usize },
    /// Several measure-and-correct cycles within each frame.
    IterativeSpatial {
        iterations: usize,
        #[serde(default = "default_kernel_size")]
        kernel_size: usize,
        #[serde(default = "default_sigma")]
        sigma: f64,
        #[serde(default = "default_clamp_bound")]
        clamp_bound: f32,
        #[serde(default)]
        filter_mode: FilterMode,
    },
}

fn default_kernel_size() -> usize {
    25
}

fn default_sigma() -> f64 {
    5.0
}

fn default_clamp_bound() -> f32 {
    2.0
}

impl StrategyConfig {
    /// Iterative controller with the default filter parameters.
    pub fn iterative(iterations: usize, filter_mode: FilterMode) -> Self {
        Self::IterativeSpatial {
            iterations,
            kernel_size: default_kernel_size(),
            sigma: default_sigma(),
            clamp_bound: default_clamp_bound(),
            filter_mode,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Baseline | Self::StaticOnce => Ok(()),
            Self::TrailingMean { capacity } | Self::TrailingMedian { capacity } => {
                if *capacity == 0 {
                    return Err(ChromaloopError::InvalidConfig(
                        "trailing buffer capacity must be at least 1".into(),
                    ));
                }
                Ok(())
            }
            Self::IterativeSpatial {
                iterations,
                kernel_size,
                sigma,
                clamp_bound,
                ..
            } => {
                if *iterations == 0 {
                    return Err(ChromaloopError::InvalidConfig(
                        "iterative correction needs at least one iteration".into(),
                    ));
                }
                if *kernel_size == 0 || kernel_size % 2 == 0 {
                    return Err(ChromaloopError::InvalidConfig(format!(
                        "filter kernel size must be odd, got {kernel_size}"
                    )));
                }
                if !(sigma.is_finite() && *sigma > 0.0) {
                    return Err(ChromaloopError::InvalidConfig(format!(
                        "filter sigma must be positive, got {sigma}"
                    )));
                }
                if !(clamp_bound.is_finite() && *clamp_bound >= 0.0) {
                    return Err(ChromaloopError::InvalidConfig(format!(
                        "clamp bound must be non-negative, got {clamp_bound}"
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Tuning for automatic corner detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Canny thresholds to use instead of the Otsu-derived pair.
    pub manual_threshold: Option<CannyThresholds>,
    /// Side of the square Gaussian blur kernel.
    pub blur_kernel: usize,
    /// Side of the square dilation kernel.
    pub dilate_kernel: usize,
    /// Side of the square erosion kernel.
    pub erode_kernel: usize,
    /// Polygon simplification tolerance as a fraction of contour perimeter.
    pub epsilon_fraction: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            manual_threshold: None,
            blur_kernel: 5,
            dilate_kernel: 11,
            erode_kernel: 7,
            epsilon_fraction: 0.02,
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, size) in [
            ("blur", self.blur_kernel),
            ("dilate", self.dilate_kernel),
            ("erode", self.erode_kernel),
        ] {
            if size == 0 || size % 2 == 0 || size > 511 {
                return Err(ChromaloopError::InvalidConfig(format!(
                    "{name} kernel must be odd and at most 511, got {size}"
                )));
            }
        }
        if !(self.epsilon_fraction.is_finite() && self.epsilon_fraction > 0.0) {
            return Err(ChromaloopError::InvalidConfig(format!(
                "epsilon fraction must be positive, got {}",
                self.epsilon_fraction
            )));
        }
        if let Some(t) = self.manual_threshold {
            if !(t.low >= 0.0 && t.low <= t.high) {
                return Err(ChromaloopError::InvalidConfig(format!(
                    "manual threshold must satisfy 0 <= low <= high, got ({}, {})",
                    t.low, t.high
                )));
            }
        }
        Ok(())
    }
}

/// Where the corners of the projected region come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum CornerConfig {
    /// Known corners, in any order.
    Manual { points: Vec<Point2D> },
    /// Detect the region in every captured frame.
    AutoDetect,
    /// Ask the user once, on a calibration frame.
    Interactive,
}

/// Persistent settings for one experiment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopConfig {
    pub strategy: StrategyConfig,
    pub corners: CornerConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyConfig::Baseline,
            corners: CornerConfig::AutoDetect,
            detection: DetectionConfig::default(),
        }
    }
}

impl LoopConfig {
    pub fn validate(&self) -> Result<()> {
        self.strategy.validate()?;
        self.detection.validate()?;
        if let CornerConfig::Manual { points } = &self.corners {
            if points.len() != 4 {
                return Err(ChromaloopError::InvalidConfig(format!(
                    "manual corners need exactly 4 points, got {}",
                    points.len()
                )));
            }
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LoopConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
