// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Chromaloop.

use thiserror::Error;

/// Top-level error type for all Chromaloop operations.
#[derive(Debug, Error)]
pub enum ChromaloopError {
    // -- Geometry errors --
    #[error("image shapes differ: {left:?} vs {right:?} (width, height)")]
    ShapeMismatch { left: (u32, u32), right: (u32, u32) },

    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("corner detection failed: simplified contour has {vertices} vertices, expected 4")]
    CornerDetectionFailure { vertices: usize },

    #[error("corner selection returned {got} points, expected {expected}")]
    CornerSelection { expected: usize, got: usize },

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Collaborators --
    #[error("frame capture failed: {0}")]
    Capture(String),

    #[error("frame display failed: {0}")]
    Display(String),
}

impl ChromaloopError {
    /// Whether the failure only spoils the current frame.
    ///
    /// Frame-local failures let an orchestrator skip the frame and carry on;
    /// everything else means the run itself is misconfigured or its
    /// collaborators are gone.
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            Self::ShapeMismatch { .. }
                | Self::DegenerateGeometry(_)
                | Self::CornerDetectionFailure { .. }
                | Self::Capture(_)
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ChromaloopError>;

/// Fail with `ShapeMismatch` unless both `(width, height)` pairs agree.
pub fn ensure_same_shape(left: (u32, u32), right: (u32, u32)) -> Result<()> {
    if left == right {
        Ok(())
    } else {
        Err(ChromaloopError::ShapeMismatch { left, right })
    }
}
