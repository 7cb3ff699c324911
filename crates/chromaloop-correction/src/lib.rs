// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// chromaloop-correction — Scoring and colour correction for the
// projector-camera loop.
//
// Provides the normalized distance metric, mean colour transfer, the bounded
// history of per-frame corrections, and the family of correction controllers
// (static, trailing mean/median, iterative spatial feedback).

pub mod buffer;
pub mod color;
pub mod iterative;
pub mod metric;
pub mod strategy;

pub use buffer::CorrectionBuffer;
pub use color::{color_correct, mean_offset};
pub use iterative::IterativeSpatialFeedback;
pub use metric::distance;
pub use metric::distance as score;
pub use strategy::{
    Baseline, BufferStatistic, CorrectionStrategy, StaticOnce, Strategy, TrailingBuffer,
};
