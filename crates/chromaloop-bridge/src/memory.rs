// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory collaborators for replaying recorded sessions and for tests.

use std::collections::VecDeque;

use chromaloop_core::error::{ChromaloopError, Result};
use chromaloop_core::{Point2D, Quadrilateral};
use image::RgbImage;

use crate::traits::{DisplaySink, FrameSource, UserCornerSelector};

/// Hands out pre-recorded frames in order.
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    frames: VecDeque<RgbImage>,
}

impl ReplaySource {
    pub fn new(frames: impl IntoIterator<Item = RgbImage>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for ReplaySource {
    fn next_frame(&mut self) -> Result<RgbImage> {
        self.frames.pop_front().ok_or_else(|| {
            tracing::warn!("ReplaySource::next_frame called with no frames left");
            ChromaloopError::Capture("replay exhausted".into())
        })
    }
}

/// Keeps every frame it is asked to show.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    shown: Vec<RgbImage>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames shown so far, oldest first.
    pub fn shown(&self) -> &[RgbImage] {
        &self.shown
    }

    pub fn last(&self) -> Option<&RgbImage> {
        self.shown.last()
    }
}

impl DisplaySink for RecordingSink {
    fn show(&mut self, frame: &RgbImage) -> Result<()> {
        self.shown.push(frame.clone());
        Ok(())
    }
}

/// Answers every selection with a fixed list of clicks.
#[derive(Debug, Clone)]
pub struct ScriptedSelector {
    clicks: Vec<Point2D>,
    calls: usize,
}

impl ScriptedSelector {
    pub fn new(clicks: impl IntoIterator<Item = Point2D>) -> Self {
        Self {
            clicks: clicks.into_iter().collect(),
            calls: 0,
        }
    }

    /// How many times a selection was requested.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl UserCornerSelector for ScriptedSelector {
    fn select(&mut self, _frame: &RgbImage) -> Result<Quadrilateral> {
        self.calls += 1;
        Quadrilateral::try_from_points(&self.clicks)
    }
}
