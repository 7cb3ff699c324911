// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Collaborator traits for the projector-camera rig.
//
// Implementations may block; the core calls them synchronously and never
// retries. Failures come back as `Capture`, `Display`, or `CornerSelection`
// errors.

use chromaloop_core::Quadrilateral;
use chromaloop_core::error::Result;
use image::RgbImage;

/// Produces captured camera frames.
pub trait FrameSource {
    /// Block until the next frame is available.
    fn next_frame(&mut self) -> Result<RgbImage>;
}

/// Puts a frame in front of the camera.
pub trait DisplaySink {
    /// Render `frame`. Returns once it is visible.
    fn show(&mut self, frame: &RgbImage) -> Result<()>;
}

/// Asks a person for the corners of the projected region.
pub trait UserCornerSelector {
    /// Block until four points have been picked on `frame`.
    ///
    /// Fails with `CornerSelection` when the interaction ends with a
    /// different number of points.
    fn select(&mut self, frame: &RgbImage) -> Result<Quadrilateral>;
}

impl<T: FrameSource + ?Sized> FrameSource for &mut T {
    fn next_frame(&mut self) -> Result<RgbImage> {
        (**self).next_frame()
    }
}

impl<T: DisplaySink + ?Sized> DisplaySink for &mut T {
    fn show(&mut self, frame: &RgbImage) -> Result<()> {
        (**self).show(frame)
    }
}

impl<T: UserCornerSelector + ?Sized> UserCornerSelector for &mut T {
    fn select(&mut self, frame: &RgbImage) -> Result<Quadrilateral> {
        (**self).select(frame)
    }
}
