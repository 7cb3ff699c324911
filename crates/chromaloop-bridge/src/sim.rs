// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Simulated projector/camera rig.
//
// The display and the camera share one screen. Whatever was last shown is
// placed, unscaled, at a fixed spot inside a larger camera canvas, with a
// constant per-channel colour drift standing in for the projector and
// camera response.

use std::cell::RefCell;
use std::rc::Rc;

use chromaloop_core::Quadrilateral;
use chromaloop_core::error::{ChromaloopError, Result};
use image::{Rgb, RgbImage};

use crate::traits::{DisplaySink, FrameSource};

#[derive(Debug, Default)]
struct Screen {
    latest: Option<RgbImage>,
    shown: usize,
}

/// Geometry and colour response of a simulated rig.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedRig {
    canvas_width: u32,
    canvas_height: u32,
    origin: (u32, u32),
    background: Rgb<u8>,
    drift: [i16; 3],
}

impl SimulatedRig {
    /// A rig whose camera sees a `canvas_width` x `canvas_height` frame with
    /// the projection's top-left pixel at `origin`.
    pub fn new(canvas_width: u32, canvas_height: u32, origin: (u32, u32)) -> Self {
        Self {
            canvas_width,
            canvas_height,
            origin,
            background: Rgb([12, 12, 16]),
            drift: [0; 3],
        }
    }

    /// Added to every projected channel before the camera sees it.
    pub fn with_drift(mut self, drift: [i16; 3]) -> Self {
        self.drift = drift;
        self
    }

    pub fn with_background(mut self, background: Rgb<u8>) -> Self {
        self.background = background;
        self
    }

    /// Where a `width` x `height` projection lands in the camera frame, as
    /// outer pixel edges.
    pub fn region(&self, width: u32, height: u32) -> Quadrilateral {
        let (x0, y0) = (self.origin.0 as f64, self.origin.1 as f64);
        let (x1, y1) = (x0 + width as f64, y0 + height as f64);
        Quadrilateral::from_pairs([(x0, y0), (x1, y0), (x1, y1), (x0, y1)])
    }

    /// Split into a display and a camera looking at the same screen.
    pub fn split(self) -> (SimulatedDisplay, SimulatedCamera) {
        let screen = Rc::new(RefCell::new(Screen::default()));
        (
            SimulatedDisplay {
                rig: self,
                screen: Rc::clone(&screen),
            },
            SimulatedCamera { rig: self, screen },
        )
    }

    fn capture(&self, projected: &RgbImage) -> RgbImage {
        let mut canvas = RgbImage::from_pixel(self.canvas_width, self.canvas_height, self.background);
        let (ox, oy) = self.origin;
        for (x, y, pixel) in projected.enumerate_pixels() {
            let Rgb(channels) = *pixel;
            let out: [u8; 3] = std::array::from_fn(|c| {
                (channels[c] as i16 + self.drift[c]).clamp(0, 255) as u8
            });
            canvas.put_pixel(ox + x, oy + y, Rgb(out));
        }
        canvas
    }
}

/// Display half of a [`SimulatedRig`].
#[derive(Debug)]
pub struct SimulatedDisplay {
    rig: SimulatedRig,
    screen: Rc<RefCell<Screen>>,
}

impl SimulatedDisplay {
    /// Frames shown so far.
    pub fn shown(&self) -> usize {
        self.screen.borrow().shown
    }
}

impl DisplaySink for SimulatedDisplay {
    fn show(&mut self, frame: &RgbImage) -> Result<()> {
        let (ox, oy) = self.rig.origin;
        let fits = ox as u64 + frame.width() as u64 <= self.rig.canvas_width as u64
            && oy as u64 + frame.height() as u64 <= self.rig.canvas_height as u64;
        if !fits {
            tracing::warn!(
                width = frame.width(),
                height = frame.height(),
                "Frame does not fit the simulated screen"
            );
            return Err(ChromaloopError::Display(format!(
                "{}x{} frame does not fit at {:?} in a {}x{} canvas",
                frame.width(),
                frame.height(),
                self.rig.origin,
                self.rig.canvas_width,
                self.rig.canvas_height
            )));
        }
        let mut screen = self.screen.borrow_mut();
        screen.latest = Some(frame.clone());
        screen.shown += 1;
        Ok(())
    }
}

/// Camera half of a [`SimulatedRig`].
#[derive(Debug)]
pub struct SimulatedCamera {
    rig: SimulatedRig,
    screen: Rc<RefCell<Screen>>,
}

impl FrameSource for SimulatedCamera {
    fn next_frame(&mut self) -> Result<RgbImage> {
        let screen = self.screen.borrow();
        match &screen.latest {
            Some(projected) => Ok(self.rig.capture(projected)),
            None => {
                tracing::warn!("SimulatedCamera::next_frame called before anything was shown");
                Err(ChromaloopError::Capture("nothing on screen".into()))
            }
        }
    }
}
