// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-frame feedback driver.
//
// A session owns one correction strategy, one rectifier, and the rig's
// display and camera for the lifetime of a run. Each reference frame goes
// through as many display/capture cycles as the strategy asks for; every
// cycle is rectified, scored against the reference, and fed back.
// Persisting records and rectified frames is left to the caller.

use chrono::Utc;
use chromaloop_core::config::CornerConfig;
use chromaloop_core::error::{ChromaloopError, Result, ensure_same_shape};
use chromaloop_core::{FrameRecord, LoopConfig, Quadrilateral, RunId};
use chromaloop_correction::{CorrectionStrategy, Strategy, distance};
use chromaloop_geometry::{CornerSource, Rectifier, canonicalize};
use image::RgbImage;
use tracing::{debug, info, instrument, warn};

use crate::traits::{DisplaySink, FrameSource, UserCornerSelector};

/// Result of driving one reference frame through the loop.
#[derive(Debug, Clone)]
pub struct FrameOutcome {
    pub record: FrameRecord,
    /// Rectified capture from the final cycle.
    pub rectified: RgbImage,
}

/// Closed projector-camera loop for one run.
pub struct FeedbackSession<S, D> {
    run_id: RunId,
    source: S,
    sink: D,
    strategy: Strategy,
    rectifier: Rectifier,
    /// `None` until interactive corners have been picked.
    corners: Option<CornerSource>,
    reference_size: (u32, u32),
    frame_index: u32,
}

impl<S: FrameSource, D: DisplaySink> FeedbackSession<S, D> {
    /// Set up a run over `reference_width` x `reference_height` frames.
    ///
    /// Manual corners are canonicalized here. Interactive corners must be
    /// picked with [`calibrate`](Self::calibrate) before the first frame.
    #[instrument(skip_all, fields(width = reference_width, height = reference_height))]
    pub fn new(
        config: &LoopConfig,
        reference_width: u32,
        reference_height: u32,
        source: S,
        sink: D,
    ) -> Result<Self> {
        config.validate()?;
        let strategy = Strategy::from_config(&config.strategy, reference_width, reference_height)?;
        let rectifier = Rectifier::new(config.detection.clone())?;
        let corners = match &config.corners {
            CornerConfig::Manual { points } => {
                let quad = Quadrilateral::try_from_points(points)?;
                Some(CornerSource::Supplied(canonicalize(&quad)))
            }
            CornerConfig::AutoDetect => Some(CornerSource::AutoDetect),
            CornerConfig::Interactive => None,
        };

        let run_id = RunId::new();
        info!(%run_id, strategy = strategy.name(), "Feedback session created");
        Ok(Self {
            run_id,
            source,
            sink,
            strategy,
            rectifier,
            corners,
            reference_size: (reference_width, reference_height),
            frame_index: 0,
        })
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }

    /// Corners in use, if resolved.
    pub fn corner_source(&self) -> Option<&CornerSource> {
        self.corners.as_ref()
    }

    /// Frames attempted so far.
    pub fn frames_run(&self) -> u32 {
        self.frame_index
    }

    /// Show `calibration`, capture it, and ask `selector` for the projected
    /// region's corners. The canonicalized result is used for every later
    /// frame.
    #[instrument(skip_all, fields(run_id = %self.run_id))]
    pub fn calibrate<U: UserCornerSelector>(
        &mut self,
        calibration: &RgbImage,
        selector: &mut U,
    ) -> Result<Quadrilateral> {
        self.sink.show(calibration)?;
        let captured = self.source.next_frame()?;
        let quad = canonicalize(&selector.select(&captured)?);
        info!(corners = ?quad.points(), "Corners selected");
        self.corners = Some(CornerSource::Supplied(quad));
        Ok(quad)
    }

    /// Drive `reference` through the strategy's cycles.
    ///
    /// Any failure aborts the frame and is returned unchanged; the strategy
    /// keeps whatever it observed in earlier cycles.
    #[instrument(skip_all, fields(run_id = %self.run_id, frame = self.frame_index))]
    pub fn run_frame(&mut self, reference: &RgbImage) -> Result<FrameOutcome> {
        let frame_index = self.frame_index;
        self.frame_index += 1;

        ensure_same_shape(self.reference_size, reference.dimensions())?;
        let corners = self.corners.ok_or_else(|| {
            ChromaloopError::InvalidConfig(
                "interactive corners have not been selected; call calibrate first".into(),
            )
        })?;
        let (width, height) = self.reference_size;

        let cycles = self.strategy.cycles_per_frame();
        let mut cycle_distances = Vec::with_capacity(cycles);
        let mut rectified = None;

        self.strategy.begin_frame(reference);
        for cycle in 0..cycles {
            let shown = self.strategy.display_frame(reference)?;
            self.sink.show(&shown)?;
            let captured = self.source.next_frame()?;
            let aligned = self.rectifier.rectify(&captured, &corners, width, height)?;

            let score = distance(reference, &aligned)?;
            debug!(cycle, distance = score.value(), "Cycle scored");
            self.strategy.observe(reference, &aligned)?;

            cycle_distances.push(score);
            rectified = Some(aligned);
        }

        let Some(rectified) = rectified else {
            return Err(ChromaloopError::InvalidConfig(
                "strategy requested zero cycles per frame".into(),
            ));
        };

        let record = FrameRecord {
            run_id: self.run_id,
            frame_index,
            cycle_distances,
            captured_at: Utc::now(),
        };
        info!(
            distance = record.final_distance().map(|d| d.value()),
            "Frame complete"
        );
        Ok(FrameOutcome { record, rectified })
    }

    /// Run every frame in order, skipping frames that fail locally.
    ///
    /// Skipped frames still consume a frame index. The first failure that is
    /// not frame-local ends the run.
    pub fn run_frames<'a>(
        &mut self,
        references: impl IntoIterator<Item = &'a RgbImage>,
    ) -> Result<Vec<FrameOutcome>> {
        let mut outcomes = Vec::new();
        for reference in references {
            match self.run_frame(reference) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) if e.is_frame_local() => {
                    warn!(frame = self.frame_index - 1, error = %e, "Frame skipped");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(outcomes)
    }

    /// Hand back the collaborators.
    pub fn into_parts(self) -> (S, D) {
        (self.source, self.sink)
    }
}
