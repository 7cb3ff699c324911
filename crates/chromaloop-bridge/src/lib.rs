// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// chromaloop-bridge — Boundary between the correction core and the physical
// rig.
//
// The traits describe what the loop needs from a camera, a display, and a
// person picking corners. `memory` and `sim` provide in-process stand-ins;
// `session` drives one reference frame at a time through display, capture,
// rectification, scoring, and correction.

pub mod memory;
pub mod session;
pub mod sim;
pub mod traits;

pub use memory::{RecordingSink, ReplaySource, ScriptedSelector};
pub use session::{FeedbackSession, FrameOutcome};
pub use sim::{SimulatedCamera, SimulatedDisplay, SimulatedRig};
pub use traits::{DisplaySink, FrameSource, UserCornerSelector};
