// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Chromaloop — Core types, correction maps, and error definitions shared
// across all crates.

pub mod config;
pub mod error;
pub mod kernel;
pub mod map;
pub mod types;

pub use config::LoopConfig;
pub use error::ChromaloopError;
pub use map::CorrectionMap;
pub use types::*;
