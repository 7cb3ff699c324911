// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded FIFO history of per-frame correction maps.

use std::collections::VecDeque;

use chromaloop_core::CorrectionMap;
use chromaloop_core::error::{ChromaloopError, Result, ensure_same_shape};
use tracing::debug;

/// The last `capacity` correction maps, oldest first.
///
/// All entries share one shape: the first map pushed fixes it.
#[derive(Debug, Clone)]
pub struct CorrectionBuffer {
    capacity: usize,
    entries: VecDeque<CorrectionMap>,
}

impl CorrectionBuffer {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ChromaloopError::InvalidConfig(
                "correction buffer capacity must be at least 1".into(),
            ));
        }
        Ok(Self {
            capacity,
            entries: VecDeque::with_capacity(capacity + 1),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &CorrectionMap> {
        self.entries.iter()
    }

    /// Append `map`, evicting the oldest entry once over capacity.
    pub fn push(&mut self, map: CorrectionMap) -> Result<()> {
        if let Some(front) = self.entries.front() {
            ensure_same_shape(front.dimensions(), map.dimensions())?;
        }
        self.entries.push_back(map);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        debug!(len = self.entries.len(), capacity = self.capacity, "Correction buffered");
        Ok(())
    }

    /// Elementwise mean of the buffered maps, `None` when empty.
    pub fn mean(&self) -> Option<CorrectionMap> {
        let first = self.entries.front()?;
        let (width, height) = first.dimensions();
        let n = self.entries.len() as f64;

        let mut sums = vec![0.0f64; first.as_slice().len()];
        for entry in &self.entries {
            for (sum, &value) in sums.iter_mut().zip(entry.as_slice()) {
                *sum += value as f64;
            }
        }
        let mut out = CorrectionMap::zeros(width, height);
        for (value, sum) in out.as_mut_slice().iter_mut().zip(sums) {
            *value = (sum / n) as f32;
        }
        Some(out)
    }

    /// Elementwise median of the buffered maps, `None` when empty. With an
    /// even number of entries the two middle values are averaged.
    pub fn median(&self) -> Option<CorrectionMap> {
        let first = self.entries.front()?;
        let (width, height) = first.dimensions();
        let n = self.entries.len();

        let mut column = vec![0.0f32; n];
        let mut out = CorrectionMap::zeros(width, height);
        for (i, value) in out.as_mut_slice().iter_mut().enumerate() {
            for (slot, entry) in column.iter_mut().zip(&self.entries) {
                *slot = entry.as_slice()[i];
            }
            column.sort_by(f32::total_cmp);
            *value = if n % 2 == 1 {
                column[n / 2]
            } else {
                (column[n / 2 - 1] + column[n / 2]) / 2.0
            };
        }
        Some(out)
    }
}
