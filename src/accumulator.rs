use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use ndarray::parallel::prelude::*;
use ndarray::{Array3, ArrayView1, ArrayView2, Axis};

use crate::coordinates::CellIndex;
use crate::grid::Grid;
use crate::{Float, PicError, ACCUMULATOR_WIDTH, MAX_PIPELINE};

/// f32 with atomic addition, stored as its bit pattern.
#[derive(Debug, Default)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: Float) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    pub fn load(&self, order: Ordering) -> Float {
        Float::from_bits(self.0.load(order))
    }

    pub fn store(&self, value: Float, order: Ordering) {
        self.0.store(value.to_bits(), order)
    }

    /// Add `value` and return the previous value.
    pub fn fetch_add(&self, value: Float, order: Ordering) -> Float {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let new = (Float::from_bits(current) + value).to_bits();
            match self
                .0
                .compare_exchange_weak(current, new, order, Ordering::Relaxed)
            {
                Ok(previous) => return Float::from_bits(previous),
                Err(actual) => current = actual,
            }
        }
    }
}

/// One replica of the accumulator array: `[cell, 12]`.
pub type AccumulatorView<'a> = ArrayView2<'a, AtomicF32>;
/// The 12 current values of one cell: `jx[4], jy[4], jz[4]`.
pub type CellAccumulator<'a> = ArrayView1<'a, AtomicF32>;

/// Per-cell current accumulators, replicated once for the host and once per pipeline.
///
/// Accumulator values are 4 times the charge that crossed the corresponding
/// quadrant of the cell during a step. Reducing the replicas into one current
/// density is left to the field solver.
#[derive(Debug)]
pub struct AccumulatorArray {
    pub(crate) grid: Arc<Grid>,
    n_pipeline: usize,
    /// Shape `[1 + n_pipeline, stride, 12]`.
    a: Array3<AtomicF32>,
}

impl AccumulatorArray {
    pub fn new(grid: Arc<Grid>, n_pipeline: usize) -> Result<Self, PicError> {
        if n_pipeline == 0 || n_pipeline > MAX_PIPELINE {
            return Err(PicError::InvalidPipelineCount {
                requested: n_pipeline,
                max: MAX_PIPELINE,
            });
        }
        let stride = Self::stride_for(&grid);
        let len = (1 + n_pipeline) * stride * ACCUMULATOR_WIDTH;
        let mut storage: Vec<AtomicF32> = Vec::new();
        storage
            .try_reserve_exact(len)
            .map_err(|_| PicError::Allocation {
                what: "accumulator array",
                len,
            })?;
        storage.resize_with(len, AtomicF32::default);
        let a = Array3::from_shape_vec((1 + n_pipeline, stride, ACCUMULATOR_WIDTH), storage)
            .map_err(|e| PicError::InvalidGrid(e.to_string()))?;
        Ok(Self { grid, n_pipeline, a })
    }

    /// Cells per replica, rounded up to an even count.
    fn stride_for(grid: &Grid) -> usize {
        (grid.n_cells() + 1) & !1
    }

    pub fn grid(&self) -> &Arc<Grid> {
        &self.grid
    }

    pub fn n_pipeline(&self) -> usize {
        self.n_pipeline
    }

    pub fn n_replicas(&self) -> usize {
        self.a.len_of(Axis(0))
    }

    pub fn stride(&self) -> usize {
        self.a.len_of(Axis(1))
    }

    /// Replica 0 belongs to the host, replica `1 + rank` to pipeline `rank`.
    ///
    /// # Panics
    /// Panics if `replica >= n_replicas()`.
    pub fn replica(&self, replica: usize) -> AccumulatorView<'_> {
        self.a.index_axis(Axis(0), replica)
    }

    /// Zero every replica.
    pub fn clear(&mut self) {
        self.a
            .par_iter()
            .for_each(|value| value.store(0., Ordering::Relaxed));
    }

    /// Current values of one cell in one replica.
    pub fn load(&self, replica: usize, cell: CellIndex) -> [Float; ACCUMULATOR_WIDTH] {
        let row = self.a.index_axis(Axis(0), replica);
        let mut out = [0.; ACCUMULATOR_WIDTH];
        for (value, slot) in out.iter_mut().zip(row.index_axis(Axis(0), cell)) {
            *value = slot.load(Ordering::Relaxed);
        }
        out
    }

    /// Sum of one cell over all replicas.
    pub fn cell_total(&self, cell: CellIndex) -> [Float; ACCUMULATOR_WIDTH] {
        let mut total = [0.; ACCUMULATOR_WIDTH];
        for replica in 0..self.n_replicas() {
            for (sum, value) in total.iter_mut().zip(self.load(replica, cell)) {
                *sum += value;
            }
        }
        total
    }
}
