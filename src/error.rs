use crate::coordinates::CellIndex;

/// Errors reported by the particle advance and sort.
///
/// Except for [PicError::MoverOverflow] and [PicError::WorkerPanicked], the
/// requested step was not performed and the inputs are unchanged.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PicError {
    #[error("invalid grid: {0}")]
    InvalidGrid(String),
    /// Collaborating arrays were built for different grids.
    #[error("species and {0} do not share the same grid")]
    GridMismatch(&'static str),
    #[error("{what} sized for {actual} entries, grid needs {expected}")]
    ScratchMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("particle cell index {cell} out of range (n_cells={n_cells})")]
    CellOutOfRange { cell: CellIndex, n_cells: usize },
    #[error("species {0} is full")]
    SpeciesFull(String),
    #[error("failed to allocate {len} entries for {what}")]
    Allocation { what: &'static str, len: usize },
    #[error("number of pipelines must be in 1..={max}, got {requested}")]
    InvalidPipelineCount { requested: usize, max: usize },
    #[error("accumulator array has {actual} replicas, pipelines need {expected}")]
    ReplicaCount { expected: usize, actual: usize },
    /// Only returned with [crate::pipeline::OverflowPolicy::FailFast].
    #[error("pipeline {rank} ran out of storage for {ignored} movers")]
    MoverOverflow { rank: usize, ignored: usize },
    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
    #[error("pipeline {rank} panicked")]
    WorkerPanicked { rank: usize },
}
