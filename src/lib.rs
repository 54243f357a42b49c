pub mod accumulator;
pub mod advance;
pub mod coordinates;
pub mod error;
pub mod grid;
pub mod interpolator;
pub mod mover;
pub mod particle;
pub mod pipeline;
pub mod scratch;
pub mod sort;
pub mod species;

pub use error::PicError;

/// Floating point type of particles, fields and accumulators.
///
/// Fixed to f32 because accumulator slots are backed by 32 bit atomics.
pub type Float = f32;

/// Number of particles in one pipeline block. Workers only ever get whole blocks.
pub const PARTICLE_BLOCK: usize = 16;
/// Number of movers in one pipeline block.
pub const MOVER_BLOCK: usize = 8;
/// Upper bound on the number of worker pipelines.
pub const MAX_PIPELINE: usize = 16;
/// Number of current values stored per cell in an accumulator.
pub const ACCUMULATOR_WIDTH: usize = 12;
