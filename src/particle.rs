use crate::coordinates::{CellIndex, LocalCoordinate};
use crate::Float;

/// Macro-particle in cell-relative coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct Particle {
    pub dx: LocalCoordinate,
    pub dy: LocalCoordinate,
    pub dz: LocalCoordinate,
    /// Owning cell, ghost cells included.
    pub i: CellIndex,
    /// Momentum in units of `m c`.
    pub ux: Float,
    pub uy: Float,
    pub uz: Float,
    /// Statistical weight.
    pub w: Float,
}

impl Particle {
    pub fn position(&self) -> [LocalCoordinate; 3] {
        [self.dx, self.dy, self.dz]
    }

    pub fn momentum(&self) -> [Float; 3] {
        [self.ux, self.uy, self.uz]
    }

    /// Lorentz factor.
    pub fn gamma(&self) -> Float {
        (1. + self.ux * self.ux + self.uy * self.uy + self.uz * self.uz).sqrt()
    }
}

/// Displacement a particle still has to travel after leaving its cell mid-step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct ParticleMover {
    pub dispx: Float,
    pub dispy: Float,
    pub dispz: Float,
    /// Index of the particle in its species.
    pub i: usize,
}

impl ParticleMover {
    pub fn displacement(&self) -> [Float; 3] {
        [self.dispx, self.dispy, self.dispz]
    }
}
