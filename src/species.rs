use std::sync::Arc;

use crate::coordinates::CellIndex;
use crate::grid::Grid;
use crate::particle::{Particle, ParticleMover};
use crate::scratch::IndexBuffer;
use crate::{Float, PicError};

/// A population of macro-particles sharing charge and mass.
///
/// Storage for particles and movers is reserved up front. Workers of a pipeline
/// advance write into disjoint parts of it.
#[derive(Debug)]
pub struct Species {
    pub name: String,
    /// Charge of one physical particle.
    pub q: Float,
    /// Mass of one physical particle.
    pub m: Float,
    max_np: usize,
    pub(crate) particles: Vec<Particle>,
    /// Always `max_nm` long. The first `nm` entries are live.
    pub(crate) movers: Vec<ParticleMover>,
    pub(crate) nm: usize,
    pub(crate) grid: Arc<Grid>,
    /// First particle of each cell after the last sort, plus the particle count.
    pub(crate) cell_offsets: IndexBuffer,
    pub(crate) offsets_current: bool,
}

impl Species {
    pub fn new(
        name: impl Into<String>,
        q: Float,
        m: Float,
        max_np: usize,
        max_nm: usize,
        grid: Arc<Grid>,
    ) -> Result<Self, PicError> {
        let mut particles = Vec::new();
        particles
            .try_reserve_exact(max_np)
            .map_err(|_| PicError::Allocation {
                what: "particles",
                len: max_np,
            })?;
        let mut movers = Vec::new();
        movers
            .try_reserve_exact(max_nm)
            .map_err(|_| PicError::Allocation {
                what: "particle movers",
                len: max_nm,
            })?;
        movers.resize(max_nm, ParticleMover::default());
        let cell_offsets = IndexBuffer::try_with_len("cell offsets", grid.n_cells() + 1)?;
        Ok(Self {
            name: name.into(),
            q,
            m,
            max_np,
            particles,
            movers,
            nm: 0,
            grid,
            cell_offsets,
            offsets_current: false,
        })
    }

    pub fn grid(&self) -> &Arc<Grid> {
        &self.grid
    }

    /// Point the species at a new grid, resizing the cell offset map.
    ///
    /// Every particle must already carry a cell index valid on `grid`.
    pub fn set_grid(&mut self, grid: Arc<Grid>) -> Result<(), PicError> {
        let n_cells = grid.n_cells();
        if let Some(p) = self.particles.iter().find(|p| p.i >= n_cells) {
            return Err(PicError::CellOutOfRange { cell: p.i, n_cells });
        }
        self.cell_offsets.resize(n_cells + 1)?;
        self.grid = grid;
        self.offsets_current = false;
        Ok(())
    }

    pub fn np(&self) -> usize {
        self.particles.len()
    }

    pub fn max_np(&self) -> usize {
        self.max_np
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Mutable access to the particles. Invalidates the cell offset map.
    pub fn particles_mut(&mut self) -> &mut [Particle] {
        self.offsets_current = false;
        &mut self.particles
    }

    pub fn push_particle(&mut self, particle: Particle) -> Result<(), PicError> {
        let n_cells = self.grid.n_cells();
        if particle.i >= n_cells {
            return Err(PicError::CellOutOfRange {
                cell: particle.i,
                n_cells,
            });
        }
        if self.particles.len() == self.max_np {
            return Err(PicError::SpeciesFull(self.name.clone()));
        }
        self.particles.push(particle);
        self.offsets_current = false;
        Ok(())
    }

    /// Movers queued by the last advance.
    pub fn movers(&self) -> &[ParticleMover] {
        &self.movers[..self.nm]
    }

    pub fn nm(&self) -> usize {
        self.nm
    }

    pub fn max_nm(&self) -> usize {
        self.movers.len()
    }

    pub fn clear_movers(&mut self) {
        self.nm = 0;
    }

    /// Start offset of every cell's particles, followed by the particle count.
    ///
    /// Only available between a sort and the next change to the particles.
    pub fn cell_offsets(&self) -> Option<&[usize]> {
        self.offsets_current.then_some(&self.cell_offsets[..])
    }

    /// Particles of one cell, if the cell offset map is current.
    pub fn cell_particles(&self, cell: CellIndex) -> Option<&[Particle]> {
        let offsets = self.cell_offsets()?;
        let start = *offsets.get(cell)?;
        let end = *offsets.get(cell + 1)?;
        Some(&self.particles[start..end])
    }

    /// Kinetic energy `sum w m c^2 (gamma - 1)`.
    pub fn kinetic_energy(&self) -> Float {
        let c2 = self.grid.cvac * self.grid.cvac;
        self.particles
            .iter()
            .map(|p| {
                let u2 = p.ux * p.ux + p.uy * p.uy + p.uz * p.uz;
                // gamma - 1 without cancellation for slow particles.
                p.w * u2 / (1. + (1. + u2).sqrt())
            })
            .sum::<Float>()
            * self.m
            * c2
    }
}
