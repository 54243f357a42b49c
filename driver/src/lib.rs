pub mod boundary;
pub mod config;

use std::sync::Arc;

use pic_kinetics::accumulator::AccumulatorArray;
use pic_kinetics::coordinates::local_coordinate;
use pic_kinetics::grid::Grid;
use pic_kinetics::interpolator::InterpolatorArray;
use pic_kinetics::mover::BoundaryMover;
use pic_kinetics::particle::Particle;
use pic_kinetics::pipeline::Pipelines;
use pic_kinetics::sort::SpatialSort;
use pic_kinetics::species::Species;
use pic_kinetics::{Float, PicError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::boundary::FaceHopMover;
use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("failed to read configuration: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error(transparent)]
    Pic(#[from] PicError),
}

/// What happened during one step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepSummary {
    pub step: usize,
    /// Movers queued by the advance.
    pub nm: usize,
    /// Movers dropped for lack of storage.
    pub n_ignored: usize,
    /// Mover calls needed to finish the queued movers.
    pub hops: usize,
    pub kinetic_energy: Float,
    /// Sum of the deposited current over all cells and replicas, per axis.
    pub current: [Float; 3],
}

/// One species advanced in uniform fields.
pub struct Simulation {
    pub species: Species,
    accumulators: AccumulatorArray,
    interpolators: InterpolatorArray,
    pipelines: Pipelines,
    sorter: SpatialSort,
    mover: FaceHopMover,
    step: usize,
}

impl Simulation {
    pub fn new(config: &Config) -> Result<Self, DriverError> {
        let grid = Arc::new(Grid::new(
            config.grid.cells,
            config.grid.spacing,
            config.grid.dt,
            config.grid.cvac,
        )?);
        let max_nm = (config.n_particles as f64 * config.mover_fraction).ceil() as usize;
        let mut species = Species::new(
            config.species.name.clone(),
            config.species.q,
            config.species.m,
            config.n_particles,
            max_nm,
            grid.clone(),
        )?;
        load_particles(&mut species, config.n_particles, config.u_thermal, config.seed)?;

        let pipelines = Pipelines::new(&config.pipeline)?;
        Ok(Self {
            accumulators: AccumulatorArray::new(grid.clone(), pipelines.n_pipeline())?,
            interpolators: InterpolatorArray::uniform(grid.clone(), config.fields.e, config.fields.cb),
            sorter: SpatialSort::new(&grid)?,
            pipelines,
            species,
            mover: FaceHopMover,
            step: 0,
        })
    }

    pub fn accumulators(&self) -> &AccumulatorArray {
        &self.accumulators
    }

    /// Advance, finish the movers, then sort.
    pub fn step(&mut self) -> Result<StepSummary, DriverError> {
        self.accumulators.clear();
        let report = self.pipelines.advance_p(
            &mut self.species,
            &self.accumulators,
            &self.interpolators,
            &self.mover,
        )?;
        let hops = resolve_movers(&mut self.species, &self.accumulators, &self.mover);
        self.sorter.sort_p(&mut self.species)?;
        self.step += 1;

        let summary = StepSummary {
            step: self.step,
            nm: report.nm,
            n_ignored: report.n_ignored(),
            hops,
            kinetic_energy: self.species.kinetic_energy(),
            current: net_current(&self.accumulators),
        };
        log::info!(
            "step {}: {} movers ({} ignored, {} hops), kinetic energy {:.6e}, current {:?}",
            summary.step,
            summary.nm,
            summary.n_ignored,
            summary.hops,
            summary.kinetic_energy,
            summary.current
        );
        Ok(summary)
    }
}

/// Fill `sp` with `n` particles spread uniformly over the interior, which starts at the origin.
///
/// Momenta are uniform in `[-u_thermal, u_thermal)` on every axis.
pub fn load_particles(sp: &mut Species, n: usize, u_thermal: Float, seed: u64) -> Result<(), PicError> {
    let grid = Arc::clone(sp.grid());
    let mut rng = StdRng::seed_from_u64(seed);
    let momentum = |rng: &mut StdRng| {
        if u_thermal > 0. {
            rng.gen_range(-u_thermal..u_thermal)
        } else {
            0.
        }
    };
    let axes = [(grid.nx, grid.dx), (grid.ny, grid.dy), (grid.nz, grid.dz)];
    for _ in 0..n {
        let [(ix, dx), (iy, dy), (iz, dz)] = axes.map(|(cells, width)| {
            let x = rng.gen_range(0. ..cells as Float * width);
            local_coordinate(x, 0., width, cells)
        });
        sp.push_particle(Particle {
            dx,
            dy,
            dz,
            i: grid.voxel(ix, iy, iz),
            ux: momentum(&mut rng),
            uy: momentum(&mut rng),
            uz: momentum(&mut rng),
            w: 1.,
        })?;
    }
    log::debug!("loaded {} {} particles", n, sp.name);
    Ok(())
}

/// Run every queued mover of `sp` to completion and clear the queue.
///
/// Follow-up calls deposit into the host replica. Returns the number of calls.
pub fn resolve_movers<M: BoundaryMover>(sp: &mut Species, aa: &AccumulatorArray, mover: &M) -> usize {
    let grid = Arc::clone(sp.grid());
    let qsp = sp.q;
    let queued = sp.movers().to_vec();
    let particles = sp.particles_mut();
    let mut hops = 0;
    for mut pm in queued {
        let particle = &mut particles[pm.i];
        loop {
            hops += 1;
            if !mover.move_p(particle, &mut pm, aa.replica(0), &grid, qsp) {
                break;
            }
        }
    }
    sp.clear_movers();
    hops
}

/// Per-axis sum of the deposited current.
pub fn net_current(aa: &AccumulatorArray) -> [Float; 3] {
    let mut total = [0.; 3];
    for cell in 0..aa.grid().n_cells() {
        let values = aa.cell_total(cell);
        for (axis, j) in values.chunks_exact(4).enumerate() {
            total[axis] += j.iter().sum::<Float>();
        }
    }
    total
}

pub fn run(config: &Config) -> Result<Vec<StepSummary>, DriverError> {
    let mut simulation = Simulation::new(config)?;
    log::info!(
        "running {} steps of {} {} particles on {} pipelines",
        config.steps,
        simulation.species.np(),
        simulation.species.name,
        config.pipeline.n_pipeline
    );
    (0..config.steps).map(|_| simulation.step()).collect()
}
