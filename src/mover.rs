use crate::accumulator::AccumulatorView;
use crate::grid::Grid;
use crate::particle::{Particle, ParticleMover};
use crate::Float;

/// Resolves the motion of a particle whose streak leaves its cell.
///
/// Implementations own the geometry of cell crossings and the current they
/// deposit on the way. They are called concurrently from every pipeline, each
/// with its own accumulator replica.
pub trait BoundaryMover: Sync {
    /// Move `particle` along `mover`'s displacement as far as this call can take it.
    ///
    /// `mover.i` is the index of `particle` in its species. On return `mover`
    /// holds whatever displacement is left. Returns `true` if the mover has to be
    /// queued for another pass.
    fn move_p(
        &self,
        particle: &mut Particle,
        mover: &mut ParticleMover,
        accumulator: AccumulatorView<'_>,
        grid: &Grid,
        qsp: Float,
    ) -> bool;
}
