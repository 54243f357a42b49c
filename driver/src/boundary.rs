use pic_kinetics::accumulator::AccumulatorView;
use pic_kinetics::coordinates::GridIndex;
use pic_kinetics::grid::Grid;
use pic_kinetics::mover::BoundaryMover;
use pic_kinetics::particle::{Particle, ParticleMover};
use pic_kinetics::Float;

/// Walks a particle across cell faces, one face per call.
///
/// The interior wraps around periodically on every axis. No current is
/// deposited along the way.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaceHopMover;

/// Step a 1-based interior index by one cell with periodic wrap.
fn hop(index: GridIndex, forward: bool, n: usize) -> GridIndex {
    match (forward, index) {
        (true, i) if i >= n => 1,
        (true, i) => i + 1,
        (false, i) if i <= 1 => n,
        (false, i) => i - 1,
    }
}

impl BoundaryMover for FaceHopMover {
    fn move_p(
        &self,
        particle: &mut Particle,
        mover: &mut ParticleMover,
        _accumulator: AccumulatorView<'_>,
        grid: &Grid,
        _qsp: Float,
    ) -> bool {
        // Full displacement is twice the stored half displacement.
        let disp = mover.displacement().map(|d| 2. * d);
        let mut position = particle.position();

        // Fraction of the remaining path until the first face crossing.
        let mut t: Float = 1.;
        let mut axis = None;
        for (k, (&x, &d)) in position.iter().zip(&disp).enumerate() {
            if d == 0. {
                continue;
            }
            let face = if d > 0. { 1. } else { -1. };
            let f = (face - x) / d;
            if f < t {
                t = f.max(0.);
                axis = Some(k);
            }
        }

        for (x, d) in position.iter_mut().zip(&disp) {
            *x = (*x + t * d).clamp(-1., 1.);
        }
        let Some(axis) = axis else {
            [particle.dx, particle.dy, particle.dz] = position;
            *mover = ParticleMover {
                i: mover.i,
                ..ParticleMover::default()
            };
            return false;
        };

        let forward = disp[axis] > 0.;
        position[axis] = if forward { -1. } else { 1. };
        let mut index = grid.unvoxel(particle.i);
        let n = [grid.nx, grid.ny, grid.nz];
        index[axis] = hop(index[axis], forward, n[axis]);
        particle.i = grid.voxel(index[0], index[1], index[2]);
        [particle.dx, particle.dy, particle.dz] = position;

        let rest = 1. - t;
        mover.dispx *= rest;
        mover.dispy *= rest;
        mover.dispz *= rest;
        true
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use pic_kinetics::accumulator::AccumulatorArray;

    use super::*;

    fn grid() -> Arc<Grid> {
        Arc::new(Grid::new([3, 2, 2], [1.; 3], 1., 1.).unwrap())
    }

    /// Call the mover until it finishes, counting the calls.
    fn walk(grid: &Grid, particle: &mut Particle, mut mover: ParticleMover) -> usize {
        let aa = AccumulatorArray::new(Arc::new(grid.clone()), 1).unwrap();
        let mut calls = 1;
        while FaceHopMover.move_p(particle, &mut mover, aa.replica(0), grid, -1.) {
            calls += 1;
            assert!(calls < 100, "mover does not terminate");
        }
        calls
    }

    #[test]
    fn test_hop_wraps() {
        assert_eq!(2, hop(1, true, 3));
        assert_eq!(1, hop(3, true, 3));
        assert_eq!(3, hop(1, false, 3));
        assert_eq!(1, hop(2, false, 3));
    }

    #[test]
    fn test_single_face_crossing() {
        let grid = grid();
        let mut p = Particle {
            dx: 0.5,
            i: grid.voxel(1, 1, 1),
            w: 1.,
            ..Particle::default()
        };
        // Full displacement of 1 along x.
        let pm = ParticleMover {
            dispx: 0.5,
            i: 7,
            ..ParticleMover::default()
        };

        assert_eq!(2, walk(&grid, &mut p, pm));

        assert_eq!(grid.voxel(2, 1, 1), p.i);
        assert!((p.dx + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_periodic_wrap_backwards() {
        let grid = grid();
        let mut p = Particle {
            dy: -0.8,
            i: grid.voxel(2, 1, 2),
            ..Particle::default()
        };
        let pm = ParticleMover {
            dispy: -0.2,
            ..ParticleMover::default()
        };

        walk(&grid, &mut p, pm);

        assert_eq!(grid.voxel(2, 2, 2), p.i);
        assert!((p.dy - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_multi_cell_crossing() {
        let grid = grid();
        let mut p = Particle {
            dx: 0.,
            i: grid.voxel(1, 1, 1),
            ..Particle::default()
        };
        // Full displacement of 5.5 local units: through cells 2 and 3 into cell 1 again.
        let pm = ParticleMover {
            dispx: 2.75,
            ..ParticleMover::default()
        };

        assert_eq!(4, walk(&grid, &mut p, pm));

        assert_eq!(grid.voxel(1, 1, 1), p.i);
        assert!((p.dx + 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_diagonal_crossing_stays_in_cell_bounds() {
        let grid = grid();
        let mut p = Particle {
            dx: 0.9,
            dy: -0.9,
            dz: 0.3,
            i: grid.voxel(3, 1, 2),
            ..Particle::default()
        };
        let pm = ParticleMover {
            dispx: 0.4,
            dispy: -0.3,
            dispz: 0.1,
            ..ParticleMover::default()
        };

        walk(&grid, &mut p, pm);

        assert!(grid.is_interior(p.i));
        assert!(p.position().iter().all(|x| x.abs() <= 1.));
        assert_eq!(grid.voxel(1, 2, 2), p.i);
    }
}
