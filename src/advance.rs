//! Relativistic Boris push and charge-conserving current deposition for one particle.

use std::sync::atomic::Ordering;

use crate::accumulator::CellAccumulator;
use crate::grid::Grid;
use crate::interpolator::Interpolator;
use crate::particle::Particle;
use crate::species::Species;
use crate::Float;

const ONE_THIRD: Float = 1. / 3.;
const TWO_FIFTEENTHS: Float = 2. / 15.;

/// Per-species constants of the particle push.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    /// `q dt / (2 m c)`.
    pub qdt_2mc: Float,
    /// `c dt / dx`.
    pub cdt_dx: Float,
    pub cdt_dy: Float,
    pub cdt_dz: Float,
    /// Charge of one physical particle.
    pub qsp: Float,
}

impl Coefficients {
    pub fn new(sp: &Species, grid: &Grid) -> Self {
        Self {
            qdt_2mc: (sp.q * grid.dt) / (2. * sp.m * grid.cvac),
            cdt_dx: grid.cvac * grid.dt * grid.rdx,
            cdt_dy: grid.cvac * grid.dt * grid.rdy,
            cdt_dz: grid.cvac * grid.dt * grid.rdz,
            qsp: sp.q,
        }
    }
}

/// Rotate `u` about the magnetic field `cb` with the relativistic Boris scheme.
///
/// The rotation angle comes from a rational approximation of `tan(theta / 2)`,
/// so `|u|` is preserved up to rounding.
#[inline]
pub fn boris_rotate([ux, uy, uz]: [Float; 3], [cbx, cby, cbz]: [Float; 3], qdt_2mc: Float) -> [Float; 3] {
    let v0 = qdt_2mc / (1. + (ux * ux + (uy * uy + uz * uz))).sqrt();
    let v1 = cbx * cbx + (cby * cby + cbz * cbz);
    let v2 = (v0 * v0) * v1;
    let v3 = v0 * (1. + v2 * (ONE_THIRD + v2 * TWO_FIFTEENTHS));
    let mut v4 = v3 / (1. + v1 * (v3 * v3));
    v4 += v4;
    // u' = u + v3 (u x cB)
    let px = ux + v3 * (uy * cbz - uz * cby);
    let py = uy + v3 * (uz * cbx - ux * cbz);
    let pz = uz + v3 * (ux * cby - uy * cbx);
    [
        ux + v4 * (py * cbz - pz * cby),
        uy + v4 * (pz * cbx - px * cbz),
        uz + v4 * (px * cby - py * cbx),
    ]
}

/// Update the momentum of `p` over one step: half electric push, magnetic
/// rotation, half electric push.
#[inline]
pub fn push_momentum(p: &mut Particle, f: &Interpolator, qdt_2mc: Float) {
    let offset = p.position();
    let [hax, hay, haz] = f.half_impulse(qdt_2mc, offset);
    let cb = f.magnetic(offset);
    let u = [p.ux + hax, p.uy + hay, p.uz + haz];
    let [ux, uy, uz] = boris_rotate(u, cb, qdt_2mc);
    p.ux = ux + hax;
    p.uy = uy + hay;
    p.uz = uz + haz;
}

/// Straight-line motion of a particle over one step in cell-local units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Streak {
    /// Half of the displacement.
    pub half: [Float; 3],
    pub midpoint: [Float; 3],
    pub end: [Float; 3],
}

impl Streak {
    pub fn new(p: &Particle, k: &Coefficients) -> Self {
        let rgamma = 1. / p.gamma();
        let half = [
            p.ux * k.cdt_dx * rgamma,
            p.uy * k.cdt_dy * rgamma,
            p.uz * k.cdt_dz * rgamma,
        ];
        let midpoint = [p.dx + half[0], p.dy + half[1], p.dz + half[2]];
        let end = [
            midpoint[0] + half[0],
            midpoint[1] + half[1],
            midpoint[2] + half[2],
        ];
        Self { half, midpoint, end }
    }

    /// Whether the streak ends inside the cell it started in.
    pub fn in_bounds(&self) -> bool {
        self.end.iter().all(|&v| v <= 1. && -v <= 1.)
    }
}

/// Add the current of one axis to a cell accumulator.
///
/// `u` is the half displacement along the current's axis, `dy` and `dz` the
/// streak midpoint along the two transverse axes in cyclic order, and
/// `correction` the charge-conservation term `q ux uy uz / 3`. The four values
/// go to the transverse quadrants `(-,-), (+,-), (-,+), (+,+)` starting at
/// `offset`.
#[inline]
fn accumulate_j(
    a: &CellAccumulator<'_>,
    offset: usize,
    q: Float,
    u: Float,
    dy: Float,
    dz: Float,
    correction: Float,
) {
    let qu = q * u;
    let low_y = qu - qu * dy;
    let high_y = qu + qu * dy;
    let low_z = 1. - dz;
    let high_z = 1. + dz;
    let values = [
        low_y * low_z + correction,
        high_y * low_z - correction,
        low_y * high_z - correction,
        high_y * high_z + correction,
    ];
    for (k, value) in values.into_iter().enumerate() {
        a[offset + k].fetch_add(value, Ordering::Relaxed);
    }
}

/// Deposit the current of a streak that stays inside its cell.
///
/// Values are 4 times the charge crossing each quadrant, which makes the
/// discrete continuity equation hold exactly for trilinear charge assignment.
pub fn deposit(a: &CellAccumulator<'_>, q: Float, streak: &Streak) {
    let [ux, uy, uz] = streak.half;
    let [dx, dy, dz] = streak.midpoint;
    let correction = q * ux * uy * uz * ONE_THIRD;
    accumulate_j(a, 0, q, ux, dy, dz, correction);
    accumulate_j(a, 4, q, uy, dz, dx, correction);
    accumulate_j(a, 8, q, uz, dx, dy, correction);
}

/// Advance one particle over one step.
///
/// The momentum is always updated. If the streak stays inside the cell the new
/// position is stored and the current deposited into `a`; otherwise the
/// position is left alone and the half displacement is returned for the
/// boundary mover.
#[inline]
pub fn advance_particle(
    p: &mut Particle,
    f: &Interpolator,
    k: &Coefficients,
    a: &CellAccumulator<'_>,
) -> Option<[Float; 3]> {
    push_momentum(p, f, k.qdt_2mc);
    let streak = Streak::new(p, k);
    if !streak.in_bounds() {
        return Some(streak.half);
    }
    [p.dx, p.dy, p.dz] = streak.end;
    deposit(a, p.w * k.qsp, &streak);
    None
}
