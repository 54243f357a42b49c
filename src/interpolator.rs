use std::sync::Arc;

use ndarray::Array1;

use crate::coordinates::{CellIndex, LocalCoordinate};
use crate::grid::Grid;
use crate::Float;

/// Per-cell expansion coefficients of the electric and magnetic field.
///
/// E is bilinear in the two transverse offsets, B is linear along its own axis.
/// The magnetic coefficients are stored premultiplied by `c` (`cbx = c Bx`).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct Interpolator {
    pub ex: Float,
    pub dexdy: Float,
    pub dexdz: Float,
    pub d2exdydz: Float,
    pub ey: Float,
    pub deydz: Float,
    pub deydx: Float,
    pub d2eydzdx: Float,
    pub ez: Float,
    pub dezdx: Float,
    pub dezdy: Float,
    pub d2ezdxdy: Float,
    pub cbx: Float,
    pub dcbxdx: Float,
    pub cby: Float,
    pub dcbydy: Float,
    pub cbz: Float,
    pub dcbzdz: Float,
}

impl Interpolator {
    /// Constant fields across the cell.
    pub fn uniform([ex, ey, ez]: [Float; 3], [cbx, cby, cbz]: [Float; 3]) -> Self {
        Self {
            ex,
            ey,
            ez,
            cbx,
            cby,
            cbz,
            ..Self::default()
        }
    }

    /// Half of the electric impulse over one step, `qdt_2mc * E` at the offset.
    #[inline]
    pub fn half_impulse(
        &self,
        qdt_2mc: Float,
        [dx, dy, dz]: [LocalCoordinate; 3],
    ) -> [Float; 3] {
        [
            qdt_2mc * ((self.ex + dy * self.dexdy) + dz * (self.dexdz + dy * self.d2exdydz)),
            qdt_2mc * ((self.ey + dz * self.deydz) + dx * (self.deydx + dz * self.d2eydzdx)),
            qdt_2mc * ((self.ez + dx * self.dezdx) + dy * (self.dezdy + dx * self.d2ezdxdy)),
        ]
    }

    /// `c B` at the offset.
    #[inline]
    pub fn magnetic(&self, [dx, dy, dz]: [LocalCoordinate; 3]) -> [Float; 3] {
        [
            self.cbx + dx * self.dcbxdx,
            self.cby + dy * self.dcbydy,
            self.cbz + dz * self.dcbzdz,
        ]
    }
}

/// One interpolator per cell of a grid, ghost cells included.
#[derive(Debug, Clone)]
pub struct InterpolatorArray {
    pub(crate) grid: Arc<Grid>,
    pub(crate) i: Array1<Interpolator>,
}

impl InterpolatorArray {
    /// Zero fields everywhere.
    pub fn new(grid: Arc<Grid>) -> Self {
        let i = Array1::from_elem(grid.n_cells(), Interpolator::default());
        Self { grid, i }
    }

    pub fn uniform(grid: Arc<Grid>, e: [Float; 3], cb: [Float; 3]) -> Self {
        let i = Array1::from_elem(grid.n_cells(), Interpolator::uniform(e, cb));
        Self { grid, i }
    }

    pub fn grid(&self) -> &Arc<Grid> {
        &self.grid
    }

    pub fn get(&self, cell: CellIndex) -> Option<&Interpolator> {
        self.i.get(cell)
    }

    /// Replace the coefficients of one cell. Returns `false` if `cell` is out of range.
    pub fn set(&mut self, cell: CellIndex, interpolator: Interpolator) -> bool {
        match self.i.get_mut(cell) {
            Some(slot) => {
                *slot = interpolator;
                true
            }
            None => false,
        }
    }
}

impl std::ops::Index<CellIndex> for InterpolatorArray {
    type Output = Interpolator;

    fn index(&self, cell: CellIndex) -> &Self::Output {
        &self.i[cell]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_uniform_fields_ignore_offset() {
        let f = Interpolator::uniform([1., 2., 3.], [4., 5., 6.]);
        for offset in [[0., 0., 0.], [1., -1., 0.5], [-0.3, 0.2, -1.]] {
            assert_eq!([0.5, 1., 1.5], f.half_impulse(0.5, offset));
            assert_eq!([4., 5., 6.], f.magnetic(offset));
        }
    }

    #[test]
    fn test_half_impulse_cross_terms() {
        let f = Interpolator {
            ex: 1.,
            dexdy: 2.,
            dexdz: 3.,
            d2exdydz: 4.,
            ..Interpolator::default()
        };
        // ex + dy dexdy + dz dexdz + dy dz d2exdydz
        let expected = 1. + 0.5 * 2. + -0.25 * 3. + 0.5 * -0.25 * 4.;
        assert_eq!(expected, f.half_impulse(1., [0.9, 0.5, -0.25])[0]);
    }

    #[test]
    fn test_magnetic_gradient() {
        let f = Interpolator {
            cbx: 1.,
            dcbxdx: 0.5,
            cbz: -1.,
            dcbzdz: 2.,
            ..Interpolator::default()
        };
        assert_eq!([1.25, 0., -2.], f.magnetic([0.5, 0.7, -0.5]));
    }

    #[test]
    fn test_array_sized_to_grid() {
        let grid = Arc::new(Grid::new([3, 2, 1], [1.; 3], 0.1, 1.).unwrap());
        let mut array = InterpolatorArray::new(grid.clone());
        assert_eq!(grid.n_cells(), array.i.len());
        assert!(array.set(5, Interpolator::uniform([1., 0., 0.], [0.; 3])));
        assert!(!array.set(grid.n_cells(), Interpolator::default()));
        assert_eq!(1., array[5].ex);
        assert!(array.get(grid.n_cells()).is_none());
    }
}
