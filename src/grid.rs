use crate::coordinates::{CellIndex, GridIndex};
use crate::{Float, PicError};

/// Uniform Cartesian grid with one ghost cell on each side of every axis.
///
/// The grid is immutable while particles are advanced and sorted. Species and
/// field arrays hold it through an `Arc` and must refer to the same instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    /// Interior cells along x, y and z.
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub dx: Float,
    pub dy: Float,
    pub dz: Float,
    pub rdx: Float,
    pub rdy: Float,
    pub rdz: Float,
    pub dt: Float,
    /// Speed of light in simulation units.
    pub cvac: Float,
}

impl Grid {
    pub fn new(
        [nx, ny, nz]: [usize; 3],
        [dx, dy, dz]: [Float; 3],
        dt: Float,
        cvac: Float,
    ) -> Result<Self, PicError> {
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(PicError::InvalidGrid(format!(
                "cell counts must be positive, got {nx}x{ny}x{nz}"
            )));
        }
        for (name, value) in [("dx", dx), ("dy", dy), ("dz", dz), ("dt", dt), ("cvac", cvac)] {
            if !(value.is_finite() && value > 0.) {
                return Err(PicError::InvalidGrid(format!("{name} must be positive, got {value}")));
            }
        }
        Ok(Self {
            nx,
            ny,
            nz,
            dx,
            dy,
            dz,
            rdx: 1. / dx,
            rdy: 1. / dy,
            rdz: 1. / dz,
            dt,
            cvac,
        })
    }

    /// Number of cells including the ghost layer.
    pub const fn n_cells(&self) -> usize {
        (self.nx + 2) * (self.ny + 2) * (self.nz + 2)
    }

    /// Flatten per-axis indices (ghost cells included) into a cell index. x runs fastest.
    pub const fn voxel(&self, ix: GridIndex, iy: GridIndex, iz: GridIndex) -> CellIndex {
        ix + (self.nx + 2) * (iy + (self.ny + 2) * iz)
    }

    pub const fn unvoxel(&self, cell: CellIndex) -> [GridIndex; 3] {
        let sx = self.nx + 2;
        let sy = self.ny + 2;
        [cell % sx, (cell / sx) % sy, cell / (sx * sy)]
    }

    /// Whether `cell` is an interior cell, i.e. not part of the ghost layer.
    pub const fn is_interior(&self, cell: CellIndex) -> bool {
        let [ix, iy, iz] = self.unvoxel(cell);
        ix >= 1 && ix <= self.nx && iy >= 1 && iy <= self.ny && iz >= 1 && iz <= self.nz
    }
}
