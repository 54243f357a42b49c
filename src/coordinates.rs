use crate::Float;

/// Index of a cell in the flattened grid, ghost cells included.
pub type CellIndex = usize;
/// 1D discrete coordinate along one axis. 0 and n+1 are ghost cells.
pub type GridIndex = usize;
/// Cell-relative coordinate, -1 on the low face and 1 on the high face.
pub type LocalCoordinate = Float;

/// Return the interior cell along one axis that contains `x`, and the offset of `x`
/// inside that cell.
///
/// The axis starts at `x0` and has `n` interior cells of width `dx`. Coordinates
/// outside the axis are clamped onto the first or last interior cell.
///
/// # Panics
/// Panics if `n==0`.
pub fn local_coordinate(
    x: Float,
    x0: Float,
    dx: Float,
    n: usize,
) -> (GridIndex, LocalCoordinate) {
    assert_ne!(n, 0_usize, "n cannot be 0.");
    let scaled = (x - x0) / dx;
    let cell = (scaled.floor().max(0.) as usize).min(n - 1);
    let offset = (2. * (scaled - cell as Float) - 1.).clamp(-1., 1.);
    (cell + 1, offset)
}

/// Inverse of [local_coordinate] for interior cells.
pub fn global_coordinate(index: GridIndex, offset: LocalCoordinate, x0: Float, dx: Float) -> Float {
    x0 + dx * ((index - 1) as Float + 0.5 * (offset + 1.))
}
