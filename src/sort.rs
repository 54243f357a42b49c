use crate::grid::Grid;
use crate::particle::Particle;
use crate::scratch::IndexBuffer;
use crate::species::Species;
use crate::PicError;

/// In-place bucket sort of particles by cell index.
///
/// Owns the per-cell "next free slot" buffer so it is allocated once per grid
/// instead of once per call. Sorting needs `&mut self`, so one sorter cannot
/// serve two species concurrently.
#[derive(Debug)]
pub struct SpatialSort {
    next: IndexBuffer,
}

impl SpatialSort {
    pub fn new(grid: &Grid) -> Result<Self, PicError> {
        Ok(Self {
            next: IndexBuffer::try_with_len("sort scratch", grid.n_cells() + 1)?,
        })
    }

    /// Resize the scratch buffer after the grid changed.
    pub fn resize(&mut self, grid: &Grid) -> Result<(), PicError> {
        self.next.resize(grid.n_cells() + 1)
    }

    /// Group the particles of `sp` by ascending cell index.
    ///
    /// Afterwards [Species::cell_offsets] holds the first particle of every cell.
    /// Order within a cell is unspecified.
    pub fn sort_p(&mut self, sp: &mut Species) -> Result<(), PicError> {
        let n_cells = sp.grid.n_cells();
        self.next.expect_len(n_cells + 1)?;
        sp.cell_offsets.expect_len(n_cells + 1)?;
        if sp.particles.is_empty() {
            return Ok(());
        }

        sort_by_cell(&mut sp.particles, &mut self.next, &mut sp.cell_offsets);
        sp.offsets_current = true;
        log::trace!("sorted {} {} particles over {} cells", sp.np(), sp.name, n_cells);
        Ok(())
    }
}

/// Permute `particles` so that cell indices are non-decreasing.
///
/// `next` and `copy` must both have one entry per cell plus one. On return
/// `copy[c]` is the index of the first particle of cell `c` and `copy[n_cells]`
/// is the number of particles. Every cell index must be smaller than the cell
/// count; this is only checked in debug builds.
///
/// Runs in `O(particles + cells)` and swaps each particle at most once into
/// its final slot.
pub fn sort_by_cell(particles: &mut [Particle], next: &mut [usize], copy: &mut [usize]) {
    debug_assert_eq!(next.len(), copy.len());
    let n_cells = next.len() - 1;

    // Count particles in each cell.
    next.fill(0);
    for p in particles.iter() {
        debug_assert!(p.i < n_cells, "cell index {} out of range", p.i);
        next[p.i] += 1;
    }

    // Turn the counts into allocations and keep a copy of them.
    let mut j = 0;
    for (start, count) in copy.iter_mut().zip(next.iter_mut()) {
        *start = j;
        j += *count;
        *count = *start;
    }

    // Follow permutation cycles until every cell is filled.
    let mut i = 0;
    while i < n_cells {
        if next[i] >= copy[i + 1] {
            i += 1;
            continue;
        }
        let src = next[i];
        loop {
            let cell = particles[src].i;
            let dest = next[cell];
            next[cell] += 1;
            if dest == src {
                break;
            }
            particles.swap(src, dest);
        }
    }
}
