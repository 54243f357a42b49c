use std::ops::{Deref, DerefMut};

use crate::PicError;

/// Reusable, fallibly allocated buffer of indices or counts.
///
/// The sort keeps one per cell (plus one) and reuses it across calls, so it is
/// allocated when a grid is set up and resized only when the grid changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexBuffer {
    what: &'static str,
    data: Vec<usize>,
}

impl IndexBuffer {
    /// Allocate `len` zeroed entries. `what` names the buffer in errors.
    pub fn try_with_len(what: &'static str, len: usize) -> Result<Self, PicError> {
        let mut buffer = Self { what, data: Vec::new() };
        buffer.resize(len)?;
        Ok(buffer)
    }

    /// Change the number of entries. The contents are zeroed.
    ///
    /// On allocation failure the buffer keeps its previous contents.
    pub fn resize(&mut self, len: usize) -> Result<(), PicError> {
        if len > self.data.capacity() {
            let mut data = Vec::new();
            data.try_reserve_exact(len).map_err(|_| PicError::Allocation {
                what: self.what,
                len,
            })?;
            self.data = data;
        }
        self.data.clear();
        self.data.resize(len, 0);
        Ok(())
    }

    pub fn zero(&mut self) {
        self.data.fill(0);
    }

    /// Check that the buffer holds exactly `expected` entries.
    pub fn expect_len(&self, expected: usize) -> Result<(), PicError> {
        if self.data.len() == expected {
            Ok(())
        } else {
            Err(PicError::ScratchMismatch {
                what: self.what,
                expected,
                actual: self.data.len(),
            })
        }
    }
}

impl Deref for IndexBuffer {
    type Target = [usize];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl DerefMut for IndexBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}
