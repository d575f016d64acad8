//! Layout of the dense blocks inside the value buffer.

/// Shape and stride description shared by every block of a matrix.
///
/// Each block occupies `block_size * column_padding` consecutive values.
/// In row-major layout a block row is `column_padding` long and entry
/// `(i, j)` lives at `i * column_padding + j`; in column-major layout the
/// roles swap. Padding entries are never read by the kernels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockLayout {
    block_size: usize,
    column_padding: usize,
    row_major: bool,
}

impl BlockLayout {
    /// Create a layout. `column_padding` is raised to `block_size` if smaller.
    pub fn new(block_size: usize, column_padding: usize, row_major: bool) -> Self {
        Self {
            block_size,
            column_padding: column_padding.max(block_size),
            row_major,
        }
    }

    /// Unpadded layout of the given orientation.
    pub fn packed(block_size: usize, row_major: bool) -> Self {
        Self::new(block_size, block_size, row_major)
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn column_padding(&self) -> usize {
        self.column_padding
    }

    #[inline]
    pub fn is_row_major(&self) -> bool {
        self.row_major
    }

    /// Number of values reserved per block, `block_size * column_padding`.
    #[inline]
    pub fn allocation_size_per_block(&self) -> usize {
        self.block_size * self.column_padding
    }

    /// `(row_stride, col_stride)` of an entry inside a block.
    #[inline]
    pub fn strides(&self) -> (usize, usize) {
        if self.row_major {
            (self.column_padding, 1)
        } else {
            (1, self.column_padding)
        }
    }

    /// Offset of entry `(i, j)` from the start of its block.
    #[inline]
    pub fn entry_offset(&self, i: usize, j: usize) -> usize {
        let (rs, cs) = self.strides();
        i * rs + j * cs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_padded() {
        let layout = BlockLayout::new(3, 4, true);
        assert_eq!(layout.allocation_size_per_block(), 12);
        assert_eq!(layout.strides(), (4, 1));
        assert_eq!(layout.entry_offset(2, 1), 9);
    }

    #[test]
    fn test_column_major() {
        let layout = BlockLayout::packed(2, false);
        assert_eq!(layout.strides(), (1, 2));
        assert_eq!(layout.entry_offset(1, 0), 1);
        assert_eq!(layout.entry_offset(0, 1), 2);
    }

    #[test]
    fn test_padding_clamped() {
        let layout = BlockLayout::new(5, 2, true);
        assert_eq!(layout.column_padding(), 5);
    }
}
