//! Flat value storage for the blocks of a block sparse matrix.
//!
//! All blocks share one buffer. Block `k` (the `k`-th structural entry of
//! the graph) starts at `k * allocation_size_per_block` and is read with the
//! strides of the storage's [`BlockLayout`].

use std::ops::Range;

use crate::layout::BlockLayout;
use crate::little_block::{LittleBlock, LittleBlockMut};
use crate::scalar::Scalar;

/// Owner of the value buffer of a block matrix.
///
/// The buffer length is fixed at construction:
/// `num_blocks * block_size * column_padding`.
///
/// # Example
///
/// ```
/// use blockcrs::{BlockLayout, BlockStorage};
///
/// let mut storage: BlockStorage<f64> = BlockStorage::zeros(3, BlockLayout::new(2, 4, true));
/// assert_eq!(storage.len(), 3 * 2 * 4);
///
/// storage.block_mut(1).unwrap().set(1, 0, 5.0);
/// assert_eq!(storage.block(1).unwrap().get(1, 0), 5.0);
/// assert!(storage.block(3).is_none());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct BlockStorage<T: Scalar> {
    values: Vec<T>,
    num_blocks: usize,
    layout: BlockLayout,
}

impl<T: Scalar> BlockStorage<T> {
    /// Zero-initialized storage for `num_blocks` blocks.
    pub fn zeros(num_blocks: usize, layout: BlockLayout) -> Self {
        Self {
            values: vec![T::zero(); num_blocks * layout.allocation_size_per_block()],
            num_blocks,
            layout,
        }
    }

    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    #[inline]
    pub fn layout(&self) -> BlockLayout {
        self.layout
    }

    /// Number of stored values, padding included.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value range covering blocks `blocks.start..blocks.end`.
    #[inline]
    pub fn value_range(&self, blocks: Range<usize>) -> Range<usize> {
        let size = self.layout.allocation_size_per_block();
        blocks.start * size..blocks.end * size
    }

    /// View of block `k`, or `None` past the last block.
    pub fn block(&self, k: usize) -> Option<LittleBlock<'_, T>> {
        if k >= self.num_blocks {
            return None;
        }
        let range = self.value_range(k..k + 1);
        Some(LittleBlock::new(&self.values[range], self.layout))
    }

    /// Mutable view of block `k`, or `None` past the last block.
    pub fn block_mut(&mut self, k: usize) -> Option<LittleBlockMut<'_, T>> {
        if k >= self.num_blocks {
            return None;
        }
        let range = self.value_range(k..k + 1);
        Some(LittleBlockMut::new(&mut self.values[range], self.layout))
    }

    /// Values of consecutive blocks, padding included.
    pub fn values(&self, blocks: Range<usize>) -> &[T] {
        &self.values[self.value_range(blocks)]
    }

    pub fn values_mut(&mut self, blocks: Range<usize>) -> &mut [T] {
        let range = self.value_range(blocks);
        &mut self.values[range]
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.values
    }

    /// Set every value, padding included.
    pub fn fill(&mut self, value: T) {
        self.values.fill(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros_size() {
        let storage: BlockStorage<f64> = BlockStorage::zeros(5, BlockLayout::packed(3, true));
        assert_eq!(storage.len(), 45);
        assert_eq!(storage.num_blocks(), 5);
        assert!(storage.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_blocks_are_disjoint() {
        let mut storage: BlockStorage<f64> = BlockStorage::zeros(2, BlockLayout::new(2, 3, true));
        storage.block_mut(0).unwrap().fill(1.0);
        storage.block_mut(1).unwrap().fill(2.0);
        // Padding column stays zero.
        assert_eq!(
            storage.as_slice(),
            &[1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 2.0, 2.0, 0.0, 2.0, 2.0, 0.0]
        );
        assert_eq!(storage.values(1..2), &[2.0, 2.0, 0.0, 2.0, 2.0, 0.0]);
    }

    #[test]
    fn test_zero_block_size() {
        let storage: BlockStorage<f64> = BlockStorage::zeros(4, BlockLayout::packed(0, true));
        assert!(storage.is_empty());
        assert_eq!(storage.block(2).unwrap().block_size(), 0);
    }
}
