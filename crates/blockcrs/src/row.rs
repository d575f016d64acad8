//! Borrowed views of one block row.
//!
//! A row view exposes the row's column indices and the contiguous values of
//! its blocks without copying. [`BlockRowMut`] also carries the value
//! mutation operations; because mutable row views of distinct rows never
//! alias, they can be handed to different threads.

use crate::layout::BlockLayout;
use crate::little_block::{LittleBlock, LittleBlockMut};
use crate::offsets::find_in_sorted;
use crate::scalar::Scalar;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BlockWrite {
    Replace,
    SumInto,
}

/// Read-only view of a block row.
#[derive(Clone, Copy, Debug)]
pub struct BlockRowView<'a, T: Scalar> {
    row: usize,
    cols: &'a [usize],
    values: &'a [T],
    layout: BlockLayout,
}

/// Mutable view of a block row. Column indices stay read-only.
#[derive(Debug)]
pub struct BlockRowMut<'a, T: Scalar> {
    row: usize,
    cols: &'a [usize],
    values: &'a mut [T],
    layout: BlockLayout,
}

impl<'a, T: Scalar> BlockRowView<'a, T> {
    pub(crate) fn new(row: usize, cols: &'a [usize], values: &'a [T], layout: BlockLayout) -> Self {
        Self {
            row,
            cols,
            values,
            layout,
        }
    }

    /// Local row index.
    #[inline]
    pub fn row(&self) -> usize {
        self.row
    }

    #[inline]
    pub fn num_entries(&self) -> usize {
        self.cols.len()
    }

    /// Local column indices of the row's blocks.
    #[inline]
    pub fn col_indices(&self) -> &'a [usize] {
        self.cols
    }

    /// The row's block values, padding included, in column-index order.
    #[inline]
    pub fn values(&self) -> &'a [T] {
        self.values
    }

    /// Block at relative `offset`.
    pub fn block(&self, offset: usize) -> Option<LittleBlock<'a, T>> {
        if offset >= self.cols.len() {
            return None;
        }
        let size = self.layout.allocation_size_per_block();
        Some(LittleBlock::new(
            &self.values[offset * size..(offset + 1) * size],
            self.layout,
        ))
    }

    /// Block stored for local column `col`.
    pub fn block_for_column(&self, col: usize) -> Option<LittleBlock<'a, T>> {
        find_in_sorted(self.cols, col, 0).and_then(|offset| self.block(offset))
    }

    /// Iterate over `(column, block)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, LittleBlock<'a, T>)> + '_ {
        (0..self.cols.len()).filter_map(move |k| self.block(k).map(|b| (self.cols[k], b)))
    }
}

impl<'a, T: Scalar> BlockRowMut<'a, T> {
    pub(crate) fn new(
        row: usize,
        cols: &'a [usize],
        values: &'a mut [T],
        layout: BlockLayout,
    ) -> Self {
        Self {
            row,
            cols,
            values,
            layout,
        }
    }

    #[inline]
    pub fn row(&self) -> usize {
        self.row
    }

    #[inline]
    pub fn num_entries(&self) -> usize {
        self.cols.len()
    }

    #[inline]
    pub fn col_indices(&self) -> &[usize] {
        self.cols
    }

    #[inline]
    pub fn values(&self) -> &[T] {
        &*self.values
    }

    /// Values of the row's blocks; writes go straight into the matrix.
    #[inline]
    pub fn values_mut(&mut self) -> &mut [T] {
        &mut *self.values
    }

    pub fn as_view(&self) -> BlockRowView<'_, T> {
        BlockRowView::new(self.row, self.cols, &*self.values, self.layout)
    }

    /// Mutable block at relative `offset`.
    pub fn block_mut(&mut self, offset: usize) -> Option<LittleBlockMut<'_, T>> {
        if offset >= self.cols.len() {
            return None;
        }
        let size = self.layout.allocation_size_per_block();
        Some(LittleBlockMut::new(
            &mut self.values[offset * size..(offset + 1) * size],
            self.layout,
        ))
    }

    /// Overwrite the blocks of the given local columns.
    ///
    /// `vals` holds `col_inds.len()` packed `B x B` blocks in the matrix's
    /// orientation. Columns not stored in the row are skipped; the return
    /// value is the number of blocks written.
    ///
    /// # Panics
    ///
    /// Panics if the input block of a column that is written lies past the
    /// end of `vals`.
    pub fn replace_local_values(&mut self, col_inds: &[usize], vals: &[T]) -> usize {
        self.write_by_columns(col_inds, vals, BlockWrite::Replace)
    }

    /// Like [`replace_local_values`](Self::replace_local_values) but adds
    /// into the existing blocks.
    pub fn sum_into_local_values(&mut self, col_inds: &[usize], vals: &[T]) -> usize {
        self.write_by_columns(col_inds, vals, BlockWrite::SumInto)
    }

    /// Overwrite blocks at precomputed relative offsets.
    ///
    /// Offsets may be plain `usize` or `Option<usize>` as returned by the
    /// offset resolver; `None` and out-of-row offsets are skipped and not
    /// counted.
    pub fn replace_local_values_by_offsets<O>(&mut self, offsets: &[O], vals: &[T]) -> usize
    where
        O: Copy + Into<Option<usize>>,
    {
        self.write_by_offsets(offsets, vals, BlockWrite::Replace)
    }

    /// Like [`replace_local_values_by_offsets`](Self::replace_local_values_by_offsets)
    /// but adds into the existing blocks.
    pub fn sum_into_local_values_by_offsets<O>(&mut self, offsets: &[O], vals: &[T]) -> usize
    where
        O: Copy + Into<Option<usize>>,
    {
        self.write_by_offsets(offsets, vals, BlockWrite::SumInto)
    }

    fn write_by_columns(&mut self, col_inds: &[usize], vals: &[T], mode: BlockWrite) -> usize {
        let mut hint = 0;
        let mut count = 0;
        for (i, &col) in col_inds.iter().enumerate() {
            if let Some(offset) = find_in_sorted(self.cols, col, hint) {
                hint = offset + 1;
                self.write_block(offset, i, vals, mode);
                count += 1;
            }
        }
        count
    }

    fn write_by_offsets<O>(&mut self, offsets: &[O], vals: &[T], mode: BlockWrite) -> usize
    where
        O: Copy + Into<Option<usize>>,
    {
        let mut count = 0;
        for (i, &offset) in offsets.iter().enumerate() {
            match offset.into() {
                Some(offset) if offset < self.cols.len() => {
                    self.write_block(offset, i, vals, mode);
                    count += 1;
                }
                _ => {}
            }
        }
        count
    }

    fn write_block(&mut self, offset: usize, input_index: usize, vals: &[T], mode: BlockWrite) {
        let b = self.layout.block_size();
        check_input_len(input_index, vals, b);
        let packed = BlockLayout::packed(b, self.layout.is_row_major());
        let src = LittleBlock::new(&vals[input_index * b * b..(input_index + 1) * b * b], packed);
        let size = self.layout.allocation_size_per_block();
        let mut dst = LittleBlockMut::new(
            &mut self.values[offset * size..(offset + 1) * size],
            self.layout,
        );
        match mode {
            BlockWrite::Replace => dst.assign(&src),
            BlockWrite::SumInto => dst.update(&src),
        }
    }
}

fn check_input_len<T>(input_index: usize, vals: &[T], b: usize) {
    let needed = (input_index + 1) * b * b;
    assert!(
        vals.len() >= needed,
        "input block {} of size {}x{} needs {} values, got {}",
        input_index,
        b,
        b,
        needed,
        vals.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_data(layout: BlockLayout) -> (Vec<usize>, Vec<f64>) {
        (vec![1, 4, 6], vec![0.0; 3 * layout.allocation_size_per_block()])
    }

    #[test]
    fn test_replace_and_sum() {
        let layout = BlockLayout::packed(2, true);
        let (cols, mut values) = row_data(layout);
        let mut row = BlockRowMut::new(0, &cols, &mut values, layout);

        let blocks = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        assert_eq!(row.replace_local_values(&[6, 1], &blocks), 2);
        assert_eq!(row.sum_into_local_values(&[6], &[1.0, 1.0, 1.0, 1.0]), 1);

        let view = row.as_view();
        assert_eq!(view.block_for_column(1).unwrap().to_packed_vec(true), vec![5.0, 6.0, 7.0, 8.0]);
        assert_eq!(view.block_for_column(6).unwrap().to_packed_vec(true), vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(view.block_for_column(4).unwrap().to_packed_vec(true), vec![0.0; 4]);
    }

    #[test]
    fn test_missing_columns_are_skipped() {
        let layout = BlockLayout::packed(1, true);
        let (cols, mut values) = row_data(layout);
        let mut row = BlockRowMut::new(0, &cols, &mut values, layout);
        assert_eq!(row.replace_local_values(&[0, 4, 5], &[9.0, 8.0, 7.0]), 1);
        assert_eq!(values, vec![0.0, 8.0, 0.0]);
    }

    #[test]
    fn test_offsets_skip_invalid() {
        let layout = BlockLayout::packed(1, false);
        let (cols, mut values) = row_data(layout);
        let mut row = BlockRowMut::new(0, &cols, &mut values, layout);
        let offsets = [Some(2), None, Some(7)];
        assert_eq!(row.sum_into_local_values_by_offsets(&offsets, &[1.0, 2.0, 3.0]), 1);
        assert_eq!(row.replace_local_values_by_offsets(&[0usize], &[4.0]), 1);
        assert_eq!(values, vec![4.0, 0.0, 1.0]);
    }

    #[test]
    fn test_column_major_input_respects_orientation() {
        let layout = BlockLayout::new(2, 3, false);
        let (cols, mut values) = row_data(layout);
        let mut row = BlockRowMut::new(0, &cols, &mut values, layout);
        // Column-major packed input: A = [[1, 3], [2, 4]].
        row.replace_local_values(&[4], &[1.0, 2.0, 3.0, 4.0]);
        let block = row.as_view().block(1).unwrap();
        assert_eq!(block.get(0, 1), 3.0);
        assert_eq!(block.get(1, 0), 2.0);
    }

    #[test]
    #[should_panic(expected = "input block 1")]
    fn test_short_input_panics() {
        let layout = BlockLayout::packed(2, true);
        let (cols, mut values) = row_data(layout);
        let mut row = BlockRowMut::new(0, &cols, &mut values, layout);
        row.replace_local_values(&[1, 4], &[1.0; 4]);
    }

    #[test]
    fn test_short_input_for_absent_columns_is_skipped() {
        let layout = BlockLayout::packed(2, true);
        let (cols, mut values) = row_data(layout);
        let mut row = BlockRowMut::new(0, &cols, &mut values, layout);
        assert_eq!(row.replace_local_values(&[5], &[1.0]), 0);
        assert_eq!(row.sum_into_local_values(&[4, 9], &[1.0; 4]), 1);
        assert_eq!(row.replace_local_values_by_offsets(&[None, Some(7)], &[]), 0);
        assert_eq!(row.as_view().block(1).unwrap().to_packed_vec(true), vec![1.0; 4]);
    }
}
