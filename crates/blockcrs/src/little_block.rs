//! Non-owning views of one dense block or one block-vector segment.
//!
//! The views borrow the buffer they describe, so they can never outlive the
//! matrix or multivector that owns it. A [`LittleBlock`] is a `B x B` block
//! with the strides of a [`BlockLayout`]; a [`LittleVector`] is `B` values
//! with a fixed element stride.

use faer::Mat;

use crate::layout::BlockLayout;
use crate::scalar::Scalar;

/// Read-only view of a dense `B x B` block.
#[derive(Clone, Copy, Debug)]
pub struct LittleBlock<'a, T: Scalar> {
    data: &'a [T],
    layout: BlockLayout,
}

/// Mutable view of a dense `B x B` block.
#[derive(Debug)]
pub struct LittleBlockMut<'a, T: Scalar> {
    data: &'a mut [T],
    layout: BlockLayout,
}

/// Read-only view of `B` values with stride.
#[derive(Clone, Copy, Debug)]
pub struct LittleVector<'a, T: Scalar> {
    data: &'a [T],
    len: usize,
    stride: usize,
}

/// Mutable view of `B` values with stride.
#[derive(Debug)]
pub struct LittleVectorMut<'a, T: Scalar> {
    data: &'a mut [T],
    len: usize,
    stride: usize,
}

impl<'a, T: Scalar> LittleBlock<'a, T> {
    /// View `data` (starting at the block's first value) with `layout`.
    ///
    /// # Panics
    ///
    /// Panics if `data` is too short to hold the last entry of the block.
    pub fn new(data: &'a [T], layout: BlockLayout) -> Self {
        assert!(
            data.len() >= required_len(&layout),
            "block view needs {} values, got {}",
            required_len(&layout),
            data.len()
        );
        Self { data, layout }
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.layout.block_size()
    }

    #[inline]
    pub fn layout(&self) -> BlockLayout {
        self.layout
    }

    /// Entry `(i, j)`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> T {
        self.data[self.layout.entry_offset(i, j)]
    }

    /// Copy the block into a dense faer matrix.
    pub fn to_faer_mat(&self) -> Mat<T> {
        let b = self.block_size();
        Mat::from_fn(b, b, |i, j| self.get(i, j))
    }

    /// Copy the block into an unpadded vector of the given orientation.
    pub fn to_packed_vec(&self, row_major: bool) -> Vec<T> {
        let b = self.block_size();
        let packed = BlockLayout::packed(b, row_major);
        let mut out = vec![T::zero(); b * b];
        for i in 0..b {
            for j in 0..b {
                out[packed.entry_offset(i, j)] = self.get(i, j);
            }
        }
        out
    }
}

impl<'a, T: Scalar> LittleBlockMut<'a, T> {
    /// Mutable counterpart of [`LittleBlock::new`].
    pub fn new(data: &'a mut [T], layout: BlockLayout) -> Self {
        assert!(
            data.len() >= required_len(&layout),
            "block view needs {} values, got {}",
            required_len(&layout),
            data.len()
        );
        Self { data, layout }
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.layout.block_size()
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> T {
        self.data[self.layout.entry_offset(i, j)]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: T) {
        self.data[self.layout.entry_offset(i, j)] = value;
    }

    /// Reborrow as a read-only view.
    pub fn as_ref(&self) -> LittleBlock<'_, T> {
        LittleBlock {
            data: &*self.data,
            layout: self.layout,
        }
    }

    /// Set every entry (padding excluded) to `value`.
    pub fn fill(&mut self, value: T) {
        self.for_each_entry(|_, _, v| *v = value);
    }

    /// Overwrite the entries with those of `src`, which may use another layout.
    pub fn assign(&mut self, src: &LittleBlock<'_, T>) {
        debug_assert_eq!(self.block_size(), src.block_size());
        self.for_each_entry(|i, j, v| *v = src.get(i, j));
    }

    /// Add the entries of `src` into this block.
    pub fn update(&mut self, src: &LittleBlock<'_, T>) {
        debug_assert_eq!(self.block_size(), src.block_size());
        self.for_each_entry(|i, j, v| *v = *v + src.get(i, j));
    }

    fn for_each_entry(&mut self, mut f: impl FnMut(usize, usize, &mut T)) {
        let b = self.block_size();
        for i in 0..b {
            for j in 0..b {
                let k = self.layout.entry_offset(i, j);
                f(i, j, &mut self.data[k]);
            }
        }
    }
}

impl<'a, T: Scalar> LittleVector<'a, T> {
    /// View `len` values of `data` spaced `stride` apart.
    pub fn new(data: &'a [T], len: usize, stride: usize) -> Self {
        debug_assert!(len == 0 || data.len() > (len - 1) * stride);
        Self { data, len, stride }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, i: usize) -> T {
        self.data[i * self.stride]
    }

    pub fn to_vec(&self) -> Vec<T> {
        (0..self.len).map(|i| self.get(i)).collect()
    }
}

impl<'a, T: Scalar> LittleVectorMut<'a, T> {
    pub fn new(data: &'a mut [T], len: usize, stride: usize) -> Self {
        debug_assert!(len == 0 || data.len() > (len - 1) * stride);
        Self { data, len, stride }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, i: usize) -> T {
        self.data[i * self.stride]
    }

    #[inline]
    pub fn set(&mut self, i: usize, value: T) {
        self.data[i * self.stride] = value;
    }

    pub fn fill(&mut self, value: T) {
        for i in 0..self.len {
            self.set(i, value);
        }
    }

    /// Overwrite with the first `len` values of `src`.
    pub fn assign(&mut self, src: &[T]) {
        for (i, &v) in src.iter().take(self.len).enumerate() {
            self.set(i, v);
        }
    }

    /// Add the first `len` values of `src`.
    pub fn update(&mut self, src: &[T]) {
        for (i, &v) in src.iter().take(self.len).enumerate() {
            let k = i * self.stride;
            self.data[k] = self.data[k] + v;
        }
    }

    pub fn as_ref(&self) -> LittleVector<'_, T> {
        LittleVector {
            data: &*self.data,
            len: self.len,
            stride: self.stride,
        }
    }
}

/// Dense block micro-kernel: `y += A * x`.
///
/// `y` is contiguous and at least `B` long. Row-major blocks walk each block
/// row contiguously; column-major blocks walk each block column contiguously.
#[inline]
pub fn block_gemv_accumulate<T: Scalar>(a: &LittleBlock<'_, T>, x: &LittleVector<'_, T>, y: &mut [T]) {
    block_gemv_scaled(T::one(), a, x, y);
}

/// `y += alpha * A * x`, same traversal as [`block_gemv_accumulate`].
#[inline]
pub(crate) fn block_gemv_scaled<T: Scalar>(
    alpha: T,
    a: &LittleBlock<'_, T>,
    x: &LittleVector<'_, T>,
    y: &mut [T],
) {
    let b = a.block_size();
    if a.layout.is_row_major() {
        for (i, yi) in y.iter_mut().enumerate().take(b) {
            let mut sum = T::zero();
            for j in 0..b {
                sum = sum + a.get(i, j) * x.get(j);
            }
            *yi = *yi + alpha * sum;
        }
    } else {
        for j in 0..b {
            let xj = alpha * x.get(j);
            for (i, yi) in y.iter_mut().enumerate().take(b) {
                *yi = *yi + a.get(i, j) * xj;
            }
        }
    }
}

fn required_len(layout: &BlockLayout) -> usize {
    let b = layout.block_size();
    if b == 0 {
        0
    } else {
        layout.entry_offset(b - 1, b - 1) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::c64;

    #[test]
    fn test_padded_row_major_indexing() {
        // 2x2 block, padding 3: rows are [1, 2, _] and [3, 4, _].
        let data = [1.0, 2.0, -1.0, 3.0, 4.0, -1.0];
        let block = LittleBlock::new(&data, BlockLayout::new(2, 3, true));
        assert_eq!(block.get(0, 1), 2.0);
        assert_eq!(block.get(1, 0), 3.0);
        assert_eq!(block.to_packed_vec(true), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(block.to_packed_vec(false), vec![1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn test_assign_across_layouts() {
        let src_data = [1.0, 2.0, 3.0, 4.0];
        let src = LittleBlock::new(&src_data, BlockLayout::packed(2, true));

        let mut dst_data = [0.0; 6];
        let mut dst = LittleBlockMut::new(&mut dst_data, BlockLayout::new(2, 3, false));
        dst.assign(&src);
        assert_eq!(dst.get(0, 1), 2.0);
        assert_eq!(dst.get(1, 0), 3.0);
        // Column-major with padding 3: column 0 is [1, 3, _], column 1 is [2, 4, _].
        assert_eq!(dst_data, [1.0, 3.0, 0.0, 2.0, 4.0, 0.0]);
    }

    #[test]
    fn test_update_accumulates() {
        let mut data = [1.0; 4];
        let delta = [1.0, 2.0, 3.0, 4.0];
        let mut block = LittleBlockMut::new(&mut data, BlockLayout::packed(2, true));
        block.update(&LittleBlock::new(&delta, BlockLayout::packed(2, true)));
        assert_eq!(data, [2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_strided_vector() {
        let mut data = [0.0; 6];
        let mut v = LittleVectorMut::new(&mut data, 3, 2);
        v.assign(&[1.0, 2.0, 3.0]);
        v.update(&[1.0, 1.0, 1.0]);
        assert_eq!(data, [2.0, 0.0, 3.0, 0.0, 4.0, 0.0]);
        let view = LittleVector::new(&data, 3, 2);
        assert_eq!(view.to_vec(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_gemv_both_layouts() {
        // A = [[1, 2], [3, 4]], x = [1, -1] -> A x = [-1, -1]
        let x_data = [1.0, -1.0];
        let x = LittleVector::new(&x_data, 2, 1);
        for row_major in [true, false] {
            let packed = if row_major {
                [1.0, 2.0, 3.0, 4.0]
            } else {
                [1.0, 3.0, 2.0, 4.0]
            };
            let a = LittleBlock::new(&packed, BlockLayout::packed(2, row_major));
            let mut y = [10.0, 20.0];
            block_gemv_accumulate(&a, &x, &mut y);
            assert_eq!(y, [9.0, 19.0]);
            block_gemv_scaled(-2.0, &a, &x, &mut y);
            assert_eq!(y, [11.0, 21.0]);
        }
    }

    #[test]
    fn test_gemv_complex() {
        let i = c64::new(0.0, 1.0);
        let one = c64::new(1.0, 0.0);
        let a_data = [i, c64::new(0.0, 0.0), c64::new(0.0, 0.0), i];
        let a = LittleBlock::new(&a_data, BlockLayout::packed(2, true));
        let x_data = [one, i];
        let mut y = [c64::new(0.0, 0.0); 2];
        block_gemv_accumulate(&a, &LittleVector::new(&x_data, 2, 1), &mut y);
        assert_eq!(y[0], i);
        assert_eq!(y[1], c64::new(-1.0, 0.0));
    }

    #[test]
    fn test_to_faer_mat() {
        let data = [1.0, 2.0, 3.0, 4.0];
        let block = LittleBlock::new(&data, BlockLayout::packed(2, false));
        let mat = block.to_faer_mat();
        assert_eq!(mat[(0, 1)], 3.0);
        assert_eq!(mat[(1, 0)], 2.0);
    }

    #[test]
    fn test_zero_size_block() {
        let data: [f64; 0] = [];
        let block = LittleBlock::new(&data, BlockLayout::packed(0, true));
        assert!(block.to_packed_vec(true).is_empty());
    }
}
