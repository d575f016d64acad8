//! Multivector viewed as one length-`B` block per mesh point.

use std::sync::Arc;

use crate::dist_object::{CombineMode, DistObject, MigrationSupport};
use crate::error::{BlockCrsError, Result};
use crate::little_block::{LittleVector, LittleVectorMut};
use crate::map::Map;
use crate::multivector::MultiVector;
use crate::scalar::Scalar;

/// Block multivector: a point-level [`MultiVector`] over the point map of a
/// mesh map, addressed by `(local mesh index, vector)`.
///
/// The `B` degrees of freedom of a mesh point are contiguous within each
/// vector, so every block is a unit-stride slice.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use blockcrs::{BlockMultiVector, Map};
///
/// let mesh = Arc::new(Map::contiguous(3));
/// let mut x: BlockMultiVector<f64> = BlockMultiVector::new(mesh, 2, 1);
/// assert!(x.replace_local_values(1, 0, &[5.0, 6.0]));
/// assert_eq!(x.get_local_block(1, 0).unwrap().to_vec(), vec![5.0, 6.0]);
/// assert_eq!(x.multivector().data(), &[0.0, 0.0, 5.0, 6.0, 0.0, 0.0]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct BlockMultiVector<T: Scalar> {
    mesh_map: Arc<Map>,
    block_size: usize,
    mv: MultiVector<T>,
}

/// Read-only block addressing over column-major point data.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BlockVectorsRef<'a, T: Scalar> {
    data: &'a [T],
    lda: usize,
    block_size: usize,
}

impl<'a, T: Scalar> BlockVectorsRef<'a, T> {
    #[inline]
    pub(crate) fn block(&self, lid: usize, j: usize) -> LittleVector<'a, T> {
        let start = j * self.lda + lid * self.block_size;
        LittleVector::new(&self.data[start..start + self.block_size], self.block_size, 1)
    }

    #[inline]
    pub(crate) fn block_slice(&self, lid: usize, j: usize) -> &'a [T] {
        let start = j * self.lda + lid * self.block_size;
        &self.data[start..start + self.block_size]
    }
}

impl<T: Scalar> BlockMultiVector<T> {
    /// Zero-initialized block multivector over the point map of `mesh_map`.
    ///
    /// # Panics
    ///
    /// Panics if the point indices of `mesh_map` overflow `usize`; see
    /// [`try_new`](Self::try_new).
    pub fn new(mesh_map: Arc<Map>, block_size: usize, num_vecs: usize) -> Self {
        Self::try_new(mesh_map, block_size, num_vecs).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Fallible form of [`new`](Self::new).
    ///
    /// # Errors
    ///
    /// Returns `GlobalIndexOverflow` if a mesh index times `block_size` does
    /// not fit in `usize`.
    pub fn try_new(mesh_map: Arc<Map>, block_size: usize, num_vecs: usize) -> Result<Self> {
        let point_map = Arc::new(mesh_map.point_map(block_size)?);
        Ok(Self {
            mesh_map,
            block_size,
            mv: MultiVector::zeros(point_map, num_vecs),
        })
    }

    /// Reinterpret a point-level multivector as a block multivector.
    ///
    /// # Errors
    ///
    /// Returns `MapMismatch` if the point map does not hold exactly
    /// `block_size` entries per mesh point.
    pub fn from_multivector(mv: MultiVector<T>, mesh_map: Arc<Map>, block_size: usize) -> Result<Self> {
        let expected = mesh_map.num_local() * block_size;
        if mv.local_length() != expected {
            return Err(BlockCrsError::MapMismatch {
                context: format!(
                    "point map has {} local entries, mesh map with block size {} needs {}",
                    mv.local_length(),
                    block_size,
                    expected
                ),
            });
        }
        Ok(Self {
            mesh_map,
            block_size,
            mv,
        })
    }

    /// Give back the point-level multivector.
    pub fn into_multivector(self) -> MultiVector<T> {
        self.mv
    }

    #[inline]
    pub fn multivector(&self) -> &MultiVector<T> {
        &self.mv
    }

    #[inline]
    pub fn multivector_mut(&mut self) -> &mut MultiVector<T> {
        &mut self.mv
    }

    #[inline]
    pub fn mesh_map(&self) -> &Arc<Map> {
        &self.mesh_map
    }

    #[inline]
    pub fn point_map(&self) -> &Arc<Map> {
        self.mv.map()
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn num_vecs(&self) -> usize {
        self.mv.num_vecs()
    }

    /// Number of local mesh points.
    #[inline]
    pub fn num_local_blocks(&self) -> usize {
        self.mesh_map.num_local()
    }

    fn block_range(&self, lid: usize, j: usize) -> Option<std::ops::Range<usize>> {
        if lid >= self.num_local_blocks() || j >= self.num_vecs() {
            return None;
        }
        let start = j * self.mv.local_length() + lid * self.block_size;
        Some(start..start + self.block_size)
    }

    /// Block of mesh point `lid` in vector `j`.
    pub fn get_local_block(&self, lid: usize, j: usize) -> Option<LittleVector<'_, T>> {
        let range = self.block_range(lid, j)?;
        Some(LittleVector::new(&self.mv.data()[range], self.block_size, 1))
    }

    pub fn get_local_block_mut(&mut self, lid: usize, j: usize) -> Option<LittleVectorMut<'_, T>> {
        let range = self.block_range(lid, j)?;
        let b = self.block_size;
        Some(LittleVectorMut::new(&mut self.mv.data_mut()[range], b, 1))
    }

    /// Overwrite the block of mesh point `lid` in vector `j` with `vals`.
    ///
    /// Returns false (and writes nothing) for an invalid `lid` or `j`.
    pub fn replace_local_values(&mut self, lid: usize, j: usize, vals: &[T]) -> bool {
        match self.get_local_block_mut(lid, j) {
            Some(mut block) => {
                block.assign(vals);
                true
            }
            None => false,
        }
    }

    /// Add `vals` into the block of mesh point `lid` in vector `j`.
    pub fn sum_into_local_values(&mut self, lid: usize, j: usize, vals: &[T]) -> bool {
        match self.get_local_block_mut(lid, j) {
            Some(mut block) => {
                block.update(vals);
                true
            }
            None => false,
        }
    }

    pub fn put_scalar(&mut self, value: T) {
        self.mv.put_scalar(value);
    }

    pub fn scale(&mut self, alpha: T) {
        self.mv.scale(alpha);
    }

    pub(crate) fn as_blocks(&self) -> BlockVectorsRef<'_, T> {
        BlockVectorsRef {
            data: self.mv.data(),
            lda: self.mv.local_length(),
            block_size: self.block_size,
        }
    }

    fn combine_block(&mut self, lid: usize, j: usize, src: &[T], mode: CombineMode) -> Result<()> {
        let len = self.num_local_blocks();
        let mut block = self
            .get_local_block_mut(lid, j)
            .ok_or(BlockCrsError::IndexOutOfBounds { index: lid, len })?;
        match mode {
            CombineMode::Insert | CombineMode::Replace => block.assign(src),
            CombineMode::Add => block.update(src),
        }
        Ok(())
    }
}

impl<T: Scalar> DistObject for BlockMultiVector<T> {
    type Packet = T;

    const MIGRATION: MigrationSupport = MigrationSupport::Supported;

    const NAME: &'static str = "BlockMultiVector";

    fn map(&self) -> &Arc<Map> {
        &self.mesh_map
    }

    fn check_sizes(&self, source: &Self) -> Result<bool> {
        Ok(self.block_size == source.block_size)
    }

    fn copy_and_permute(
        &mut self,
        source: &Self,
        num_same_ids: usize,
        permute_to: &[usize],
        permute_from: &[usize],
        mode: CombineMode,
    ) -> Result<()> {
        if permute_to.len() != permute_from.len() {
            return Err(BlockCrsError::ShapeMismatch {
                expected: permute_to.len(),
                actual: permute_from.len(),
            });
        }
        let num_vecs = self.num_vecs().min(source.num_vecs());
        let src = source.as_blocks();
        let src_len = source.num_local_blocks();
        let pairs = (0..num_same_ids)
            .map(|lid| (lid, lid))
            .chain(permute_to.iter().copied().zip(permute_from.iter().copied()));
        for (to, from) in pairs {
            if from >= src_len {
                return Err(BlockCrsError::IndexOutOfBounds {
                    index: from,
                    len: src_len,
                });
            }
            for j in 0..num_vecs {
                self.combine_block(to, j, src.block_slice(from, j), mode)?;
            }
        }
        Ok(())
    }

    fn pack_and_prepare(&self, export_lids: &[usize], exports: &mut Vec<T>) -> Result<usize> {
        let len = self.num_local_blocks();
        let blocks = self.as_blocks();
        exports.reserve(export_lids.len() * self.block_size * self.num_vecs());
        for &lid in export_lids {
            if lid >= len {
                return Err(BlockCrsError::IndexOutOfBounds { index: lid, len });
            }
            for j in 0..self.num_vecs() {
                exports.extend_from_slice(blocks.block_slice(lid, j));
            }
        }
        Ok(self.block_size * self.num_vecs())
    }

    fn unpack_and_combine(
        &mut self,
        import_lids: &[usize],
        imports: &[T],
        packets_per_lid: usize,
        mode: CombineMode,
    ) -> Result<()> {
        let expected = import_lids.len() * packets_per_lid;
        if imports.len() != expected {
            return Err(BlockCrsError::ShapeMismatch {
                expected,
                actual: imports.len(),
            });
        }
        let b = self.block_size;
        if b == 0 {
            return Ok(());
        }
        let num_vecs = (packets_per_lid / b).min(self.num_vecs());
        for (i, &lid) in import_lids.iter().enumerate() {
            let packet = &imports[i * packets_per_lid..(i + 1) * packets_per_lid];
            for j in 0..num_vecs {
                self.combine_block(lid, j, &packet[j * b..(j + 1) * b], mode)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bmv(n: usize, b: usize, nv: usize) -> BlockMultiVector<f64> {
        BlockMultiVector::new(Arc::new(Map::contiguous(n)), b, nv)
    }

    #[test]
    fn test_try_new_rejects_huge_indices() {
        let mesh = Arc::new(Map::new(vec![usize::MAX / 3]).unwrap());
        assert!(BlockMultiVector::<f64>::try_new(mesh.clone(), 2, 1).is_ok());
        assert!(matches!(
            BlockMultiVector::<f64>::try_new(mesh, 4, 1),
            Err(BlockCrsError::GlobalIndexOverflow { block_size: 4, .. })
        ));
    }

    #[test]
    fn test_block_addressing() {
        let mut x = bmv(2, 3, 2);
        assert!(x.replace_local_values(1, 1, &[1.0, 2.0, 3.0]));
        assert!(x.sum_into_local_values(1, 1, &[1.0, 1.0, 1.0]));
        assert!(!x.replace_local_values(2, 0, &[0.0; 3]));
        assert!(!x.replace_local_values(0, 2, &[0.0; 3]));
        // Vector 1 starts at 6; mesh point 1 at 3 within it.
        assert_eq!(&x.multivector().data()[9..12], &[2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_from_multivector_checks_length() {
        let mesh = Arc::new(Map::contiguous(2));
        let wrong = MultiVector::<f64>::zeros(Arc::new(Map::contiguous(5)), 1);
        assert!(BlockMultiVector::from_multivector(wrong, mesh.clone(), 2).is_err());
        let right = MultiVector::<f64>::zeros(Arc::new(Map::contiguous(4)), 1);
        assert!(BlockMultiVector::from_multivector(right, mesh, 2).is_ok());
    }

    #[test]
    fn test_copy_and_permute() {
        let mut src = bmv(3, 1, 1);
        for lid in 0..3 {
            src.replace_local_values(lid, 0, &[lid as f64 + 1.0]);
        }
        let mut dst = bmv(3, 1, 1);
        dst.copy_and_permute(&src, 1, &[1, 2], &[2, 1], CombineMode::Insert)
            .unwrap();
        assert_eq!(dst.multivector().data(), &[1.0, 3.0, 2.0]);

        dst.copy_and_permute(&src, 0, &[0], &[0], CombineMode::Add).unwrap();
        assert_eq!(dst.multivector().data(), &[2.0, 3.0, 2.0]);
    }

    #[test]
    fn test_pack_unpack() {
        let mut src = bmv(2, 2, 2);
        src.replace_local_values(1, 0, &[1.0, 2.0]);
        src.replace_local_values(1, 1, &[3.0, 4.0]);

        let mut exports = Vec::new();
        let per_lid = src.pack_and_prepare(&[1], &mut exports).unwrap();
        assert_eq!(per_lid, 4);
        assert_eq!(exports, vec![1.0, 2.0, 3.0, 4.0]);

        let mut dst = bmv(2, 2, 2);
        dst.put_scalar(1.0);
        dst.unpack_and_combine(&[0], &exports, per_lid, CombineMode::Add)
            .unwrap();
        assert_eq!(dst.get_local_block(0, 0).unwrap().to_vec(), vec![2.0, 3.0]);
        assert_eq!(dst.get_local_block(0, 1).unwrap().to_vec(), vec![4.0, 5.0]);
        assert_eq!(dst.get_local_block(1, 1).unwrap().to_vec(), vec![1.0, 1.0]);
    }

    #[test]
    fn test_unpack_length_checked() {
        let mut dst = bmv(2, 2, 1);
        assert!(
            dst.unpack_and_combine(&[0, 1], &[1.0; 3], 2, CombineMode::Insert)
                .is_err()
        );
    }

    #[test]
    fn test_fewer_vectors_copy_leading_columns() {
        let mut src = bmv(1, 1, 1);
        src.put_scalar(7.0);
        let mut dst = bmv(1, 1, 3);
        dst.copy_and_permute(&src, 1, &[], &[], CombineMode::Insert).unwrap();
        assert_eq!(dst.multivector().data(), &[7.0, 0.0, 0.0]);
    }
}
