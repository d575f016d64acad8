//! Point-level dense multivector.

use std::sync::Arc;

use crate::error::{BlockCrsError, Result};
use crate::map::Map;
use crate::scalar::Scalar;

/// Set of `num_vecs` dense vectors distributed over a point map.
///
/// Values are stored column-major: vector `j` occupies
/// `data[j * lda .. (j + 1) * lda]` with `lda = map.num_local()`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultiVector<T: Scalar> {
    map: Arc<Map>,
    num_vecs: usize,
    data: Vec<T>,
}

impl<T: Scalar> MultiVector<T> {
    /// Zero-initialized multivector.
    pub fn zeros(map: Arc<Map>, num_vecs: usize) -> Self {
        let len = map.num_local() * num_vecs;
        Self {
            map,
            num_vecs,
            data: vec![T::zero(); len],
        }
    }

    /// Multivector over existing column-major data.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if `data.len() != map.num_local() * num_vecs`.
    pub fn from_vec(map: Arc<Map>, num_vecs: usize, data: Vec<T>) -> Result<Self> {
        let expected = map.num_local() * num_vecs;
        if data.len() != expected {
            return Err(BlockCrsError::ShapeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            map,
            num_vecs,
            data,
        })
    }

    #[inline]
    pub fn map(&self) -> &Arc<Map> {
        &self.map
    }

    #[inline]
    pub fn num_vecs(&self) -> usize {
        self.num_vecs
    }

    /// Local length of each vector (the leading dimension).
    #[inline]
    pub fn local_length(&self) -> usize {
        self.map.num_local()
    }

    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Local values of vector `j`.
    pub fn column(&self, j: usize) -> Option<&[T]> {
        let lda = self.local_length();
        (j < self.num_vecs).then(|| &self.data[j * lda..(j + 1) * lda])
    }

    pub fn column_mut(&mut self, j: usize) -> Option<&mut [T]> {
        let lda = self.local_length();
        if j < self.num_vecs {
            Some(&mut self.data[j * lda..(j + 1) * lda])
        } else {
            None
        }
    }

    /// Entry `lid` of vector `j`.
    pub fn get(&self, lid: usize, j: usize) -> Option<T> {
        self.column(j)?.get(lid).copied()
    }

    /// Set entry `lid` of vector `j`.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` for an invalid local index or vector.
    pub fn set(&mut self, lid: usize, j: usize, value: T) -> Result<()> {
        let lda = self.local_length();
        if j >= self.num_vecs {
            return Err(BlockCrsError::IndexOutOfBounds {
                index: j,
                len: self.num_vecs,
            });
        }
        if lid >= lda {
            return Err(BlockCrsError::IndexOutOfBounds {
                index: lid,
                len: lda,
            });
        }
        self.data[j * lda + lid] = value;
        Ok(())
    }

    /// Set every entry to `value`.
    pub fn put_scalar(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Multiply every entry by `alpha`. A zero `alpha` overwrites with zero
    /// without reading, so non-finite entries do not survive.
    pub fn scale(&mut self, alpha: T) {
        if alpha.is_zero() {
            self.data.fill(T::zero());
        } else {
            for v in &mut self.data {
                *v = alpha * *v;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_major_layout() {
        let map = Arc::new(Map::contiguous(2));
        let mv = MultiVector::from_vec(map, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(mv.column(1), Some(&[3.0, 4.0][..]));
        assert_eq!(mv.get(1, 0), Some(2.0));
        assert_eq!(mv.get(2, 0), None);
        assert_eq!(mv.column(2), None);
    }

    #[test]
    fn test_from_vec_length_checked() {
        let map = Arc::new(Map::contiguous(3));
        assert!(matches!(
            MultiVector::from_vec(map, 2, vec![0.0; 5]),
            Err(BlockCrsError::ShapeMismatch { expected: 6, actual: 5 })
        ));
    }

    #[test]
    fn test_scale_by_zero_clears_nan() {
        let map = Arc::new(Map::contiguous(2));
        let mut mv = MultiVector::from_vec(map, 1, vec![f64::NAN, f64::INFINITY]).unwrap();
        mv.scale(0.0);
        assert_eq!(mv.data(), &[0.0, 0.0]);
    }

    #[test]
    fn test_set_bounds() {
        let map = Arc::new(Map::contiguous(2));
        let mut mv: MultiVector<f64> = MultiVector::zeros(map, 1);
        mv.set(1, 0, 3.0).unwrap();
        assert_eq!(mv.get(1, 0), Some(3.0));
        assert!(mv.set(2, 0, 1.0).is_err());
        assert!(mv.set(0, 1, 1.0).is_err());
    }
}
