//! Random values for matrices and block multivectors.

use std::sync::Arc;

use rand::Rng;
use rand::distr::StandardUniform;

use crate::block_multivector::BlockMultiVector;
use crate::map::Map;
use crate::matrix::BlockCrsMatrix;
use crate::scalar::{Scalar, c64};

/// Trait for types that can be randomly sampled from a uniform distribution.
pub trait RandomUniform: Scalar {
    /// Sample a random value from the uniform distribution [0, 1).
    fn sample_uniform<R: Rng>(rng: &mut R) -> Self;
}

impl RandomUniform for f64 {
    fn sample_uniform<R: Rng>(rng: &mut R) -> Self {
        rng.sample(StandardUniform)
    }
}

impl RandomUniform for c64 {
    fn sample_uniform<R: Rng>(rng: &mut R) -> Self {
        c64::new(rng.sample(StandardUniform), rng.sample(StandardUniform))
    }
}

impl<T: RandomUniform> BlockMultiVector<T> {
    /// Block multivector with uniform random values in [0, 1).
    ///
    /// ```
    /// use std::sync::Arc;
    /// use blockcrs::{BlockMultiVector, Map};
    /// use rand::SeedableRng;
    /// use rand::rngs::StdRng;
    ///
    /// let mesh = Arc::new(Map::contiguous(4));
    /// let a: BlockMultiVector<f64> = BlockMultiVector::random_with_rng(mesh.clone(), 3, 2, &mut StdRng::seed_from_u64(7));
    /// let b: BlockMultiVector<f64> = BlockMultiVector::random_with_rng(mesh, 3, 2, &mut StdRng::seed_from_u64(7));
    /// assert_eq!(a, b);
    /// ```
    pub fn random_with_rng<R: Rng>(mesh_map: Arc<Map>, block_size: usize, num_vecs: usize, rng: &mut R) -> Self {
        let mut v = Self::new(mesh_map, block_size, num_vecs);
        for value in v.multivector_mut().data_mut() {
            *value = T::sample_uniform(rng);
        }
        v
    }
}

impl<T: RandomUniform> BlockCrsMatrix<T> {
    /// Overwrite every block entry with uniform random values in [0, 1).
    ///
    /// Padding is left untouched.
    pub fn fill_random_with_rng<R: Rng>(&mut self, rng: &mut R) {
        let b = self.block_size();
        let storage = self.storage_mut();
        for k in 0..storage.num_blocks() {
            if let Some(mut block) = storage.block_mut(k) {
                for i in 0..b {
                    for j in 0..b {
                        block.set(i, j, T::sample_uniform(rng));
                    }
                }
            }
        }
    }

    /// [`fill_random_with_rng`](Self::fill_random_with_rng) with the thread rng.
    pub fn fill_random(&mut self) {
        self.fill_random_with_rng(&mut rand::rng());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlockCrsConfig;
    use crate::graph::CrsGraph;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_random_range() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let v = f64::sample_uniform(&mut rng);
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_fill_random_keeps_padding() {
        let map = Arc::new(Map::contiguous(1));
        let mut graph = CrsGraph::from_local_rows(map.clone(), map, &[vec![0]]).unwrap();
        graph.fill_complete_default().unwrap();
        let config = BlockCrsConfig::builder().column_padding(3).build();
        let mut a = BlockCrsMatrix::<f64>::with_config(Arc::new(graph), 2, config).unwrap();
        a.set_all_to_scalar(-1.0);
        a.fill_random_with_rng(&mut StdRng::seed_from_u64(1));
        let values = a.storage().as_slice();
        assert_eq!(values[2], -1.0);
        assert_eq!(values[5], -1.0);
        assert!(values[0] >= 0.0 && values[4] >= 0.0);
    }
}
