//! Local block matrix-vector kernel and the apply-time vector cache.
//!
//! The kernel computes, for every local block row `r` and vector `j`,
//!
//! ```text
//! Y(r, j) := beta * Y(r, j) + alpha * sum_k A(r, ind[k]) * X(ind[k], j)
//! ```
//!
//! with `X` indexed by the column map and `Y` by the row map. Column `j` of
//! `Y` is contiguous and splits into one length-`B` chunk per block row, so
//! a [`RowBackend`] updates each column in place with no scratch buffer.

use std::sync::Arc;

use crate::backend::RowBackend;
use crate::block_multivector::{BlockMultiVector, BlockVectorsRef};
use crate::error::Result;
use crate::graph::CrsGraph;
use crate::little_block::block_gemv_scaled;
use crate::map::Map;
use crate::scalar::Scalar;
use crate::storage::BlockStorage;

/// Column-map and row-map vectors reused across applies.
///
/// Created on first use and replaced only when a call needs more vectors
/// than the cached one holds; smaller calls use its leading vectors.
#[derive(Debug)]
pub(crate) struct ApplyCache<T: Scalar> {
    pub(crate) x_col_map: Option<BlockMultiVector<T>>,
    pub(crate) y_row_map: Option<BlockMultiVector<T>>,
}

impl<T: Scalar> Default for ApplyCache<T> {
    fn default() -> Self {
        Self {
            x_col_map: None,
            y_row_map: None,
        }
    }
}

/// Cached vector over `mesh_map` with at least `num_vecs` vectors.
pub(crate) fn ensure_cached<'c, T: Scalar>(
    slot: &'c mut Option<BlockMultiVector<T>>,
    mesh_map: &Arc<Map>,
    block_size: usize,
    num_vecs: usize,
) -> Result<&'c mut BlockMultiVector<T>> {
    let cached = match slot.take() {
        Some(cached) if cached.num_vecs() >= num_vecs && cached.block_size() == block_size => cached,
        _ => {
            log::debug!(
                "allocating apply cache: {} blocks of size {}, {} vectors",
                mesh_map.num_local(),
                block_size,
                num_vecs
            );
            BlockMultiVector::try_new(mesh_map.clone(), block_size, num_vecs)?
        }
    };
    Ok(slot.insert(cached))
}

/// Run the local kernel over the first `num_vecs` vectors of `x` and `y`.
///
/// `x` must cover the graph's column map and `y` its row map. With a zero
/// `alpha` the matrix and `x` are not read; with a zero `beta` the prior
/// contents of `y` are not read.
pub(crate) fn local_apply<T: Scalar, Bk: RowBackend>(
    graph: &CrsGraph,
    storage: &BlockStorage<T>,
    x: BlockVectorsRef<'_, T>,
    y: &mut BlockMultiVector<T>,
    num_vecs: usize,
    alpha: T,
    beta: T,
) {
    let b = storage.layout().block_size();
    let num_rows = graph.num_local_rows();
    if b == 0 || num_rows == 0 {
        return;
    }

    let row_ptr = graph.row_ptr();
    let col_ind = graph.col_ind();
    let read_a = !alpha.is_zero();
    let read_y = !beta.is_zero();
    let mv = y.multivector_mut();

    for j in 0..num_vecs {
        let Some(column) = mv.column_mut(j) else {
            break;
        };
        Bk::for_each_row(&mut column[..num_rows * b], b, |r, out| {
            if read_y {
                for v in out.iter_mut() {
                    *v = beta * *v;
                }
            } else {
                out.fill(T::zero());
            }
            if read_a {
                for k in row_ptr[r]..row_ptr[r + 1] {
                    if let Some(block) = storage.block(k) {
                        block_gemv_scaled(alpha, &block, &x.block(col_ind[k], j), out);
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SerialBackend;
    use crate::layout::BlockLayout;

    // Two rows, B = 1: row 0 = [2, 3], row 1 = [0, 4].
    fn setup() -> (CrsGraph, BlockStorage<f64>) {
        let map = Arc::new(Map::contiguous(2));
        let mut graph =
            CrsGraph::from_local_rows(map.clone(), map, &[vec![0, 1], vec![1]]).unwrap();
        graph.fill_complete_default().unwrap();
        let mut storage = BlockStorage::zeros(3, BlockLayout::packed(1, true));
        storage.as_mut_slice().copy_from_slice(&[2.0, 3.0, 4.0]);
        (graph, storage)
    }

    fn vector(values: &[f64]) -> BlockMultiVector<f64> {
        let mut v = BlockMultiVector::new(Arc::new(Map::contiguous(values.len())), 1, 1);
        for (lid, &value) in values.iter().enumerate() {
            v.replace_local_values(lid, 0, &[value]);
        }
        v
    }

    #[test]
    fn test_kernel_alpha_beta() {
        let (graph, storage) = setup();
        let x = vector(&[1.0, 2.0]);
        let mut y = vector(&[10.0, 20.0]);
        local_apply::<f64, SerialBackend>(&graph, &storage, x.as_blocks(), &mut y, 1, 2.0, 0.5);
        // A x = [8, 8]
        assert_eq!(y.multivector().data(), &[21.0, 26.0]);
    }

    #[test]
    fn test_alpha_zero_skips_x() {
        let (graph, storage) = setup();
        let x = vector(&[f64::NAN, f64::INFINITY]);
        let mut y = vector(&[1.0, 2.0]);
        local_apply::<f64, SerialBackend>(&graph, &storage, x.as_blocks(), &mut y, 1, 0.0, 3.0);
        assert_eq!(y.multivector().data(), &[3.0, 6.0]);
    }

    #[test]
    fn test_kernel_leaves_extra_vectors_alone() {
        let (graph, storage) = setup();
        let x = vector(&[1.0, 2.0]);
        let mut y = BlockMultiVector::new(Arc::new(Map::contiguous(2)), 1, 2);
        y.put_scalar(f64::NAN);
        local_apply::<f64, SerialBackend>(&graph, &storage, x.as_blocks(), &mut y, 1, 1.0, 0.0);
        let data = y.multivector().data();
        assert_eq!(&data[..2], &[8.0, 8.0]);
        assert!(data[2..].iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_cache_reuse_and_growth() {
        let map = Arc::new(Map::contiguous(3));
        let mut slot: Option<BlockMultiVector<f64>> = None;
        ensure_cached(&mut slot, &map, 2, 2).unwrap().put_scalar(5.0);
        // Fewer vectors: same allocation, contents kept.
        assert_eq!(ensure_cached(&mut slot, &map, 2, 1).unwrap().num_vecs(), 2);
        assert_eq!(slot.as_ref().unwrap().multivector().data()[0], 5.0);
        // More vectors: reallocated.
        assert_eq!(ensure_cached(&mut slot, &map, 2, 3).unwrap().num_vecs(), 3);
        assert_eq!(slot.as_ref().unwrap().multivector().data()[0], 0.0);
    }
}
