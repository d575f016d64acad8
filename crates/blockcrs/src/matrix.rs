//! Block sparse row matrix.

use std::sync::Arc;

use faer::Mat;
use parking_lot::Mutex;

use crate::apply::{ApplyCache, ensure_cached, local_apply};
#[cfg(feature = "parallel")]
use crate::backend::RayonBackend;
use crate::backend::{RowBackend, SerialBackend};
use crate::block_multivector::BlockMultiVector;
use crate::config::BlockCrsConfig;
use crate::dist_object::{CombineMode, DistObject, MigrationSupport};
use crate::error::{BlockCrsError, Result, not_implemented};
use crate::graph::CrsGraph;
use crate::layout::BlockLayout;
use crate::map::Map;
use crate::multivector::MultiVector;
use crate::offsets::OffsetResolver;
use crate::operator::{Operator, TransposeMode};
use crate::row::{BlockRowMut, BlockRowView};
use crate::scalar::Scalar;
use crate::storage::BlockStorage;
use crate::transfer::{BlockTransfer, SerialTransfer};

/// Sparse matrix whose entries are dense `B x B` blocks.
///
/// The sparsity structure comes from a fill-complete [`CrsGraph`] shared with
/// other objects; block `k` of the value storage belongs to structural entry
/// `k` of the graph. Values start at zero and are changed in place with the
/// replace / sum-into operations. The structure never changes.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use blockcrs::{BlockCrsMatrix, BlockMultiVector, CrsGraph, Map, TransposeMode};
///
/// let map = Arc::new(Map::contiguous(2));
/// let mut graph = CrsGraph::from_local_rows(map.clone(), map.clone(), &[vec![0, 1], vec![1]]).unwrap();
/// graph.fill_complete_default().unwrap();
///
/// let mut a = BlockCrsMatrix::<f64>::new(Arc::new(graph), 2).unwrap();
/// let identity = [1.0, 0.0, 0.0, 1.0];
/// assert_eq!(a.replace_local_values(0, &[0], &identity), 1);
/// assert_eq!(a.replace_local_values(1, &[1], &identity), 1);
///
/// let mut x = BlockMultiVector::new(map.clone(), 2, 1);
/// x.replace_local_values(0, 0, &[1.0, 2.0]);
/// x.replace_local_values(1, 0, &[3.0, 4.0]);
/// let mut y = BlockMultiVector::new(map, 2, 1);
/// a.apply_block(&x, &mut y, TransposeMode::NoTrans, 1.0, 0.0).unwrap();
/// assert_eq!(y.multivector().data(), &[1.0, 2.0, 3.0, 4.0]);
/// ```
#[derive(Debug)]
pub struct BlockCrsMatrix<T: Scalar> {
    graph: Arc<CrsGraph>,
    storage: BlockStorage<T>,
    domain_point_map: Arc<Map>,
    range_point_map: Arc<Map>,
    config: BlockCrsConfig,
    transfer: Arc<dyn BlockTransfer<T>>,
    cache: Mutex<ApplyCache<T>>,
}

impl<T: Scalar> BlockCrsMatrix<T> {
    /// Zero matrix over `graph` with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `GraphNotFillComplete` if the graph is not fill-complete, and
    /// `GlobalIndexOverflow` if the point maps cannot be numbered.
    pub fn new(graph: Arc<CrsGraph>, block_size: usize) -> Result<Self> {
        Self::with_config(graph, block_size, BlockCrsConfig::default())
    }

    /// Zero matrix with explicit layout and execution options.
    pub fn with_config(graph: Arc<CrsGraph>, block_size: usize, config: BlockCrsConfig) -> Result<Self> {
        let domain_point_map = Arc::new(graph.domain_map().point_map(block_size)?);
        let range_point_map = Arc::new(graph.range_map().point_map(block_size)?);
        Self::build(graph, block_size, config, domain_point_map, range_point_map)
    }

    /// Zero matrix whose point-level domain and range maps are supplied by
    /// the caller instead of derived from the mesh maps.
    ///
    /// # Errors
    ///
    /// Returns `MapMismatch` unless each point map holds exactly
    /// `block_size` entries per local mesh point.
    pub fn with_point_maps(
        graph: Arc<CrsGraph>,
        domain_point_map: Arc<Map>,
        range_point_map: Arc<Map>,
        block_size: usize,
    ) -> Result<Self> {
        Self::with_point_maps_and_config(
            graph,
            domain_point_map,
            range_point_map,
            block_size,
            BlockCrsConfig::default(),
        )
    }

    /// [`with_point_maps`](Self::with_point_maps) with an explicit layout
    /// and execution policy.
    pub fn with_point_maps_and_config(
        graph: Arc<CrsGraph>,
        domain_point_map: Arc<Map>,
        range_point_map: Arc<Map>,
        block_size: usize,
        config: BlockCrsConfig,
    ) -> Result<Self> {
        check_point_map("domain", &domain_point_map, graph.domain_map(), block_size)?;
        check_point_map("range", &range_point_map, graph.range_map(), block_size)?;
        Self::build(graph, block_size, config, domain_point_map, range_point_map)
    }

    fn build(
        graph: Arc<CrsGraph>,
        block_size: usize,
        config: BlockCrsConfig,
        domain_point_map: Arc<Map>,
        range_point_map: Arc<Map>,
    ) -> Result<Self> {
        if !graph.is_fill_complete() {
            log::error!("block matrix construction requires a fill-complete graph");
            return Err(BlockCrsError::GraphNotFillComplete);
        }
        let layout = config.layout(block_size)?;
        let storage = BlockStorage::zeros(graph.num_entries(), layout);
        let transfer: Arc<dyn BlockTransfer<T>> = Arc::new(SerialTransfer::new(&graph)?);
        log::debug!(
            "block matrix: {} rows, {} blocks, block size {}, padding {}, {}",
            graph.num_local_rows(),
            graph.num_entries(),
            block_size,
            layout.column_padding(),
            if layout.is_row_major() { "row-major" } else { "column-major" }
        );
        Ok(Self {
            graph,
            storage,
            domain_point_map,
            range_point_map,
            config,
            transfer,
            cache: Mutex::new(ApplyCache::default()),
        })
    }

    /// Replace the data movement used around the local kernel, e.g. with
    /// one backed by a distributed runtime.
    pub fn set_transfer(&mut self, transfer: Arc<dyn BlockTransfer<T>>) {
        self.transfer = transfer;
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.storage.layout().block_size()
    }

    #[inline]
    pub fn layout(&self) -> BlockLayout {
        self.storage.layout()
    }

    /// Values stored per block, padding included.
    #[inline]
    pub fn allocation_size_per_block(&self) -> usize {
        self.storage.layout().allocation_size_per_block()
    }

    pub fn config(&self) -> &BlockCrsConfig {
        &self.config
    }

    pub fn graph(&self) -> &Arc<CrsGraph> {
        &self.graph
    }

    pub fn storage(&self) -> &BlockStorage<T> {
        &self.storage
    }

    pub fn domain_point_map(&self) -> &Arc<Map> {
        &self.domain_point_map
    }

    pub fn range_point_map(&self) -> &Arc<Map> {
        &self.range_point_map
    }

    #[inline]
    pub fn num_local_rows(&self) -> usize {
        self.graph.num_local_rows()
    }

    /// Number of blocks in `row`; zero for a row this process does not own.
    #[inline]
    pub fn get_num_entries_in_local_row(&self, row: usize) -> usize {
        self.graph.num_entries_in_local_row(row)
    }

    /// Column indices and values of `row` without copying.
    ///
    /// `None` for an invalid row, which owns no entries.
    pub fn get_local_row_view(&self, row: usize) -> Option<BlockRowView<'_, T>> {
        let range = self.graph.row_range(row)?;
        let cols = &self.graph.col_ind()[range.clone()];
        Some(BlockRowView::new(
            row,
            cols,
            self.storage.values(range),
            self.storage.layout(),
        ))
    }

    /// Mutable view of `row`. Column indices stay read-only.
    pub fn get_local_row_view_mut(&mut self, row: usize) -> Option<BlockRowMut<'_, T>> {
        let range = self.graph.row_range(row)?;
        let layout = self.storage.layout();
        let cols = &self.graph.col_ind()[range.clone()];
        Some(BlockRowMut::new(row, cols, self.storage.values_mut(range), layout))
    }

    /// Mutable views of every local row at once.
    ///
    /// The views never overlap, so they can be sent to different threads.
    pub fn local_rows_mut(&mut self) -> impl Iterator<Item = BlockRowMut<'_, T>> {
        let layout = self.storage.layout();
        let size = layout.allocation_size_per_block();
        let graph = &*self.graph;
        let mut rest = self.storage.as_mut_slice();
        (0..graph.num_local_rows()).map(move |r| {
            let (start, end) = (graph.row_ptr()[r], graph.row_ptr()[r + 1]);
            let (head, tail) = std::mem::take(&mut rest).split_at_mut((end - start) * size);
            rest = tail;
            BlockRowMut::new(r, &graph.col_ind()[start..end], head, layout)
        })
    }

    /// Overwrite the blocks of `row` at local columns `col_inds`.
    ///
    /// `vals` holds one packed `B x B` block per column, in the matrix's
    /// orientation. Returns the number of columns found in the row; the
    /// others are skipped. An invalid row writes nothing and returns 0.
    ///
    /// # Panics
    ///
    /// Panics if a column found in the row has no complete input block in
    /// `vals`. Input for skipped columns is never read.
    pub fn replace_local_values(&mut self, row: usize, col_inds: &[usize], vals: &[T]) -> usize {
        self.get_local_row_view_mut(row)
            .map_or(0, |mut view| view.replace_local_values(col_inds, vals))
    }

    /// Add into the blocks of `row` at local columns `col_inds`.
    ///
    /// Same input layout and panics as
    /// [`replace_local_values`](Self::replace_local_values).
    pub fn sum_into_local_values(&mut self, row: usize, col_inds: &[usize], vals: &[T]) -> usize {
        self.get_local_row_view_mut(row)
            .map_or(0, |mut view| view.sum_into_local_values(col_inds, vals))
    }

    /// Resolver over this matrix's graph.
    pub fn offset_resolver(&self) -> OffsetResolver<'_> {
        OffsetResolver::new(&self.graph)
    }

    /// Relative offsets of `col_inds` within `row` (`None` where absent).
    pub fn get_local_row_offsets(&self, row: usize, col_inds: &[usize]) -> Vec<Option<usize>> {
        self.offset_resolver().local_row_offsets(row, col_inds)
    }

    /// Offsets of every entry of `row`.
    pub fn get_local_row_offsets_all(&self, row: usize) -> Vec<usize> {
        self.offset_resolver().all_row_offsets(row)
    }

    /// Overwrite blocks of `row` at precomputed offsets.
    pub fn replace_local_values_by_offsets<O>(&mut self, row: usize, offsets: &[O], vals: &[T]) -> usize
    where
        O: Copy + Into<Option<usize>>,
    {
        self.get_local_row_view_mut(row)
            .map_or(0, |mut view| view.replace_local_values_by_offsets(offsets, vals))
    }

    /// Add into blocks of `row` at precomputed offsets.
    pub fn sum_into_local_values_by_offsets<O>(&mut self, row: usize, offsets: &[O], vals: &[T]) -> usize
    where
        O: Copy + Into<Option<usize>>,
    {
        self.get_local_row_view_mut(row)
            .map_or(0, |mut view| view.sum_into_local_values_by_offsets(offsets, vals))
    }

    /// Set every stored value, padding included.
    pub fn set_all_to_scalar(&mut self, value: T) {
        self.storage.fill(value);
    }

    /// Always false: only the non-transposed apply is implemented.
    pub fn has_transpose_apply(&self) -> bool {
        false
    }

    /// Dense copy of the local part, rows by row map, columns by column map.
    pub fn to_dense_local(&self) -> Mat<T> {
        let b = self.block_size();
        let num_cols = self.graph.col_map().num_local();
        let mut dense = Mat::<T>::zeros(self.num_local_rows() * b, num_cols * b);
        let mut view = dense.as_mut();
        for r in 0..self.num_local_rows() {
            let Some(row) = self.get_local_row_view(r) else {
                continue;
            };
            for (c, block) in row.iter() {
                for i in 0..b {
                    for j in 0..b {
                        view[(r * b + i, c * b + j)] = block.get(i, j);
                    }
                }
            }
        }
        dense
    }

    /// `Y := beta * Y + alpha * Op(A) * X` on block multivectors.
    ///
    /// `X` lives on the domain map and `Y` on the range map. The row
    /// backend is chosen by the configured [`ExecutionPolicy`](crate::ExecutionPolicy).
    ///
    /// # Errors
    ///
    /// Returns `NotImplemented` for the transposed modes, and a mismatch
    /// error if `X` or `Y` does not fit the matrix.
    pub fn apply_block(
        &self,
        x: &BlockMultiVector<T>,
        y: &mut BlockMultiVector<T>,
        mode: TransposeMode,
        alpha: T,
        beta: T,
    ) -> Result<()> {
        #[cfg(feature = "parallel")]
        if self.config.execution.use_parallel(self.num_local_rows()) {
            return self.apply_block_with::<RayonBackend>(x, y, mode, alpha, beta);
        }
        self.apply_block_with::<SerialBackend>(x, y, mode, alpha, beta)
    }

    /// [`apply_block`](Self::apply_block) with an explicit row backend.
    pub fn apply_block_with<Bk: RowBackend>(
        &self,
        x: &BlockMultiVector<T>,
        y: &mut BlockMultiVector<T>,
        mode: TransposeMode,
        alpha: T,
        beta: T,
    ) -> Result<()> {
        if mode.is_transpose() {
            return Err(not_implemented("transpose apply"));
        }
        self.check_vectors(x, y)?;
        let b = self.block_size();
        if b == 0 {
            return Ok(());
        }

        let graph = &*self.graph;
        let num_vecs = x.num_vecs();
        let import = !graph.col_map().is_same_as(graph.domain_map());
        let export = !graph.row_map().is_same_as(graph.range_map());
        log::trace!(
            "apply_block: {} vectors, import {}, export {}",
            num_vecs,
            import,
            export
        );

        let mut guard = self.cache.lock();
        let ApplyCache {
            x_col_map,
            y_row_map,
        } = &mut *guard;

        let x_local: &BlockMultiVector<T> = if import {
            let cached = ensure_cached(x_col_map, graph.col_map(), b, num_vecs)?;
            self.transfer.import(x, cached)?;
            &*cached
        } else {
            x
        };

        if export {
            let cached = ensure_cached(y_row_map, graph.row_map(), b, num_vecs)?;
            local_apply::<T, Bk>(
                graph,
                &self.storage,
                x_local.as_blocks(),
                cached,
                num_vecs,
                alpha,
                T::zero(),
            );
            y.scale(beta);
            self.transfer.export(cached, y, CombineMode::Add)?;
        } else {
            local_apply::<T, Bk>(graph, &self.storage, x_local.as_blocks(), y, num_vecs, alpha, beta);
        }
        Ok(())
    }

    fn check_vectors(&self, x: &BlockMultiVector<T>, y: &BlockMultiVector<T>) -> Result<()> {
        let b = self.block_size();
        for v in [x, y] {
            if v.block_size() != b {
                return Err(BlockCrsError::InvalidBlockSize {
                    block_size: v.block_size(),
                });
            }
        }
        if !x.mesh_map().is_same_as(self.graph.domain_map()) {
            return Err(BlockCrsError::MapMismatch {
                context: format!("X is on {}, domain map is {}", x.mesh_map(), self.graph.domain_map()),
            });
        }
        if !y.mesh_map().is_same_as(self.graph.range_map()) {
            return Err(BlockCrsError::MapMismatch {
                context: format!("Y is on {}, range map is {}", y.mesh_map(), self.graph.range_map()),
            });
        }
        if x.num_vecs() != y.num_vecs() {
            return Err(BlockCrsError::VectorCountMismatch {
                x: x.num_vecs(),
                y: y.num_vecs(),
            });
        }
        Ok(())
    }

    pub(crate) fn storage_mut(&mut self) -> &mut BlockStorage<T> {
        &mut self.storage
    }
}

fn check_point_map(which: &str, point_map: &Map, mesh_map: &Map, block_size: usize) -> Result<()> {
    let expected = mesh_map.num_local() * block_size;
    if point_map.num_local() != expected {
        return Err(BlockCrsError::MapMismatch {
            context: format!(
                "{which} point map has {} entries, expected {expected}",
                point_map.num_local()
            ),
        });
    }
    Ok(())
}

impl<T: Scalar> Operator<T> for BlockCrsMatrix<T> {
    fn domain_map(&self) -> &Arc<Map> {
        &self.domain_point_map
    }

    fn range_map(&self) -> &Arc<Map> {
        &self.range_point_map
    }

    /// Views `x` and `y` as block multivectors and calls
    /// [`apply_block`](BlockCrsMatrix::apply_block). `x` is copied; `y` is
    /// moved in and out, and is left untouched on a shape error.
    fn apply(
        &self,
        x: &MultiVector<T>,
        y: &mut MultiVector<T>,
        mode: TransposeMode,
        alpha: T,
        beta: T,
    ) -> Result<()> {
        let b = self.block_size();
        check_point_map("Y", y.map(), self.graph.range_map(), b)?;
        let x_blocks = BlockMultiVector::from_multivector(x.clone(), self.graph.domain_map().clone(), b)?;
        let mut y_blocks = BlockMultiVector::from_multivector(
            std::mem::take(y),
            self.graph.range_map().clone(),
            b,
        )?;
        let result = self.apply_block(&x_blocks, &mut y_blocks, mode, alpha, beta);
        *y = y_blocks.into_multivector();
        result
    }

    fn has_transpose_apply(&self) -> bool {
        false
    }
}

/// Block rows cannot be migrated between processes. The hooks exist so the
/// matrix satisfies [`DistObject`]; transfers refuse it up front through
/// [`DistObject::MIGRATION`], and calling a hook directly is an error.
impl<T: Scalar> DistObject for BlockCrsMatrix<T> {
    type Packet = u8;

    const MIGRATION: MigrationSupport = MigrationSupport::Unsupported;

    const NAME: &'static str = "BlockCrsMatrix";

    fn map(&self) -> &Arc<Map> {
        self.graph.row_map()
    }

    fn check_sizes(&self, _source: &Self) -> Result<bool> {
        Err(not_implemented("BlockCrsMatrix::check_sizes"))
    }

    fn copy_and_permute(
        &mut self,
        _source: &Self,
        _num_same_ids: usize,
        _permute_to: &[usize],
        _permute_from: &[usize],
        _mode: CombineMode,
    ) -> Result<()> {
        Err(not_implemented("BlockCrsMatrix::copy_and_permute"))
    }

    fn pack_and_prepare(&self, _export_lids: &[usize], _exports: &mut Vec<u8>) -> Result<usize> {
        Err(not_implemented("BlockCrsMatrix::pack_and_prepare"))
    }

    fn unpack_and_combine(
        &mut self,
        _import_lids: &[usize],
        _imports: &[u8],
        _packets_per_lid: usize,
        _mode: CombineMode,
    ) -> Result<()> {
        Err(not_implemented("BlockCrsMatrix::unpack_and_combine"))
    }
}
