//! Import and export of block multivectors between maps.
//!
//! The matrix consumes data movement through the [`BlockTransfer`] trait:
//! `import` redistributes a domain-map vector onto the column map, `export`
//! reduces a row-map vector into the range map. [`SerialTransfer`] is the
//! single-process implementation; a distributed runtime supplies its own
//! [`Distributor`] or a whole `BlockTransfer`.

use std::fmt::Debug;

use crate::block_multivector::BlockMultiVector;
use crate::dist_object::{CombineMode, DistObject, MigrationSupport};
use crate::error::{BlockCrsError, Result};
use crate::graph::CrsGraph;
use crate::map::Map;
use crate::scalar::Scalar;

/// Which local entries move where in one transfer.
///
/// Entries `0..num_same_ids` match one-to-one. `permute_from[i]` (source)
/// goes to `permute_to[i]` (target). `export_lids` (source) are packed,
/// sent through a [`Distributor`], and land on `remote_lids` (target).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransferPlan {
    pub num_same_ids: usize,
    pub permute_to: Vec<usize>,
    pub permute_from: Vec<usize>,
    pub export_lids: Vec<usize>,
    pub remote_lids: Vec<usize>,
}

impl TransferPlan {
    /// Plan that fills every target entry from the source.
    ///
    /// # Errors
    ///
    /// Returns `MissingGlobalIndex` if a target index is not owned by the
    /// source; a single process has nowhere else to fetch it from.
    pub fn import(source: &Map, target: &Map) -> Result<Self> {
        let num_same_ids = common_prefix(source, target);
        let mut plan = TransferPlan {
            num_same_ids,
            ..Default::default()
        };
        for (to, &gid) in target.global_indices().iter().enumerate().skip(num_same_ids) {
            let from = source
                .local_index(gid)
                .ok_or(BlockCrsError::MissingGlobalIndex { gid, side: "source" })?;
            plan.permute_to.push(to);
            plan.permute_from.push(from);
        }
        log::debug!(
            "import plan: {} same, {} permuted",
            plan.num_same_ids,
            plan.permute_to.len()
        );
        Ok(plan)
    }

    /// Plan that sends every source entry to the target.
    ///
    /// # Errors
    ///
    /// Returns `MissingGlobalIndex` if a source index is not owned by the
    /// target.
    pub fn export(source: &Map, target: &Map) -> Result<Self> {
        let num_same_ids = common_prefix(source, target);
        let mut plan = TransferPlan {
            num_same_ids,
            ..Default::default()
        };
        for (from, &gid) in source.global_indices().iter().enumerate().skip(num_same_ids) {
            let to = target
                .local_index(gid)
                .ok_or(BlockCrsError::MissingGlobalIndex { gid, side: "target" })?;
            plan.permute_to.push(to);
            plan.permute_from.push(from);
        }
        log::debug!(
            "export plan: {} same, {} permuted",
            plan.num_same_ids,
            plan.permute_to.len()
        );
        Ok(plan)
    }

    /// Check that every local index in the plan exists on its side.
    ///
    /// # Errors
    ///
    /// Returns `MapMismatch` if the plan was built for other maps.
    pub fn check_fits(&self, source: &Map, target: &Map) -> Result<()> {
        let (num_source, num_target) = (source.num_local(), target.num_local());
        let fits = self.num_same_ids <= num_source.min(num_target)
            && self.permute_to.len() == self.permute_from.len()
            && self.permute_from.iter().chain(&self.export_lids).all(|&lid| lid < num_source)
            && self.permute_to.iter().chain(&self.remote_lids).all(|&lid| lid < num_target);
        if fits {
            Ok(())
        } else {
            Err(BlockCrsError::MapMismatch {
                context: format!(
                    "transfer plan does not fit a source of {} and a target of {} entries",
                    num_source, num_target
                ),
            })
        }
    }

    /// True when no entry moves.
    pub fn is_identity(&self) -> bool {
        self.permute_to.is_empty() && self.export_lids.is_empty() && self.remote_lids.is_empty()
    }
}

fn common_prefix(a: &Map, b: &Map) -> usize {
    a.global_indices()
        .iter()
        .zip(b.global_indices())
        .take_while(|(x, y)| x == y)
        .count()
}

/// Moves packed buffers between processes.
///
/// The call is collective and blocking: every participant calls it in the
/// same order.
pub trait Distributor: Send + Sync + Debug {
    fn exchange<P: Copy + Send>(&self, exports: &[P], packets_per_lid: usize) -> Result<Vec<P>>;
}

/// Loopback distributor for a single process: what is sent is received.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalDistributor;

impl Distributor for LocalDistributor {
    fn exchange<P: Copy + Send>(&self, exports: &[P], _packets_per_lid: usize) -> Result<Vec<P>> {
        Ok(exports.to_vec())
    }
}

/// Run a transfer from `source` into `target` through the migration hooks.
///
/// # Errors
///
/// Returns `MigrationUnsupported` without touching either object if `D`
/// does not implement migration, and `MapMismatch` if `plan` indexes past
/// either object's map.
pub fn transfer<D: DistObject, X: Distributor>(
    target: &mut D,
    source: &D,
    plan: &TransferPlan,
    distributor: &X,
    mode: CombineMode,
) -> Result<()> {
    if D::MIGRATION == MigrationSupport::Unsupported {
        log::error!("{} was passed to a transfer but cannot migrate", D::NAME);
        return Err(BlockCrsError::MigrationUnsupported { object: D::NAME });
    }
    plan.check_fits(source.map(), target.map())?;
    if !target.check_sizes(source)? {
        return Err(BlockCrsError::MapMismatch {
            context: format!("{} source and target sizes are incompatible", D::NAME),
        });
    }
    target.copy_and_permute(
        source,
        plan.num_same_ids,
        &plan.permute_to,
        &plan.permute_from,
        mode,
    )?;
    if !plan.export_lids.is_empty() || !plan.remote_lids.is_empty() {
        let mut exports = Vec::new();
        let packets_per_lid = source.pack_and_prepare(&plan.export_lids, &mut exports)?;
        let imports = distributor.exchange(&exports, packets_per_lid)?;
        target.unpack_and_combine(&plan.remote_lids, &imports, packets_per_lid, mode)?;
    }
    Ok(())
}

/// Data movement the block matrix needs around its local kernel.
pub trait BlockTransfer<T: Scalar>: Send + Sync + Debug {
    /// Copy a domain-map vector onto the column map.
    fn import(&self, source: &BlockMultiVector<T>, target: &mut BlockMultiVector<T>) -> Result<()>;

    /// Combine a row-map vector into a range-map vector.
    fn export(
        &self,
        source: &BlockMultiVector<T>,
        target: &mut BlockMultiVector<T>,
        mode: CombineMode,
    ) -> Result<()>;
}

/// Single-process transfers derived from a graph's four maps.
#[derive(Clone, Debug)]
pub struct SerialTransfer<X: Distributor = LocalDistributor> {
    importer: TransferPlan,
    exporter: TransferPlan,
    distributor: X,
}

impl SerialTransfer<LocalDistributor> {
    /// Build the domain-to-column import and row-to-range export plans.
    pub fn new(graph: &CrsGraph) -> Result<Self> {
        Self::with_distributor(graph, LocalDistributor)
    }
}

impl<X: Distributor> SerialTransfer<X> {
    pub fn with_distributor(graph: &CrsGraph, distributor: X) -> Result<Self> {
        Ok(Self {
            importer: TransferPlan::import(graph.domain_map(), graph.col_map())?,
            exporter: TransferPlan::export(graph.row_map(), graph.range_map())?,
            distributor,
        })
    }

    pub fn import_plan(&self) -> &TransferPlan {
        &self.importer
    }

    pub fn export_plan(&self) -> &TransferPlan {
        &self.exporter
    }
}

impl<T: Scalar, X: Distributor> BlockTransfer<T> for SerialTransfer<X> {
    fn import(&self, source: &BlockMultiVector<T>, target: &mut BlockMultiVector<T>) -> Result<()> {
        transfer(target, source, &self.importer, &self.distributor, CombineMode::Insert)
    }

    fn export(
        &self,
        source: &BlockMultiVector<T>,
        target: &mut BlockMultiVector<T>,
        mode: CombineMode,
    ) -> Result<()> {
        transfer(target, source, &self.exporter, &self.distributor, mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_import_plan() {
        let source = Map::new(vec![0, 1, 2, 3]).unwrap();
        let target = Map::new(vec![0, 1, 3]).unwrap();
        let plan = TransferPlan::import(&source, &target).unwrap();
        assert_eq!(plan.num_same_ids, 2);
        assert_eq!(plan.permute_to, vec![2]);
        assert_eq!(plan.permute_from, vec![3]);
    }

    #[test]
    fn test_import_plan_missing() {
        let source = Map::new(vec![0, 1]).unwrap();
        let target = Map::new(vec![1, 5]).unwrap();
        assert!(matches!(
            TransferPlan::import(&source, &target),
            Err(BlockCrsError::MissingGlobalIndex { gid: 5, side: "source" })
        ));
    }

    #[test]
    fn test_plan_checked_against_maps() {
        let small = Map::contiguous(2);
        let large = Map::contiguous(4);
        let plan = TransferPlan::import(&large, &large).unwrap();
        assert!(plan.check_fits(&large, &large).is_ok());
        assert!(plan.check_fits(&small, &large).is_err());

        let permuted = TransferPlan::import(&Map::new(vec![3, 2, 1, 0]).unwrap(), &large).unwrap();
        assert!(permuted.check_fits(&large, &small).is_err());
    }

    #[test]
    fn test_identity_plan() {
        let map = Map::contiguous(3);
        let plan = TransferPlan::export(&map, &map).unwrap();
        assert!(plan.is_identity());
        assert_eq!(plan.num_same_ids, 3);
    }

    #[test]
    fn test_transfer_through_remote_lists() {
        let mesh = Arc::new(Map::contiguous(2));
        let mut source = BlockMultiVector::<f64>::new(mesh.clone(), 2, 1);
        source.replace_local_values(0, 0, &[1.0, 2.0]);
        source.replace_local_values(1, 0, &[3.0, 4.0]);

        let plan = TransferPlan {
            num_same_ids: 0,
            permute_to: vec![],
            permute_from: vec![],
            export_lids: vec![0, 1],
            remote_lids: vec![1, 0],
        };
        let mut target = BlockMultiVector::<f64>::new(mesh, 2, 1);
        target.put_scalar(1.0);
        transfer(&mut target, &source, &plan, &LocalDistributor, CombineMode::Add).unwrap();
        assert_eq!(target.multivector().data(), &[4.0, 5.0, 2.0, 3.0]);
    }

    #[test]
    fn test_block_size_mismatch_rejected() {
        let mesh = Arc::new(Map::contiguous(1));
        let source = BlockMultiVector::<f64>::new(mesh.clone(), 2, 1);
        let mut target = BlockMultiVector::<f64>::new(mesh.clone(), 3, 1);
        let plan = TransferPlan::import(&mesh, &mesh).unwrap();
        assert!(matches!(
            transfer(&mut target, &source, &plan, &LocalDistributor, CombineMode::Insert),
            Err(BlockCrsError::MapMismatch { .. })
        ));
    }
}
