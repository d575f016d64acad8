//! Distributed-object protocol used by data transfers.
//!
//! A transfer moves entries between two objects distributed over different
//! maps in four steps: size check, local copy/permute, pack of outgoing
//! entries, and unpack/combine of incoming ones. Types that cannot migrate
//! say so in their [`DistObject::MIGRATION`] constant, so a driver can refuse
//! them before calling any hook.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::map::Map;

/// How incoming values are merged with existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CombineMode {
    /// Overwrite.
    #[default]
    Insert,
    /// Sum into the existing value.
    Add,
    /// Overwrite only entries that already exist (same as `Insert` for
    /// dense objects).
    Replace,
}

/// Whether a type implements the migration hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationSupport {
    Supported,
    Unsupported,
}

/// An object whose local entries are indexed by a [`Map`] and that can take
/// part in import/export.
pub trait DistObject {
    /// Unit of packed data.
    type Packet: Copy + Default + Send;

    /// Static capability flag, checked before any hook runs.
    const MIGRATION: MigrationSupport;

    /// Short name used in error messages.
    const NAME: &'static str;

    /// Map indexing the object's local entries.
    fn map(&self) -> &Arc<Map>;

    /// Whether `source` can be transferred into `self`.
    fn check_sizes(&self, source: &Self) -> Result<bool>;

    /// Copy the first `num_same_ids` entries unchanged, then entry
    /// `permute_from[i]` of `source` into entry `permute_to[i]` of `self`.
    fn copy_and_permute(
        &mut self,
        source: &Self,
        num_same_ids: usize,
        permute_to: &[usize],
        permute_from: &[usize],
        mode: CombineMode,
    ) -> Result<()>;

    /// Append the packets of `export_lids` to `exports`; returns the constant
    /// number of packets per entry.
    fn pack_and_prepare(&self, export_lids: &[usize], exports: &mut Vec<Self::Packet>)
    -> Result<usize>;

    /// Merge `imports` (laid out `packets_per_lid` per entry) into the
    /// entries `import_lids`.
    fn unpack_and_combine(
        &mut self,
        import_lids: &[usize],
        imports: &[Self::Packet],
        packets_per_lid: usize,
        mode: CombineMode,
    ) -> Result<()>;
}

/// Whether `D` can be passed to a transfer at all.
pub fn supports_migration<D: DistObject>() -> bool {
    D::MIGRATION == MigrationSupport::Supported
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_mode_default() {
        assert_eq!(CombineMode::default(), CombineMode::Insert);
    }
}
