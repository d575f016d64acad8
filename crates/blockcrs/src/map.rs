//! Index maps between local and global numbering.
//!
//! A [`Map`] lists the global indices owned by this process in local order.
//! Mesh-level maps (one entry per mesh point) expand into point-level maps
//! (one entry per degree of freedom) with [`Map::point_map`].

use std::collections::HashMap;

use crate::error::{BlockCrsError, Result};

/// Ordered set of locally owned global indices.
///
/// Local index `i` refers to `global_ids[i]`. Local indices from two
/// different maps are never interchangeable, even when the maps have the
/// same length.
///
/// # Example
///
/// ```
/// use blockcrs::Map;
///
/// let map = Map::new(vec![10, 4, 7]).unwrap();
/// assert_eq!(map.num_local(), 3);
/// assert_eq!(map.local_index(4), Some(1));
/// assert_eq!(map.global_index(2), Some(7));
/// assert_eq!(map.local_index(5), None);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Map {
    global_ids: Vec<usize>,
    lookup: HashMap<usize, usize>,
}

impl Map {
    /// Create a map from the list of locally owned global indices.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateGlobalIndex` if a global index appears twice.
    pub fn new(global_ids: Vec<usize>) -> Result<Self> {
        let mut lookup = HashMap::with_capacity(global_ids.len());
        for (lid, &gid) in global_ids.iter().enumerate() {
            if lookup.insert(gid, lid).is_some() {
                return Err(BlockCrsError::DuplicateGlobalIndex { gid });
            }
        }
        Ok(Self { global_ids, lookup })
    }

    /// Map owning global indices `0..n` in order.
    pub fn contiguous(n: usize) -> Self {
        let global_ids: Vec<usize> = (0..n).collect();
        let lookup = global_ids.iter().map(|&g| (g, g)).collect();
        Self { global_ids, lookup }
    }

    /// Number of locally owned indices.
    #[inline]
    pub fn num_local(&self) -> usize {
        self.global_ids.len()
    }

    /// Check if the map owns nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.global_ids.is_empty()
    }

    /// Global index of local index `lid`.
    #[inline]
    pub fn global_index(&self, lid: usize) -> Option<usize> {
        self.global_ids.get(lid).copied()
    }

    /// Local index of global index `gid`, if owned.
    #[inline]
    pub fn local_index(&self, gid: usize) -> Option<usize> {
        self.lookup.get(&gid).copied()
    }

    /// All owned global indices in local order.
    #[inline]
    pub fn global_indices(&self) -> &[usize] {
        &self.global_ids
    }

    /// True when both maps own the same global indices in the same order.
    pub fn is_same_as(&self, other: &Map) -> bool {
        std::ptr::eq(self, other) || self.global_ids == other.global_ids
    }

    /// Expand a mesh map into its point map.
    ///
    /// Mesh point `g` owns the `block_size` point indices
    /// `g * block_size .. (g + 1) * block_size`, numbered contiguously in the
    /// local point order.
    ///
    /// # Errors
    ///
    /// Returns `GlobalIndexOverflow` if `(g + 1) * block_size` does not fit
    /// in `usize` for some owned index `g` (never for a zero block size).
    ///
    /// ```
    /// use blockcrs::Map;
    ///
    /// let mesh = Map::new(vec![3, 1]).unwrap();
    /// let points = mesh.point_map(2).unwrap();
    /// assert_eq!(points.global_indices(), &[6, 7, 2, 3]);
    /// ```
    pub fn point_map(&self, block_size: usize) -> Result<Map> {
        let mut global_ids = Vec::with_capacity(self.num_local() * block_size);
        for &gid in &self.global_ids {
            let start = gid
                .checked_mul(block_size)
                .filter(|start| start.checked_add(block_size).is_some())
                .ok_or(BlockCrsError::GlobalIndexOverflow { gid, block_size })?;
            global_ids.extend(start..start + block_size);
        }
        let lookup = global_ids
            .iter()
            .enumerate()
            .map(|(lid, &gid)| (gid, lid))
            .collect();
        Ok(Map { global_ids, lookup })
    }
}

impl PartialEq for Map {
    fn eq(&self, other: &Self) -> bool {
        self.is_same_as(other)
    }
}

impl std::fmt::Display for Map {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Map(num_local={})", self.num_local())
    }
}
