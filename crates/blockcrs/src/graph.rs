//! Compressed row sparsity graph.
//!
//! The graph is the structural input of a block matrix: row offsets into a
//! shared column index array plus the row, column, domain and range maps.
//! Once [`CrsGraph::fill_complete`] succeeds the graph is immutable.

use std::sync::Arc;

use crate::error::{BlockCrsError, Result};
use crate::map::Map;

/// Sparsity graph in compressed row form, indexed by local mesh indices.
///
/// `row_ptr` has `num_local_rows + 1` entries; the columns of row `r` are
/// `col_ind[row_ptr[r]..row_ptr[r + 1]]`, stored as local column-map indices.
/// After `fill_complete` each row is sorted and free of duplicates.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use blockcrs::{CrsGraph, Map};
///
/// let map = Arc::new(Map::contiguous(3));
/// let mut graph = CrsGraph::from_local_rows(
///     map.clone(),
///     map.clone(),
///     &[vec![0, 1], vec![1], vec![2, 0]],
/// )
/// .unwrap();
/// graph.fill_complete_default().unwrap();
///
/// assert_eq!(graph.num_entries(), 5);
/// assert_eq!(graph.row_indices(2), Some(&[0, 2][..]));
/// ```
#[derive(Clone, Debug)]
pub struct CrsGraph {
    row_map: Arc<Map>,
    col_map: Arc<Map>,
    domain_map: Arc<Map>,
    range_map: Arc<Map>,
    row_ptr: Vec<usize>,
    col_ind: Vec<usize>,
    fill_complete: bool,
}

impl CrsGraph {
    /// Build a graph from raw compressed row arrays.
    ///
    /// Domain and range maps default to the row map until
    /// [`fill_complete`](Self::fill_complete) sets them.
    ///
    /// # Errors
    ///
    /// Returns `MalformedGraph` if `row_ptr` has the wrong length, is not
    /// monotone, or does not end at `col_ind.len()`.
    pub fn from_raw(
        row_map: Arc<Map>,
        col_map: Arc<Map>,
        row_ptr: Vec<usize>,
        col_ind: Vec<usize>,
    ) -> Result<Self> {
        let num_rows = row_map.num_local();
        if row_ptr.len() != num_rows + 1 {
            return Err(malformed(format!(
                "row_ptr has {} entries, expected {}",
                row_ptr.len(),
                num_rows + 1
            )));
        }
        if row_ptr[0] != 0 {
            return Err(malformed(format!("row_ptr starts at {}", row_ptr[0])));
        }
        if let Some(r) = row_ptr.windows(2).position(|w| w[0] > w[1]) {
            return Err(malformed(format!("row_ptr decreases at row {r}")));
        }
        if row_ptr[num_rows] != col_ind.len() {
            return Err(malformed(format!(
                "row_ptr ends at {} but there are {} column indices",
                row_ptr[num_rows],
                col_ind.len()
            )));
        }
        Ok(Self {
            domain_map: row_map.clone(),
            range_map: row_map.clone(),
            row_map,
            col_map,
            row_ptr,
            col_ind,
            fill_complete: false,
        })
    }

    /// Build a graph from per-row lists of local column indices.
    pub fn from_local_rows(
        row_map: Arc<Map>,
        col_map: Arc<Map>,
        rows: &[Vec<usize>],
    ) -> Result<Self> {
        let mut row_ptr = Vec::with_capacity(rows.len() + 1);
        row_ptr.push(0);
        let mut col_ind = Vec::with_capacity(rows.iter().map(Vec::len).sum());
        for row in rows {
            col_ind.extend_from_slice(row);
            row_ptr.push(col_ind.len());
        }
        Self::from_raw(row_map, col_map, row_ptr, col_ind)
    }

    /// Validate the structure, sort each row, and freeze the graph.
    ///
    /// # Errors
    ///
    /// Returns `MalformedGraph` if a column index is outside the column map
    /// or a row names the same column twice.
    pub fn fill_complete(&mut self, domain_map: Arc<Map>, range_map: Arc<Map>) -> Result<()> {
        let num_cols = self.col_map.num_local();
        for r in 0..self.num_local_rows() {
            let row = &mut self.col_ind[self.row_ptr[r]..self.row_ptr[r + 1]];
            if let Some(&c) = row.iter().find(|&&c| c >= num_cols) {
                return Err(malformed(format!(
                    "row {r} has column {c}, column map has {num_cols} entries"
                )));
            }
            row.sort_unstable();
            if let Some(w) = row.windows(2).find(|w| w[0] == w[1]) {
                return Err(malformed(format!("row {r} repeats column {}", w[0])));
            }
        }
        self.domain_map = domain_map;
        self.range_map = range_map;
        self.fill_complete = true;
        log::debug!(
            "graph fill complete: {} rows, {} columns, {} entries",
            self.num_local_rows(),
            num_cols,
            self.num_entries()
        );
        Ok(())
    }

    /// [`fill_complete`](Self::fill_complete) with domain and range maps equal
    /// to the row map.
    pub fn fill_complete_default(&mut self) -> Result<()> {
        let row_map = self.row_map.clone();
        self.fill_complete(row_map.clone(), row_map)
    }

    /// Whether `fill_complete` has succeeded.
    #[inline]
    pub fn is_fill_complete(&self) -> bool {
        self.fill_complete
    }

    /// Number of local (mesh) rows.
    #[inline]
    pub fn num_local_rows(&self) -> usize {
        self.row_ptr.len() - 1
    }

    /// Total number of stored entries, `row_ptr[num_local_rows]`.
    #[inline]
    pub fn num_entries(&self) -> usize {
        self.col_ind.len()
    }

    /// Row offset array.
    #[inline]
    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    /// Column index array.
    #[inline]
    pub fn col_ind(&self) -> &[usize] {
        &self.col_ind
    }

    /// Range of structural offsets belonging to `row`.
    #[inline]
    pub fn row_range(&self, row: usize) -> Option<std::ops::Range<usize>> {
        if row < self.num_local_rows() {
            Some(self.row_ptr[row]..self.row_ptr[row + 1])
        } else {
            None
        }
    }

    /// Column indices of `row`, or `None` for an invalid row.
    #[inline]
    pub fn row_indices(&self, row: usize) -> Option<&[usize]> {
        self.row_range(row).map(|range| &self.col_ind[range])
    }

    /// Number of entries in `row`; zero for an invalid row.
    #[inline]
    pub fn num_entries_in_local_row(&self, row: usize) -> usize {
        self.row_range(row).map_or(0, |range| range.len())
    }

    pub fn row_map(&self) -> &Arc<Map> {
        &self.row_map
    }

    pub fn col_map(&self) -> &Arc<Map> {
        &self.col_map
    }

    pub fn domain_map(&self) -> &Arc<Map> {
        &self.domain_map
    }

    pub fn range_map(&self) -> &Arc<Map> {
        &self.range_map
    }
}

fn malformed(reason: String) -> BlockCrsError {
    BlockCrsError::MalformedGraph { reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(n: usize) -> Arc<Map> {
        Arc::new(Map::contiguous(n))
    }

    #[test]
    fn test_fill_complete_sorts_rows() {
        let map = square(3);
        let mut graph =
            CrsGraph::from_local_rows(map.clone(), map, &[vec![2, 0], vec![], vec![1]]).unwrap();
        assert!(!graph.is_fill_complete());
        graph.fill_complete_default().unwrap();
        assert!(graph.is_fill_complete());
        assert_eq!(graph.row_indices(0), Some(&[0, 2][..]));
        assert_eq!(graph.num_entries_in_local_row(1), 0);
        assert_eq!(graph.row_ptr(), &[0, 2, 2, 3]);
    }

    #[test]
    fn test_invalid_row_has_no_entries() {
        let map = square(2);
        let graph = CrsGraph::from_local_rows(map.clone(), map, &[vec![0], vec![1]]).unwrap();
        assert_eq!(graph.num_entries_in_local_row(2), 0);
        assert_eq!(graph.row_indices(7), None);
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let map = square(2);
        let mut graph =
            CrsGraph::from_local_rows(map.clone(), map, &[vec![1, 1], vec![0]]).unwrap();
        let err = graph.fill_complete_default().unwrap_err();
        assert!(matches!(err, BlockCrsError::MalformedGraph { .. }));
    }

    #[test]
    fn test_column_out_of_range_rejected() {
        let rows = square(1);
        let cols = square(2);
        let mut graph = CrsGraph::from_local_rows(rows, cols, &[vec![2]]).unwrap();
        assert!(graph.fill_complete_default().is_err());
    }

    #[test]
    fn test_raw_row_ptr_checks() {
        let map = square(2);
        assert!(CrsGraph::from_raw(map.clone(), map.clone(), vec![0, 1], vec![0]).is_err());
        assert!(CrsGraph::from_raw(map.clone(), map.clone(), vec![0, 2, 1], vec![0]).is_err());
        assert!(CrsGraph::from_raw(map.clone(), map.clone(), vec![0, 1, 3], vec![0, 1]).is_err());
        assert!(CrsGraph::from_raw(map.clone(), map, vec![0, 1, 2], vec![0, 1]).is_ok());
    }
}
