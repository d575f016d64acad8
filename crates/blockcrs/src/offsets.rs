//! Column-index to structural-offset resolution.
//!
//! Offsets returned here are relative to the start of the row: offset `o` of
//! row `r` is structural entry `row_ptr[r] + o`. Fill loops that revisit the
//! same pattern resolve their offsets once with
//! [`OffsetResolver::local_row_offsets`] and then write through the
//! by-offset operations, skipping the search.

use crate::graph::CrsGraph;

/// Hint-accelerated search over the sorted column indices of a graph.
#[derive(Clone, Copy, Debug)]
pub struct OffsetResolver<'g> {
    graph: &'g CrsGraph,
}

impl<'g> OffsetResolver<'g> {
    pub fn new(graph: &'g CrsGraph) -> Self {
        Self { graph }
    }

    /// Relative offset of `col` within `row`, or `None`.
    ///
    /// `hint` is where the caller expects the column to be, typically one
    /// past the previous hit. It is checked first, then `hint + 1`, then
    /// the row is binary searched. An invalid row resolves nothing.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use blockcrs::{CrsGraph, Map, OffsetResolver};
    ///
    /// let map = Arc::new(Map::contiguous(4));
    /// let mut graph = CrsGraph::from_local_rows(map.clone(), map, &[vec![0, 2, 3], vec![], vec![], vec![]]).unwrap();
    /// graph.fill_complete_default().unwrap();
    ///
    /// let resolver = OffsetResolver::new(&graph);
    /// assert_eq!(resolver.find_offset_of_column_index(0, 2, 1), Some(1));
    /// assert_eq!(resolver.find_offset_of_column_index(0, 3, 0), Some(2));
    /// assert_eq!(resolver.find_offset_of_column_index(0, 1, 0), None);
    /// assert_eq!(resolver.find_offset_of_column_index(9, 0, 0), None);
    /// ```
    pub fn find_offset_of_column_index(&self, row: usize, col: usize, hint: usize) -> Option<usize> {
        let cols = self.graph.row_indices(row)?;
        find_in_sorted(cols, col, hint)
    }

    /// Resolve several columns of one row at once.
    ///
    /// Entry `i` of the result is the offset of `col_inds[i]`, or `None` if
    /// that column is not stored. Each lookup hints one past the previous
    /// hit, so columns given in increasing order resolve without searching.
    pub fn local_row_offsets(&self, row: usize, col_inds: &[usize]) -> Vec<Option<usize>> {
        let Some(cols) = self.graph.row_indices(row) else {
            return vec![None; col_inds.len()];
        };
        let mut hint = 0;
        col_inds
            .iter()
            .map(|&col| {
                let found = find_in_sorted(cols, col, hint);
                if let Some(offset) = found {
                    hint = offset + 1;
                }
                found
            })
            .collect()
    }

    /// Offsets of every entry of `row`, in storage order.
    pub fn all_row_offsets(&self, row: usize) -> Vec<usize> {
        (0..self.graph.num_entries_in_local_row(row)).collect()
    }
}

/// Search a sorted, duplicate-free column list.
#[inline]
pub(crate) fn find_in_sorted(cols: &[usize], col: usize, hint: usize) -> Option<usize> {
    if cols.get(hint) == Some(&col) {
        return Some(hint);
    }
    if let Some(next) = hint.checked_add(1) {
        if cols.get(next) == Some(&col) {
            return Some(next);
        }
    }
    cols.binary_search(&col).ok()
}
