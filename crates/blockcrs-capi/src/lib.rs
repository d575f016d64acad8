//! C API for blockcrs
//!
//! This crate exposes the `f64` block matrix to C and other languages
//! through opaque handles and integer status codes.
//!
//! Maps are contiguous: `num_rows` mesh rows, `num_cols` mesh columns, the
//! domain map equal to the column map and the range map equal to the row
//! map. Vectors are passed as column-major point-level arrays.
//!
//! All extern "C" functions are inherently unsafe as they work with raw pointers
//! from foreign code. The `#[unsafe(no_mangle)]` attribute marks the entire
//! function signature as unsafe at the FFI boundary.

#![allow(clippy::not_unsafe_ptr_arg_deref)]

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::ptr;
use std::sync::Arc;

use blockcrs::{
    BlockCrsError, BlockCrsMatrix, BlockMultiVector, CrsGraph, Map, MultiVector, TransposeMode,
};
use libc::{c_double, c_int, size_t};

// Status codes
pub type StatusCode = c_int;

pub const BCRS_SUCCESS: StatusCode = 0;
pub const BCRS_INVALID_ARGUMENT: StatusCode = -1;
pub const BCRS_SHAPE_MISMATCH: StatusCode = -2;
pub const BCRS_INDEX_OUT_OF_BOUNDS: StatusCode = -3;
pub const BCRS_INTERNAL_ERROR: StatusCode = -4;
pub const BCRS_NOT_IMPLEMENTED: StatusCode = -5;
pub const BCRS_MALFORMED_GRAPH: StatusCode = -6;

// Values of the `mode` argument of `bcrs_matrix_f64_apply`.
pub const BCRS_NO_TRANS: c_int = 0;
pub const BCRS_TRANS: c_int = 1;
pub const BCRS_CONJ_TRANS: c_int = 2;

fn status_from_error(err: &BlockCrsError) -> StatusCode {
    match err {
        BlockCrsError::MalformedGraph { .. }
        | BlockCrsError::GraphNotFillComplete
        | BlockCrsError::DuplicateGlobalIndex { .. } => BCRS_MALFORMED_GRAPH,
        BlockCrsError::IndexOutOfBounds { .. } | BlockCrsError::MissingGlobalIndex { .. } => {
            BCRS_INDEX_OUT_OF_BOUNDS
        }
        BlockCrsError::ShapeMismatch { .. }
        | BlockCrsError::MapMismatch { .. }
        | BlockCrsError::VectorCountMismatch { .. } => BCRS_SHAPE_MISMATCH,
        BlockCrsError::InvalidBlockSize { .. }
        | BlockCrsError::InvalidColumnPadding { .. }
        | BlockCrsError::GlobalIndexOverflow { .. } => BCRS_INVALID_ARGUMENT,
        BlockCrsError::NotImplemented { .. } | BlockCrsError::MigrationUnsupported { .. } => {
            BCRS_NOT_IMPLEMENTED
        }
    }
}

/// Opaque block matrix type for f64
#[repr(C)]
pub struct bcrs_matrix_f64 {
    _private: *mut std::ffi::c_void,
}

impl bcrs_matrix_f64 {
    fn from_matrix(matrix: BlockCrsMatrix<f64>) -> Self {
        let boxed = Box::new(matrix);
        Self {
            _private: Box::into_raw(boxed) as *mut std::ffi::c_void,
        }
    }

    fn inner(&self) -> &BlockCrsMatrix<f64> {
        unsafe { &*(self._private as *const BlockCrsMatrix<f64>) }
    }

    fn inner_mut(&mut self) -> &mut BlockCrsMatrix<f64> {
        unsafe { &mut *(self._private as *mut BlockCrsMatrix<f64>) }
    }
}

impl Drop for bcrs_matrix_f64 {
    fn drop(&mut self) {
        if !self._private.is_null() {
            unsafe {
                let _ = Box::from_raw(self._private as *mut BlockCrsMatrix<f64>);
            }
        }
    }
}

unsafe fn slice_or_empty<'a, T>(data: *const T, len: size_t) -> &'a [T] {
    if len == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(data, len) }
    }
}

fn build_matrix(
    num_rows: usize,
    num_cols: usize,
    row_ptr: &[usize],
    col_ind: &[usize],
    block_size: usize,
) -> Result<BlockCrsMatrix<f64>, BlockCrsError> {
    let row_map = Arc::new(Map::contiguous(num_rows));
    let col_map = Arc::new(Map::contiguous(num_cols));
    let mut graph = CrsGraph::from_raw(row_map.clone(), col_map.clone(), row_ptr.to_vec(), col_ind.to_vec())?;
    graph.fill_complete(col_map, row_map)?;
    BlockCrsMatrix::new(Arc::new(graph), block_size)
}

// ============================================================================
// Matrix creation functions
// ============================================================================

/// Create a zero block matrix from compressed row arrays.
///
/// # Arguments
/// * `num_rows` - Number of block rows
/// * `num_cols` - Number of block columns
/// * `row_ptr` - Row offsets (`num_rows + 1` entries)
/// * `col_ind` - Column indices (`row_ptr[num_rows]` entries)
/// * `nnz` - Length of `col_ind`
/// * `block_size` - Size B of the dense blocks
/// * `status` - Pointer to receive status code
///
/// # Returns
/// Pointer to new matrix, or null on error
#[unsafe(no_mangle)]
pub extern "C" fn bcrs_matrix_f64_new(
    num_rows: size_t,
    num_cols: size_t,
    row_ptr: *const size_t,
    col_ind: *const size_t,
    nnz: size_t,
    block_size: size_t,
    status: *mut StatusCode,
) -> *mut bcrs_matrix_f64 {
    if status.is_null() {
        return ptr::null_mut();
    }

    if row_ptr.is_null() || (col_ind.is_null() && nnz > 0) {
        unsafe {
            *status = BCRS_INVALID_ARGUMENT;
        }
        return ptr::null_mut();
    }

    let result = catch_unwind(|| {
        let row_ptr_slice = unsafe { std::slice::from_raw_parts(row_ptr, num_rows + 1) };
        let col_ind_slice = unsafe { slice_or_empty(col_ind, nnz) };

        match build_matrix(num_rows, num_cols, row_ptr_slice, col_ind_slice, block_size) {
            Ok(matrix) => {
                let ptr = Box::into_raw(Box::new(bcrs_matrix_f64::from_matrix(matrix)));
                (ptr, BCRS_SUCCESS)
            }
            Err(err) => (ptr::null_mut(), status_from_error(&err)),
        }
    });

    match result {
        Ok((ptr, code)) => {
            unsafe {
                *status = code;
            }
            ptr
        }
        Err(_) => {
            unsafe {
                *status = BCRS_INTERNAL_ERROR;
            }
            ptr::null_mut()
        }
    }
}

/// Release (free) a matrix.
#[unsafe(no_mangle)]
pub extern "C" fn bcrs_matrix_f64_release(matrix: *mut bcrs_matrix_f64) {
    if !matrix.is_null() {
        unsafe {
            let _ = Box::from_raw(matrix);
        }
    }
}

// ============================================================================
// Matrix query functions
// ============================================================================

/// Get the block size.
#[unsafe(no_mangle)]
pub extern "C" fn bcrs_matrix_f64_block_size(matrix: *const bcrs_matrix_f64) -> size_t {
    if matrix.is_null() {
        return 0;
    }

    let result = catch_unwind(AssertUnwindSafe(|| unsafe { (*matrix).inner().block_size() }));

    result.unwrap_or(0)
}

/// Get the number of local block rows.
#[unsafe(no_mangle)]
pub extern "C" fn bcrs_matrix_f64_num_local_rows(matrix: *const bcrs_matrix_f64) -> size_t {
    if matrix.is_null() {
        return 0;
    }

    let result = catch_unwind(AssertUnwindSafe(|| unsafe { (*matrix).inner().num_local_rows() }));

    result.unwrap_or(0)
}

/// Get the number of blocks in a row (0 for an invalid row).
#[unsafe(no_mangle)]
pub extern "C" fn bcrs_matrix_f64_num_entries_in_local_row(
    matrix: *const bcrs_matrix_f64,
    row: size_t,
) -> size_t {
    if matrix.is_null() {
        return 0;
    }

    let result = catch_unwind(AssertUnwindSafe(|| unsafe {
        (*matrix).inner().get_num_entries_in_local_row(row)
    }));

    result.unwrap_or(0)
}

// ============================================================================
// Value mutation functions
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn write_values(
    matrix: *mut bcrs_matrix_f64,
    row: size_t,
    cols: *const size_t,
    ncols: size_t,
    vals: *const c_double,
    nvals: size_t,
    out_count: *mut size_t,
    sum_into: bool,
) -> StatusCode {
    if matrix.is_null() || out_count.is_null() || (ncols > 0 && (cols.is_null() || vals.is_null())) {
        return BCRS_INVALID_ARGUMENT;
    }

    let result = catch_unwind(AssertUnwindSafe(|| unsafe {
        let m = (*matrix).inner_mut();
        let b = m.block_size();
        if nvals < ncols * b * b {
            return BCRS_SHAPE_MISMATCH;
        }
        let cols_slice = slice_or_empty(cols, ncols);
        let vals_slice = slice_or_empty(vals, nvals);
        *out_count = if sum_into {
            m.sum_into_local_values(row, cols_slice, vals_slice)
        } else {
            m.replace_local_values(row, cols_slice, vals_slice)
        };
        BCRS_SUCCESS
    }));

    result.unwrap_or(BCRS_INTERNAL_ERROR)
}

/// Overwrite blocks of one row.
///
/// # Arguments
/// * `matrix` - Matrix pointer
/// * `row` - Local block row
/// * `cols` - Local block columns (`ncols` entries)
/// * `vals` - `ncols` packed row-major `B x B` blocks
/// * `nvals` - Length of `vals`
/// * `out_count` - Receives the number of columns found in the row
///
/// # Returns
/// Status code
#[unsafe(no_mangle)]
pub extern "C" fn bcrs_matrix_f64_replace_local_values(
    matrix: *mut bcrs_matrix_f64,
    row: size_t,
    cols: *const size_t,
    ncols: size_t,
    vals: *const c_double,
    nvals: size_t,
    out_count: *mut size_t,
) -> StatusCode {
    write_values(matrix, row, cols, ncols, vals, nvals, out_count, false)
}

/// Add into blocks of one row. Arguments as for
/// `bcrs_matrix_f64_replace_local_values`.
#[unsafe(no_mangle)]
pub extern "C" fn bcrs_matrix_f64_sum_into_local_values(
    matrix: *mut bcrs_matrix_f64,
    row: size_t,
    cols: *const size_t,
    ncols: size_t,
    vals: *const c_double,
    nvals: size_t,
    out_count: *mut size_t,
) -> StatusCode {
    write_values(matrix, row, cols, ncols, vals, nvals, out_count, true)
}

/// Set every stored value.
#[unsafe(no_mangle)]
pub extern "C" fn bcrs_matrix_f64_fill(matrix: *mut bcrs_matrix_f64, value: c_double) -> StatusCode {
    if matrix.is_null() {
        return BCRS_INVALID_ARGUMENT;
    }

    let result = catch_unwind(AssertUnwindSafe(|| unsafe {
        (*matrix).inner_mut().set_all_to_scalar(value);
        BCRS_SUCCESS
    }));

    result.unwrap_or(BCRS_INTERNAL_ERROR)
}

// ============================================================================
// Matrix-vector product
// ============================================================================

fn apply_arrays(
    m: &BlockCrsMatrix<f64>,
    x: &[f64],
    y: &mut [f64],
    num_vecs: usize,
    mode: TransposeMode,
    alpha: f64,
    beta: f64,
) -> Result<(), BlockCrsError> {
    let b = m.block_size();
    let graph = m.graph();
    let x_mv = MultiVector::from_vec(
        Arc::new(graph.domain_map().point_map(b)?),
        num_vecs,
        x.to_vec(),
    )?;
    let y_mv = MultiVector::from_vec(
        Arc::new(graph.range_map().point_map(b)?),
        num_vecs,
        y.to_vec(),
    )?;
    let x_blocks = BlockMultiVector::from_multivector(x_mv, graph.domain_map().clone(), b)?;
    let mut y_blocks = BlockMultiVector::from_multivector(y_mv, graph.range_map().clone(), b)?;
    m.apply_block(&x_blocks, &mut y_blocks, mode, alpha, beta)?;
    y.copy_from_slice(y_blocks.multivector().data());
    Ok(())
}

/// Compute `y := beta * y + alpha * A * x`.
///
/// # Arguments
/// * `matrix` - Matrix pointer
/// * `x` - Input, `num_cols * B * num_vecs` values, column-major
/// * `x_len` - Length of `x`
/// * `y` - Output, `num_rows * B * num_vecs` values, column-major
/// * `y_len` - Length of `y`
/// * `num_vecs` - Number of vectors
/// * `mode` - `BCRS_NO_TRANS`; the transposed modes return `BCRS_NOT_IMPLEMENTED`
/// * `alpha`, `beta` - Scaling factors
///
/// # Returns
/// Status code; `y` is unchanged unless it is `BCRS_SUCCESS`
#[allow(clippy::too_many_arguments)]
#[unsafe(no_mangle)]
pub extern "C" fn bcrs_matrix_f64_apply(
    matrix: *const bcrs_matrix_f64,
    x: *const c_double,
    x_len: size_t,
    y: *mut c_double,
    y_len: size_t,
    num_vecs: size_t,
    mode: c_int,
    alpha: c_double,
    beta: c_double,
) -> StatusCode {
    if matrix.is_null() || (x.is_null() && x_len > 0) || (y.is_null() && y_len > 0) {
        return BCRS_INVALID_ARGUMENT;
    }
    let mode = match mode {
        BCRS_NO_TRANS => TransposeMode::NoTrans,
        BCRS_TRANS => TransposeMode::Trans,
        BCRS_CONJ_TRANS => TransposeMode::ConjTrans,
        _ => return BCRS_INVALID_ARGUMENT,
    };

    let result = catch_unwind(AssertUnwindSafe(|| unsafe {
        let m = (*matrix).inner();
        let x_slice = slice_or_empty(x, x_len);
        let y_slice: &mut [f64] = if y_len == 0 {
            &mut []
        } else {
            std::slice::from_raw_parts_mut(y, y_len)
        };
        match apply_arrays(m, x_slice, y_slice, num_vecs, mode, alpha, beta) {
            Ok(()) => BCRS_SUCCESS,
            Err(err) => status_from_error(&err),
        }
    }));

    result.unwrap_or(BCRS_INTERNAL_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two block rows, B = 2: row 0 stores columns 0 and 1, row 1 column 1.
    fn two_by_two() -> *mut bcrs_matrix_f64 {
        let row_ptr = [0usize, 2, 3];
        let col_ind = [0usize, 1, 1];
        let mut status: StatusCode = -999;
        let m = bcrs_matrix_f64_new(2, 2, row_ptr.as_ptr(), col_ind.as_ptr(), 3, 2, &mut status);
        assert_eq!(status, BCRS_SUCCESS);
        assert!(!m.is_null());
        m
    }

    #[test]
    fn test_matrix_new() {
        let m = two_by_two();
        assert_eq!(bcrs_matrix_f64_block_size(m), 2);
        assert_eq!(bcrs_matrix_f64_num_local_rows(m), 2);
        assert_eq!(bcrs_matrix_f64_num_entries_in_local_row(m, 0), 2);
        assert_eq!(bcrs_matrix_f64_num_entries_in_local_row(m, 5), 0);
        bcrs_matrix_f64_release(m);
    }

    #[test]
    fn test_matrix_new_malformed() {
        let row_ptr = [0usize, 2, 1];
        let col_ind = [0usize];
        let mut status: StatusCode = -999;
        let m = bcrs_matrix_f64_new(2, 2, row_ptr.as_ptr(), col_ind.as_ptr(), 1, 2, &mut status);
        assert!(m.is_null());
        assert_eq!(status, BCRS_MALFORMED_GRAPH);
    }

    #[test]
    fn test_replace_and_apply() {
        let m = two_by_two();
        let identity = [1.0, 0.0, 0.0, 1.0];
        let twice = [2.0, 0.0, 0.0, 2.0, 2.0, 0.0, 0.0, 2.0];
        let mut count = 0usize;

        assert_eq!(
            bcrs_matrix_f64_replace_local_values(m, 0, [0usize, 1].as_ptr(), 2, twice.as_ptr(), 8, &mut count),
            BCRS_SUCCESS
        );
        assert_eq!(count, 2);
        assert_eq!(
            bcrs_matrix_f64_sum_into_local_values(m, 0, [0usize].as_ptr(), 1, identity.as_ptr(), 4, &mut count),
            BCRS_SUCCESS
        );
        assert_eq!(count, 1);
        assert_eq!(
            bcrs_matrix_f64_replace_local_values(m, 1, [0usize].as_ptr(), 1, identity.as_ptr(), 4, &mut count),
            BCRS_SUCCESS
        );
        assert_eq!(count, 0);

        // Row 0 = [3I, 2I], row 1 = [0, 0].
        let x = [1.0f64; 4];
        let mut y = [f64::NAN; 4];
        assert_eq!(
            bcrs_matrix_f64_apply(m, x.as_ptr(), 4, y.as_mut_ptr(), 4, 1, BCRS_NO_TRANS, 1.0, 0.0),
            BCRS_SUCCESS
        );
        assert_eq!(y, [5.0, 5.0, 0.0, 0.0]);

        bcrs_matrix_f64_release(m);
    }

    #[test]
    fn test_apply_errors() {
        let m = two_by_two();
        let x = [1.0f64; 4];
        let mut y = [0.0f64; 4];
        assert_eq!(
            bcrs_matrix_f64_apply(m, x.as_ptr(), 4, y.as_mut_ptr(), 4, 1, BCRS_TRANS, 1.0, 0.0),
            BCRS_NOT_IMPLEMENTED
        );
        assert_eq!(
            bcrs_matrix_f64_apply(m, x.as_ptr(), 3, y.as_mut_ptr(), 4, 1, BCRS_NO_TRANS, 1.0, 0.0),
            BCRS_SHAPE_MISMATCH
        );
        assert_eq!(
            bcrs_matrix_f64_apply(m, x.as_ptr(), 4, y.as_mut_ptr(), 4, 1, 7, 1.0, 0.0),
            BCRS_INVALID_ARGUMENT
        );
        bcrs_matrix_f64_release(m);
    }

    #[test]
    fn test_short_values_rejected() {
        let m = two_by_two();
        let vals = [1.0f64; 3];
        let mut count = 0usize;
        assert_eq!(
            bcrs_matrix_f64_replace_local_values(m, 0, [0usize].as_ptr(), 1, vals.as_ptr(), 3, &mut count),
            BCRS_SHAPE_MISMATCH
        );
        assert_eq!(bcrs_matrix_f64_fill(m, 1.0), BCRS_SUCCESS);
        bcrs_matrix_f64_release(m);
    }
}
