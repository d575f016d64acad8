//! Row scheduling backends for the local apply kernel.
//!
//! The kernel computes one independent output chunk per block row. A
//! backend decides how those chunks are visited:
//!
//! - `SerialBackend`: plain loop on the calling thread (always available)
//! - `RayonBackend`: rows spread over the rayon pool (`parallel` feature)

#[cfg(feature = "parallel")]
mod rayon;
mod serial;

#[cfg(feature = "parallel")]
pub use self::rayon::RayonBackend;
pub use serial::SerialBackend;

/// Backend trait for per-row work over disjoint output chunks.
///
/// `out` is split into consecutive chunks of `row_len` values; chunk `r`
/// belongs to row `r` and is handed to `f` together with the row index.
/// Rows may run in any order and concurrently, so `f` must only write its
/// own chunk.
pub trait RowBackend {
    fn for_each_row<T, F>(out: &mut [T], row_len: usize, f: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Sync + Send;
}
