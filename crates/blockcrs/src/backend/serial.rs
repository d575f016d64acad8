//! Serial row backend.

use crate::backend::RowBackend;

/// Visits rows one after another on the calling thread.
///
/// Always available; also the fallback when the `parallel` feature is off.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialBackend;

impl RowBackend for SerialBackend {
    fn for_each_row<T, F>(out: &mut [T], row_len: usize, f: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Sync + Send,
    {
        if row_len == 0 {
            return;
        }
        for (r, chunk) in out.chunks_mut(row_len).enumerate() {
            f(r, chunk);
        }
    }
}
