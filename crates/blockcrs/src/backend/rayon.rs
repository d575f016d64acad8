//! Rayon row backend.

use rayon::prelude::*;

use crate::backend::RowBackend;

/// Spreads rows over the global rayon thread pool.
///
/// Each row writes only its own chunk of the output, so no synchronization
/// is needed beyond rayon's join.
#[derive(Debug, Clone, Copy, Default)]
pub struct RayonBackend;

impl RowBackend for RayonBackend {
    fn for_each_row<T, F>(out: &mut [T], row_len: usize, f: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Sync + Send,
    {
        if row_len == 0 {
            return;
        }
        out.par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(r, chunk)| f(r, chunk));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SerialBackend;

    #[test]
    fn test_matches_serial() {
        let work = |r: usize, chunk: &mut [f64]| {
            for (i, v) in chunk.iter_mut().enumerate() {
                *v = (r * 10 + i) as f64;
            }
        };
        let mut serial = vec![0.0; 300];
        let mut parallel = vec![0.0; 300];
        SerialBackend::for_each_row(&mut serial, 3, work);
        RayonBackend::for_each_row(&mut parallel, 3, work);
        assert_eq!(serial, parallel);
    }
}
