//! Data-parallel map over index ranges.
//!
//! Every stage is a pure function of an element index writing into its own
//! output slot. The helpers here run those kernels on the rayon pool; the
//! parallel iterator returning is the end-of-stage barrier.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Scheduling knobs. Chunk granularity affects throughput only, never results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Minimum number of indices a worker takes at once
    pub min_chunk: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self { min_chunk: 64 }
    }
}

impl ParallelConfig {
    pub(crate) fn min_len(&self) -> usize {
        self.min_chunk.max(1)
    }
}

/// Overwrite `out[i] = kernel(i)` for every index.
pub fn fill_indexed<T, F>(out: &mut [T], config: &ParallelConfig, kernel: F)
where
    T: Send,
    F: Fn(usize) -> T + Sync,
{
    out.par_iter_mut()
        .enumerate()
        .with_min_len(config.min_len())
        .for_each(|(i, slot)| *slot = kernel(i));
}

/// Like [`fill_indexed`] but each index owns a fixed-width chunk of `out`
/// plus one scalar slot in `per_index`.
pub fn fill_chunked<T, U, F>(
    out: &mut [T],
    chunk: usize,
    per_index: &mut [U],
    config: &ParallelConfig,
    kernel: F,
) where
    T: Send,
    U: Send,
    F: Fn(usize, &mut [T]) -> U + Sync,
{
    debug_assert_eq!(out.len(), chunk * per_index.len());
    out.par_chunks_mut(chunk.max(1))
        .zip(per_index.par_iter_mut())
        .enumerate()
        .with_min_len(config.min_len())
        .for_each(|(i, (slots, value))| *value = kernel(i, slots));
}

/// Resize `buf` to `len` only if its length differs. Returns whether it was reallocated.
pub fn resize_if_changed<T: Clone + Default>(buf: &mut Vec<T>, len: usize) -> bool {
    if buf.len() == len {
        return false;
    }
    *buf = vec![T::default(); len];
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_indexed_matches_sequential() {
        let mut out = vec![0usize; 1000];
        fill_indexed(&mut out, &ParallelConfig { min_chunk: 7 }, |i| i * i);
        assert!(out.iter().enumerate().all(|(i, &v)| v == i * i));
    }

    #[test]
    fn test_fill_chunked_gives_each_index_its_chunk() {
        let mut points = vec![0u32; 30];
        let mut counts = vec![0usize; 10];
        fill_chunked(&mut points, 3, &mut counts, &ParallelConfig::default(), |i, slots| {
            slots[0] = i as u32;
            i % 3
        });
        assert_eq!(points[9], 3);
        assert_eq!(counts[4], 1);
    }

    #[test]
    fn test_zero_chunk_is_clamped() {
        let mut out = vec![1u8; 5];
        fill_indexed(&mut out, &ParallelConfig { min_chunk: 0 }, |_| 2);
        assert_eq!(out, vec![2; 5]);
    }

    #[test]
    fn test_resize_if_changed() {
        let mut buf = vec![1.0f32; 4];
        assert!(!resize_if_changed(&mut buf, 4));
        assert_eq!(buf[0], 1.0);
        assert!(resize_if_changed(&mut buf, 6));
        assert_eq!(buf, vec![0.0; 6]);
    }
}
