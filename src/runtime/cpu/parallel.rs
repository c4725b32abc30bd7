//! Fork-join helpers shared by the CPU kernels
//!
//! Each helper has a rayon path and a sequential fallback producing
//! identical results, selected by the `rayon` feature.

use super::CpuClient;
use crate::error::Result;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Evaluate `f(i)` for `i in 0..n`, collecting results in index order
pub(crate) fn map_range<T, F>(client: &CpuClient, n: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    #[cfg(feature = "rayon")]
    {
        let min_len = client.rayon_min_len();
        client.install_parallelism(|| {
            (0..n)
                .into_par_iter()
                .with_min_len(min_len)
                .map(&f)
                .collect()
        })
    }
    #[cfg(not(feature = "rayon"))]
    {
        let _ = client;
        (0..n).map(f).collect()
    }
}

/// Fallible [`map_range`]; the first error (in some order) is returned
pub(crate) fn try_map_range<T, F>(client: &CpuClient, n: usize, f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> Result<T> + Sync + Send,
{
    #[cfg(feature = "rayon")]
    {
        let min_len = client.rayon_min_len();
        client.install_parallelism(|| {
            (0..n)
                .into_par_iter()
                .with_min_len(min_len)
                .map(&f)
                .collect()
        })
    }
    #[cfg(not(feature = "rayon"))]
    {
        let _ = client;
        (0..n).map(f).collect()
    }
}

/// Run `f(row, slice)` over consecutive `width`-sized rows of `out`
///
/// A zero width visits nothing.
pub(crate) fn for_each_row_mut<T, F>(client: &CpuClient, out: &mut [T], width: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync + Send,
{
    chunks_mut(client, out, width, client.rayon_min_len(), f);
}

/// Run `f(grain, slice)` over consecutive `grain`-sized chunks of `out`,
/// each chunk its own rayon task
///
/// The grain already sizes the unit of work, so the client's minimum task
/// length is not applied on top of it.
pub(crate) fn for_each_grain_mut<T, F>(client: &CpuClient, out: &mut [T], grain: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync + Send,
{
    chunks_mut(client, out, grain, 1, f);
}

fn chunks_mut<T, F>(client: &CpuClient, out: &mut [T], width: usize, min_len: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync + Send,
{
    if width == 0 {
        return;
    }
    #[cfg(feature = "rayon")]
    {
        client.install_parallelism(|| {
            out.par_chunks_mut(width)
                .with_min_len(min_len)
                .enumerate()
                .for_each(|(row, slice)| f(row, slice));
        });
    }
    #[cfg(not(feature = "rayon"))]
    {
        let _ = (client, min_len);
        out.chunks_mut(width)
            .enumerate()
            .for_each(|(row, slice)| f(row, slice));
    }
}

/// Two output buffers sharing one row layout, visited row by row
pub(crate) fn for_each_row_mut2<T, U, F>(
    client: &CpuClient,
    a: &mut [T],
    b: &mut [U],
    width: usize,
    f: F,
) where
    T: Send,
    U: Send,
    F: Fn(usize, &mut [T], &mut [U]) + Sync + Send,
{
    if width == 0 {
        return;
    }
    debug_assert_eq!(a.len(), b.len());
    #[cfg(feature = "rayon")]
    {
        let min_len = client.rayon_min_len();
        client.install_parallelism(|| {
            a.par_chunks_mut(width)
                .zip(b.par_chunks_mut(width))
                .with_min_len(min_len)
                .enumerate()
                .for_each(|(row, (sa, sb))| f(row, sa, sb));
        });
    }
    #[cfg(not(feature = "rayon"))]
    {
        let _ = client;
        a.chunks_mut(width)
            .zip(b.chunks_mut(width))
            .enumerate()
            .for_each(|(row, (sa, sb))| f(row, sa, sb));
    }
}

/// Run `f(segment, slice)` over the disjoint segments `out[offsets[i]..offsets[i+1]]`
///
/// `offsets` must be non-decreasing with `offsets.last() == out.len()`.
pub(crate) fn try_for_each_segment_mut<T, F>(
    client: &CpuClient,
    out: &mut [T],
    offsets: &[usize],
    f: F,
) -> Result<()>
where
    T: Send,
    F: Fn(usize, &mut [T]) -> Result<()> + Sync + Send,
{
    let segments = split_segments(out, offsets);
    #[cfg(feature = "rayon")]
    {
        let min_len = client.rayon_min_len();
        client.install_parallelism(|| {
            segments
                .into_par_iter()
                .with_min_len(min_len)
                .enumerate()
                .try_for_each(|(i, slice)| f(i, slice))
        })
    }
    #[cfg(not(feature = "rayon"))]
    {
        let _ = client;
        segments
            .into_iter()
            .enumerate()
            .try_for_each(|(i, slice)| f(i, slice))
    }
}

fn split_segments<'a, T>(mut out: &'a mut [T], offsets: &[usize]) -> Vec<&'a mut [T]> {
    let mut segments = Vec::with_capacity(offsets.len().saturating_sub(1));
    for w in offsets.windows(2) {
        let (head, tail) = std::mem::take(&mut out).split_at_mut(w[1] - w[0]);
        segments.push(head);
        out = tail;
    }
    segments
}

/// Exclusive prefix sum; the returned vector has `counts.len() + 1` entries
pub(crate) fn exclusive_scan(counts: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(counts.len() + 1);
    let mut acc = 0usize;
    offsets.push(0);
    for &c in counts {
        acc += c;
        offsets.push(acc);
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusive_scan() {
        assert_eq!(exclusive_scan(&[2, 0, 3]), vec![0, 2, 2, 5]);
        assert_eq!(exclusive_scan(&[]), vec![0]);
    }

    #[test]
    fn test_segments_are_disjoint_and_ordered() {
        let client = CpuClient::new();
        let mut out = vec![0usize; 5];
        try_for_each_segment_mut(&client, &mut out, &[0, 2, 2, 5], |seg, slice| {
            slice.iter_mut().for_each(|v| *v = seg + 1);
            Ok(())
        })
        .unwrap();
        assert_eq!(out, vec![1, 1, 3, 3, 3]);
    }

    #[test]
    fn test_map_range_keeps_order() {
        let client = CpuClient::new();
        let squares = map_range(&client, 300, |i| i * i);
        assert_eq!(squares[17], 289);
        assert_eq!(squares.len(), 300);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_grains_spread_over_workers() {
        use crate::runtime::cpu::ClientConfig;
        use std::collections::HashSet;
        use std::sync::Mutex;
        use std::time::Duration;

        let client = CpuClient::with_config(ClientConfig::default().with_num_threads(4)).unwrap();
        let workers = Mutex::new(HashSet::new());
        let mut out = vec![false; 16 * 1024];
        for_each_grain_mut(&client, &mut out, 1024, |_, slice| {
            workers.lock().unwrap().insert(rayon::current_thread_index());
            std::thread::sleep(Duration::from_millis(5));
            slice.iter_mut().for_each(|v| *v = true);
        });
        assert!(out.iter().all(|&v| v));
        assert!(
            workers.into_inner().unwrap().len() > 1,
            "16 grains should not all run on one worker"
        );
    }

    #[test]
    fn test_grains_cover_ragged_tail() {
        let client = CpuClient::new();
        let mut out = vec![0usize; 10];
        for_each_grain_mut(&client, &mut out, 4, |grain, slice| {
            slice.iter_mut().for_each(|v| *v = grain);
        });
        assert_eq!(out, vec![0, 0, 0, 0, 1, 1, 1, 1, 2, 2]);
    }

    #[test]
    fn test_rows_zero_width_is_noop() {
        let client = CpuClient::new();
        let mut out: Vec<f32> = Vec::new();
        for_each_row_mut(&client, &mut out, 0, |_, _| panic!("no rows expected"));
    }
}
