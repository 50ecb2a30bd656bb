//! Parallel processing utilities using Rayon.
//!
//! Work items are pulled from a lazy stream in fixed-size batches, each
//! batch is mapped across the thread pool, and the results are handed to a
//! sink in input order. Output is therefore identical to a sequential run.

use crate::error::Result;
use rayon::prelude::*;

/// Number of chunks handed to the thread pool at once.
///
/// Bounds memory to one batch of chunks plus their results.
pub const CHUNK_BATCH_SIZE: usize = 512;

/// Map `f` over `items` and feed each result to `sink`, in input order.
///
/// With `parallel` false every item is mapped on the calling thread. The
/// first error from the stream or from `sink` stops processing.
pub fn map_ordered<I, T, R, F, S>(items: I, parallel: bool, batch_size: usize, f: F, mut sink: S) -> Result<()>
where
    I: Iterator<Item = Result<T>>,
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync + Send,
    S: FnMut(R) -> Result<()>,
{
    if !parallel {
        for item in items {
            sink(f(item?))?;
        }
        return Ok(());
    }

    let batch_size = batch_size.max(1);
    let mut batch = Vec::with_capacity(batch_size);
    for item in items {
        batch.push(item?);
        if batch.len() == batch_size {
            flush_batch(&mut batch, &f, &mut sink)?;
        }
    }
    flush_batch(&mut batch, &f, &mut sink)
}

fn flush_batch<T, R, F, S>(batch: &mut Vec<T>, f: &F, sink: &mut S) -> Result<()>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync + Send,
    S: FnMut(R) -> Result<()>,
{
    if batch.is_empty() {
        return Ok(());
    }
    // `collect` on an indexed parallel iterator keeps input order
    let results: Vec<R> = std::mem::take(batch).into_par_iter().map(f).collect();
    for result in results {
        sink(result)?;
    }
    Ok(())
}
