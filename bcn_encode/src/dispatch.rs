use std::panic::{self, AssertUnwindSafe};

use rayon::{prelude::*, ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use tracing::{trace, warn};

use crate::{div_round_up, error::SurfaceError};

/// Encode `output` in bands of `rows_per_band` rows of `row_bytes` bytes each.
///
/// `encode_row` is called once for every row with the row index and its output bytes.
/// Bands are written by exactly one worker, so the output doesn't depend on `workers`.
pub fn encode_bands<F>(
    output: &mut [u8],
    row_bytes: usize,
    rows_per_band: usize,
    workers: usize,
    encode_row: F,
) -> Result<(), SurfaceError>
where
    F: Fn(usize, &mut [u8]) + Sync,
{
    encode_bands_with(
        output,
        row_bytes,
        rows_per_band,
        workers,
        |workers| {
            ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("bcn-worker-{i}"))
                .build()
        },
        encode_row,
    )
}

fn encode_bands_with<F, P>(
    output: &mut [u8],
    row_bytes: usize,
    rows_per_band: usize,
    workers: usize,
    build_pool: P,
    encode_row: F,
) -> Result<(), SurfaceError>
where
    F: Fn(usize, &mut [u8]) + Sync,
    P: FnOnce(usize) -> Result<ThreadPool, ThreadPoolBuildError>,
{
    if output.is_empty() || row_bytes == 0 {
        return Ok(());
    }

    let band_bytes = row_bytes * rows_per_band.max(1);
    let band_count = div_round_up(output.len(), band_bytes);
    let workers = workers.clamp(1, band_count);

    let encode_band = |band: usize, bytes: &mut [u8]| {
        trace!(band, "encoding band");
        let first_row = band * band_bytes / row_bytes;
        for (i, row) in bytes.chunks_mut(row_bytes).enumerate() {
            encode_row(first_row + i, row);
        }
    };

    if workers == 1 {
        for (band, bytes) in output.chunks_mut(band_bytes).enumerate() {
            encode_band(band, bytes);
        }
        return Ok(());
    }

    // Threads that did start are shut down before the build error is returned.
    let pool = build_pool(workers).map_err(|e| {
        warn!(workers, "failed to start worker pool: {e}");
        SurfaceError::WorkerSpawn(e)
    })?;

    // Every band is joined before install returns, even if one of them panics.
    panic::catch_unwind(AssertUnwindSafe(|| {
        pool.install(|| {
            output
                .par_chunks_mut(band_bytes)
                .enumerate()
                .with_max_len(1)
                .for_each(|(band, bytes)| encode_band(band, bytes));
        })
    }))
    .map_err(|_| SurfaceError::WorkerPanicked)
}
