//! Tile-parallel dispatch over image regions.

use rayon::prelude::*;
use xform_core::Roi;

use crate::imagebuf::TileIterator;

/// Rows per band. Wide enough to amortize per-tile setup (tap tables,
/// scratch buffers), small enough to load-balance across cores.
const BAND_ROWS: i32 = 64;

/// Partitions `roi` into disjoint scanline bands that cover it exactly and
/// runs `kernel` once per band, blocking until all bands complete.
///
/// - `nthreads == 0`: run on the global rayon pool
/// - `nthreads == 1`: run serially, in band order (the correctness baseline;
///   parallel runs produce bit-identical pixels because bands share no state)
/// - `nthreads > 1`: run on a dedicated pool of that many threads
///
/// Kernels see each band as a region with the same x, z, and channel ranges
/// as `roi` and are expected to fill every pixel of the band.
pub fn parallel_image<F>(roi: Roi, nthreads: usize, kernel: F)
where
    F: Fn(Roi) + Sync,
{
    let tiles: Vec<Roi> = TileIterator::new(roi, BAND_ROWS).collect();
    match nthreads {
        1 => {
            for tile in tiles {
                kernel(tile);
            }
        }
        0 => tiles.par_iter().for_each(|tile| kernel(*tile)),
        n => match rayon::ThreadPoolBuilder::new().num_threads(n).build() {
            Ok(pool) => pool.install(|| tiles.par_iter().for_each(|tile| kernel(*tile))),
            Err(_) => tiles.par_iter().for_each(|tile| kernel(*tile)),
        },
    }
}
