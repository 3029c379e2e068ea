//! Contrast-limited adaptive histogram equalization.
//!
//! A fixed tile grid is equalized independently with a clipped histogram, and
//! per-pixel output is bilinearly interpolated between the four surrounding
//! tile mappings. The clip limit bounds how much any single intensity may
//! dominate a tile, which keeps flat regions from exploding into noise.

use crate::image::Raster;
use crate::util::{PuzzleMatchError, PuzzleMatchResult};

const BINS: usize = 256;

/// Applies CLAHE over a `tiles_x` by `tiles_y` grid with the given clip limit.
///
/// The clip limit is expressed as a multiple of the mean bin height, matching
/// the common convention (limit 2.0 over an 8x8 grid as the reference setup).
pub(crate) fn clahe(
    src: &Raster,
    tiles_x: usize,
    tiles_y: usize,
    clip_limit: f32,
) -> PuzzleMatchResult<Raster> {
    if tiles_x == 0 || tiles_y == 0 {
        return Err(PuzzleMatchError::InvalidConfig {
            reason: "clahe tile grid must be at least 1x1",
        });
    }
    if !(clip_limit.is_finite() && clip_limit > 0.0) {
        return Err(PuzzleMatchError::InvalidConfig {
            reason: "clahe clip limit must be positive",
        });
    }

    let width = src.width();
    let height = src.height();
    let tiles_x = tiles_x.min(width);
    let tiles_y = tiles_y.min(height);
    let tile_w = width.div_ceil(tiles_x);
    let tile_h = height.div_ceil(tiles_y);

    // One 256-entry mapping per tile.
    let mut luts = vec![0u8; tiles_x * tiles_y * BINS];
    for ty in 0..tiles_y {
        let y0 = ty * tile_h;
        let y1 = (y0 + tile_h).min(height);
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let x1 = (x0 + tile_w).min(width);
            let lut = &mut luts[(ty * tiles_x + tx) * BINS..(ty * tiles_x + tx + 1) * BINS];
            build_tile_lut(src, x0, x1, y0, y1, clip_limit, lut);
        }
    }

    let mut out = vec![0u8; width * height];
    for y in 0..height {
        let row = src.row(y).expect("row within bounds");
        // Tile-center coordinates of this row in grid space.
        let gy = (y as f32 + 0.5) / tile_h as f32 - 0.5;
        let ty0 = gy.floor().max(0.0) as usize;
        let ty1 = (ty0 + 1).min(tiles_y - 1);
        let fy = (gy - ty0 as f32).clamp(0.0, 1.0);

        for x in 0..width {
            let gx = (x as f32 + 0.5) / tile_w as f32 - 0.5;
            let tx0 = gx.floor().max(0.0) as usize;
            let tx1 = (tx0 + 1).min(tiles_x - 1);
            let fx = (gx - tx0 as f32).clamp(0.0, 1.0);

            let v = row[x] as usize;
            let v00 = luts[(ty0 * tiles_x + tx0) * BINS + v] as f32;
            let v10 = luts[(ty0 * tiles_x + tx1) * BINS + v] as f32;
            let v01 = luts[(ty1 * tiles_x + tx0) * BINS + v] as f32;
            let v11 = luts[(ty1 * tiles_x + tx1) * BINS + v] as f32;

            let top = v00 * (1.0 - fx) + v10 * fx;
            let bottom = v01 * (1.0 - fx) + v11 * fx;
            let value = top * (1.0 - fy) + bottom * fy;
            out[y * width + x] = value.round().clamp(0.0, 255.0) as u8;
        }
    }

    match src.mask() {
        Some(mask) => Raster::with_mask(out, mask.to_vec(), width, height),
        None => Raster::new(out, width, height),
    }
}

/// Builds the clipped-equalization mapping for one tile.
fn build_tile_lut(src: &Raster, x0: usize, x1: usize, y0: usize, y1: usize, clip_limit: f32, lut: &mut [u8]) {
    let mut hist = [0u32; BINS];
    for y in y0..y1 {
        let row = src.row(y).expect("tile row within bounds");
        for &value in &row[x0..x1] {
            hist[value as usize] += 1;
        }
    }

    let count = ((x1 - x0) * (y1 - y0)) as u32;
    if count == 0 {
        for (i, entry) in lut.iter_mut().enumerate() {
            *entry = i as u8;
        }
        return;
    }

    // Clip and redistribute the excess uniformly.
    let clip = ((clip_limit * count as f32 / BINS as f32).round() as u32).max(1);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }
    let bonus = excess / BINS as u32;
    let mut remainder = (excess % BINS as u32) as usize;
    for bin in hist.iter_mut() {
        *bin += bonus;
        if remainder > 0 {
            *bin += 1;
            remainder -= 1;
        }
    }

    let mut cdf = 0u32;
    for (i, &bin) in hist.iter().enumerate() {
        cdf += bin;
        lut[i] = ((cdf as f32 / count as f32) * 255.0).round().clamp(0.0, 255.0) as u8;
    }
}
