//! Cartesian-to-polar resampling.
//!
//! Resampling about the image center turns rotation into horizontal
//! translation: column `c` of the strip holds the ray at angle
//! `c / width * 360` degrees, row `r` the radius `(r + 0.5) / height * max_r`.
//! Sub-degree angular precision comes from raising `width`, which is
//! asymptotically cheaper than rotating and re-comparing full 2-D images per
//! candidate angle.

use crate::image::Raster;
use crate::util::{PuzzleMatchError, PuzzleMatchResult};

/// Polar-resampled image strip with a per-pixel validity mask.
pub(crate) struct PolarStrip {
    /// Angular samples (columns).
    pub width: usize,
    /// Radial samples (rows).
    pub height: usize,
    /// Row-major samples, angle along the row.
    pub data: Vec<f32>,
    /// Non-zero where the source pixel was in bounds and valid.
    pub mask: Vec<u8>,
    /// Source-space radius covered by the outermost row, in pixels.
    pub max_radius: f32,
}

impl PolarStrip {
    /// Source-space radius sampled by row `r`.
    pub fn radius_at(&self, r: usize) -> f32 {
        (r as f32 + 0.5) * self.max_radius / self.height as f32
    }
}

/// Resamples `src` into a polar strip about its own center.
///
/// The radial extent is the inscribed disc (`min(width, height) / 2`); corner
/// regions beyond it are never sampled. Bilinear interpolation is used for
/// intensities, and a sample is valid only when all four source taps are
/// inside the image and none is masked out.
pub(crate) fn polar_resample(
    src: &Raster,
    width: usize,
    height: usize,
) -> PuzzleMatchResult<PolarStrip> {
    if width == 0 || height == 0 {
        return Err(PuzzleMatchError::InvalidConfig {
            reason: "polar strip dimensions must be positive",
        });
    }

    let cx = (src.width() as f32 - 1.0) * 0.5;
    let cy = (src.height() as f32 - 1.0) * 0.5;
    let max_radius = (src.width().min(src.height()) as f32) * 0.5;

    let mut data = vec![0.0f32; width * height];
    let mut mask = vec![0u8; width * height];
    let angle_step = std::f32::consts::TAU / width as f32;

    for r in 0..height {
        let radius = (r as f32 + 0.5) * max_radius / height as f32;
        for c in 0..width {
            let angle = c as f32 * angle_step;
            let (sin_a, cos_a) = angle.sin_cos();
            let sx = cx + radius * cos_a;
            let sy = cy + radius * sin_a;

            let x0 = sx.floor();
            let y0 = sy.floor();
            if x0 < 0.0
                || y0 < 0.0
                || x0 + 1.0 > (src.width() - 1) as f32
                || y0 + 1.0 > (src.height() - 1) as f32
            {
                continue;
            }
            let xi = x0 as usize;
            let yi = y0 as usize;
            if !(src.is_valid(xi, yi)
                && src.is_valid(xi + 1, yi)
                && src.is_valid(xi, yi + 1)
                && src.is_valid(xi + 1, yi + 1))
            {
                continue;
            }

            let fx = sx - x0;
            let fy = sy - y0;
            let row0 = src.row(yi).expect("row in bounds");
            let row1 = src.row(yi + 1).expect("row in bounds");
            let a = row0[xi] as f32;
            let b = row0[xi + 1] as f32;
            let c2 = row1[xi] as f32;
            let d = row1[xi + 1] as f32;
            let value = a * (1.0 - fx) * (1.0 - fy)
                + b * fx * (1.0 - fy)
                + c2 * (1.0 - fx) * fy
                + d * fx * fy;

            let idx = r * width + c;
            data[idx] = value;
            mask[idx] = 1;
        }
    }

    Ok(PolarStrip {
        width,
        height,
        data,
        mask,
        max_radius,
    })
}
