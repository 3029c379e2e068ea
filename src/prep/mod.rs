//! Deterministic preprocessing shared by both solvers.
//!
//! The pipeline runs in fixed order: local contrast normalization (CLAHE),
//! edge sharpening with a 3x3 high-pass kernel, then a mild Gaussian blur to
//! suppress the high-frequency noise the sharpening step introduces. Grayscale
//! reduction happens at decode time. No step introduces randomness.

use imageproc::filter::{filter3x3, gaussian_blur_f32};

use crate::image::Raster;
use crate::util::PuzzleMatchResult;

mod clahe;

/// Center weight 9, eight neighbors -1.
const SHARPEN_KERNEL: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0];

/// Sigma that confines the Gaussian support to roughly a 3x3 window.
const BLUR_SIGMA: f32 = 0.8;

/// Preprocessing configuration.
#[derive(Clone, Debug)]
pub struct PrepConfig {
    /// CLAHE tile grid, applied as `tiles` by `tiles`.
    pub tiles: usize,
    /// CLAHE clip limit as a multiple of the mean histogram bin.
    pub clip_limit: f32,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            tiles: 8,
            clip_limit: 2.0,
        }
    }
}

/// Runs the full pipeline, carrying the validity mask through unchanged.
pub fn preprocess(src: &Raster, cfg: &PrepConfig) -> PuzzleMatchResult<Raster> {
    let equalized = clahe::clahe(src, cfg.tiles, cfg.tiles, cfg.clip_limit)?;

    let gray = equalized.to_gray_image();
    let sharpened = filter3x3::<_, f32, u8>(&gray, &SHARPEN_KERNEL);
    let blurred = gaussian_blur_f32(&sharpened, BLUR_SIGMA);

    Raster::from_gray_image(&blurred, src.mask().map(<[u8]>::to_vec))
}
