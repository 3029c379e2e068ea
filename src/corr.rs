//! Zero-normalized cross-correlation template scanning.
//!
//! A `ZnccPlan` precomputes the zero-mean template buffer and its variance
//! once; the dense scan then only accumulates window statistics per placement.
//! When the template carries a validity mask, all statistics are restricted to
//! masked pixels (masked ZNCC); otherwise the full window contributes
//! (coefficient-normalized correlation).

use crate::image::Raster;
use crate::util::{PuzzleMatchError, PuzzleMatchResult};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Variance below this makes a window statistically meaningless.
pub(crate) const MIN_WINDOW_VAR: f32 = 1e-6;

/// Best placement found by a scan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    pub x: usize,
    pub y: usize,
    pub score: f32,
}

/// Precomputed template statistics for (masked) ZNCC.
pub struct ZnccPlan {
    width: usize,
    height: usize,
    /// Zero-mean template values; exactly 0.0 at masked-out positions.
    t_prime: Vec<f32>,
    /// Sum of squared zero-mean values over valid pixels.
    var_t: f32,
    /// Validity weights, `None` when every pixel participates.
    mask: Option<Vec<u8>>,
    /// Number of valid pixels.
    sum_w: f32,
}

impl ZnccPlan {
    /// Builds a plan from a template raster, honoring its mask if present.
    pub fn new(tpl: &Raster) -> PuzzleMatchResult<Self> {
        let width = tpl.width();
        let height = tpl.height();
        let mask = tpl.mask().map(<[u8]>::to_vec);

        let mut sum = 0.0f64;
        let mut count = 0usize;
        for (idx, &value) in tpl.data().iter().enumerate() {
            if mask.as_ref().is_some_and(|m| m[idx] == 0) {
                continue;
            }
            sum += value as f64;
            count += 1;
        }
        if count < 2 {
            return Err(PuzzleMatchError::DegenerateTemplate {
                reason: "fewer than two valid template pixels",
            });
        }

        let mean = (sum / count as f64) as f32;
        let mut t_prime = vec![0.0f32; width * height];
        let mut var_t = 0.0f32;
        for (idx, &value) in tpl.data().iter().enumerate() {
            if mask.as_ref().is_some_and(|m| m[idx] == 0) {
                continue;
            }
            let centered = value as f32 - mean;
            t_prime[idx] = centered;
            var_t += centered * centered;
        }
        if var_t <= MIN_WINDOW_VAR {
            return Err(PuzzleMatchError::DegenerateTemplate {
                reason: "zero template variance",
            });
        }

        Ok(Self {
            width,
            height,
            t_prime,
            var_t,
            mask,
            sum_w: count as f32,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// ZNCC score of the template placed at `(x, y)`, or `NEG_INFINITY` for
    /// out-of-bounds placements and flat windows.
    pub fn score_at(&self, image: &Raster, x: usize, y: usize) -> f32 {
        if x + self.width > image.width() || y + self.height > image.height() {
            return f32::NEG_INFINITY;
        }

        let mut dot = 0.0f32;
        let mut sum_i = 0.0f32;
        let mut sum_i2 = 0.0f32;
        for ty in 0..self.height {
            let img_row = image.row(y + ty).expect("row within bounds for score");
            let base = ty * self.width;
            match &self.mask {
                Some(mask) => {
                    for tx in 0..self.width {
                        let idx = base + tx;
                        if mask[idx] == 0 {
                            continue;
                        }
                        let value = img_row[x + tx] as f32;
                        dot += self.t_prime[idx] * value;
                        sum_i += value;
                        sum_i2 += value * value;
                    }
                }
                None => {
                    for tx in 0..self.width {
                        let value = img_row[x + tx] as f32;
                        dot += self.t_prime[base + tx] * value;
                        sum_i += value;
                        sum_i2 += value * value;
                    }
                }
            }
        }

        let var_i = sum_i2 - (sum_i * sum_i) / self.sum_w;
        if var_i <= MIN_WINDOW_VAR {
            return f32::NEG_INFINITY;
        }
        let score = dot / (self.var_t * var_i).sqrt();
        if score.is_finite() {
            score
        } else {
            f32::NEG_INFINITY
        }
    }
}

/// Scans placements with `x` in `[x0, x1]` and the full `y` range, returning
/// the best peak. Ties break toward the smaller `y`, then smaller `x`.
pub(crate) fn scan_best(
    image: &Raster,
    plan: &ZnccPlan,
    x0: usize,
    x1: usize,
) -> PuzzleMatchResult<Option<Peak>> {
    let img_width = image.width();
    let img_height = image.height();
    if img_width < plan.width() || img_height < plan.height() {
        return Err(PuzzleMatchError::PieceTooLarge {
            piece_width: plan.width(),
            piece_height: plan.height(),
            bg_width: img_width,
            bg_height: img_height,
        });
    }

    let max_x = img_width - plan.width();
    let max_y = img_height - plan.height();
    if x0 > max_x {
        return Ok(None);
    }
    let x1 = x1.min(max_x);
    if x0 > x1 {
        return Ok(None);
    }

    Ok(scan_rows(image, plan, x0, x1, max_y))
}

#[cfg(not(feature = "rayon"))]
fn scan_rows(image: &Raster, plan: &ZnccPlan, x0: usize, x1: usize, max_y: usize) -> Option<Peak> {
    let mut best: Option<Peak> = None;
    for y in 0..=max_y {
        merge_peak(&mut best, scan_row(image, plan, x0, x1, y));
    }
    best
}

#[cfg(feature = "rayon")]
fn scan_rows(image: &Raster, plan: &ZnccPlan, x0: usize, x1: usize, max_y: usize) -> Option<Peak> {
    (0..=max_y)
        .into_par_iter()
        .filter_map(|y| scan_row(image, plan, x0, x1, y))
        .reduce_with(|a, b| {
            let mut best = Some(a);
            merge_peak(&mut best, Some(b));
            best.expect("merge of two peaks is a peak")
        })
}

fn scan_row(image: &Raster, plan: &ZnccPlan, x0: usize, x1: usize, y: usize) -> Option<Peak> {
    let mut best: Option<Peak> = None;
    for x in x0..=x1 {
        let score = plan.score_at(image, x, y);
        if score == f32::NEG_INFINITY {
            continue;
        }
        merge_peak(&mut best, Some(Peak { x, y, score }));
    }
    best
}

/// Keeps the better of two peaks with a deterministic tie-break.
fn merge_peak(best: &mut Option<Peak>, other: Option<Peak>) {
    let Some(other) = other else { return };
    match best {
        None => *best = Some(other),
        Some(current) => {
            let replace = other.score > current.score
                || (other.score == current.score
                    && (other.y, other.x) < (current.y, current.x));
            if replace {
                *best = Some(other);
            }
        }
    }
}
