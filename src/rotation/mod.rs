//! Rotation angle search for split-ring puzzles.
//!
//! Both images are resampled into polar strips about their own centers, so the
//! unknown rotation becomes a horizontal shift. Two techniques produce
//! candidates: masked correlation of the raw strips (robust to transparent
//! padding) and coefficient-normalized correlation of gradient-filtered strips
//! (robust when absolute intensity is unreliable but edge structure is not).
//! The outer strip is duplicated end-to-end so matching wraps across the
//! 0/360 seam; selection between the two happens upstream through normalized
//! confidence with ties favoring the polar disc technique.

use tracing::debug;

use crate::candidate::{CandidateParam, MatchCandidate, MatchMethod};
use crate::image::Raster;
use crate::polar::{polar_resample, PolarStrip};
use crate::util::math::{parabolic_peak_offset, wrap_deg_360};
use crate::util::{PuzzleMatchError, PuzzleMatchResult};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Rotation solver configuration.
#[derive(Clone, Debug)]
pub struct RotationConfig {
    /// Angular samples per strip; 720 gives half-degree resolution before the
    /// quadratic peak fit.
    pub polar_width: usize,
    /// Radial samples per strip.
    pub polar_height: usize,
    /// Radius around the polar pole excluded from matching, in source pixels.
    /// The pole oversamples a handful of pixels and contributes noise.
    pub dead_zone_px: f32,
    /// Intensities at or below this are treated as transparent padding.
    pub near_zero: u8,
    /// Minimum number of jointly valid samples for a shift to be scored.
    pub min_overlap: usize,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            polar_width: 720,
            polar_height: 64,
            dead_zone_px: 15.0,
            near_zero: 8,
            min_overlap: 128,
        }
    }
}

/// Runs both rotation techniques and returns their candidates.
///
/// The returned angle is the amount, in degrees in [0, 360), by which the
/// inner disc's artwork leads the outer ring's in the direction of increasing
/// polar angle. Counter-rotating the rings by half that amount each realigns
/// the artwork; 0 and 360 are the same result.
pub(crate) fn solve_rotation(
    inner: &Raster,
    outer: &Raster,
    cfg: &RotationConfig,
) -> PuzzleMatchResult<Vec<MatchCandidate>> {
    if cfg.polar_width < 4 {
        return Err(PuzzleMatchError::InvalidConfig {
            reason: "polar width must be at least 4",
        });
    }

    let mut inner_strip = polar_resample(inner, cfg.polar_width, cfg.polar_height)?;
    let mut outer_strip = polar_resample(outer, cfg.polar_width, cfg.polar_height)?;

    // The rows nearest the pole oversample a handful of source pixels and
    // would otherwise dominate the overlap with noise.
    mask_dead_zone(&mut inner_strip, cfg.dead_zone_px);
    mask_dead_zone(&mut outer_strip, cfg.dead_zone_px);

    let mut candidates = Vec::with_capacity(2);

    match masked_strip_match(&inner_strip, &outer_strip, cfg.min_overlap) {
        Some((angle_deg, score)) => {
            debug!(angle_deg, score, "polar disc candidate");
            candidates.push(MatchCandidate {
                param: CandidateParam::Angle(angle_deg),
                raw_score: score,
                method: MatchMethod::PolarDisc,
            });
        }
        None => debug!("polar disc technique produced no valid overlap"),
    }

    match gradient_strip_match(&inner_strip, &outer_strip) {
        Some((angle_deg, score)) => {
            debug!(angle_deg, score, "gradient candidate");
            candidates.push(MatchCandidate {
                param: CandidateParam::Angle(angle_deg),
                raw_score: score,
                method: MatchMethod::Gradient,
            });
        }
        None => debug!("gradient technique produced no usable signal"),
    }

    if candidates.is_empty() {
        return Err(PuzzleMatchError::NoMatch {
            reason: "neither rotation technique produced a candidate",
        });
    }
    Ok(candidates)
}

/// Masks strip rows whose source radius falls inside the dead zone.
fn mask_dead_zone(strip: &mut PolarStrip, dead_zone_px: f32) {
    for r in 0..strip.height {
        if strip.radius_at(r) >= dead_zone_px {
            break;
        }
        let row = &mut strip.mask[r * strip.width..(r + 1) * strip.width];
        row.fill(0);
    }
}

/// Technique (a): masked Pearson correlation of the raw strips per shift.
fn masked_strip_match(
    inner: &PolarStrip,
    outer: &PolarStrip,
    min_overlap: usize,
) -> Option<(f32, f32)> {
    let width = inner.width;
    let scores = score_shifts(width, |shift| {
        let mut n = 0usize;
        let mut sum_a = 0.0f32;
        let mut sum_b = 0.0f32;
        let mut sum_a2 = 0.0f32;
        let mut sum_b2 = 0.0f32;
        let mut sum_ab = 0.0f32;
        for r in 0..inner.height.min(outer.height) {
            let base = r * width;
            for c in 0..width {
                // Duplicated-strip indexing: wrap instead of materializing 2W.
                let oc = base + (c + shift) % width;
                if inner.mask[base + c] == 0 || outer.mask[oc] == 0 {
                    continue;
                }
                let a = inner.data[base + c];
                let b = outer.data[oc];
                n += 1;
                sum_a += a;
                sum_b += b;
                sum_a2 += a * a;
                sum_b2 += b * b;
                sum_ab += a * b;
            }
        }
        if n < min_overlap {
            return f32::NEG_INFINITY;
        }
        pearson(n as f32, sum_a, sum_b, sum_a2, sum_b2, sum_ab)
    });

    best_shift_to_angle(&scores, width)
}

/// Technique (b): coefficient-normalized correlation of gradient strips.
fn gradient_strip_match(inner: &PolarStrip, outer: &PolarStrip) -> Option<(f32, f32)> {
    let width = inner.width;
    let height = inner.height.min(outer.height);
    let ga = normalized_gradient(inner, height);
    let gb = normalized_gradient(outer, height);

    let scores = score_shifts(width, |shift| {
        let mut n = 0.0f32;
        let mut sum_a = 0.0f32;
        let mut sum_b = 0.0f32;
        let mut sum_a2 = 0.0f32;
        let mut sum_b2 = 0.0f32;
        let mut sum_ab = 0.0f32;
        for r in 0..height {
            let base = r * width;
            for c in 0..width {
                let a = ga[base + c];
                let b = gb[base + (c + shift) % width];
                n += 1.0;
                sum_a += a;
                sum_b += b;
                sum_a2 += a * a;
                sum_b2 += b * b;
                sum_ab += a * b;
            }
        }
        pearson(n, sum_a, sum_b, sum_a2, sum_b2, sum_ab)
    });

    best_shift_to_angle(&scores, width)
}

/// Wrap-aware horizontal (angular) gradient, min-max normalized per strip.
fn normalized_gradient(strip: &PolarStrip, height: usize) -> Vec<f32> {
    let width = strip.width;
    let mut grad = vec![0.0f32; width * height];
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for r in 0..height {
        let base = r * width;
        for c in 0..width {
            let prev = strip.data[base + (c + width - 1) % width];
            let next = strip.data[base + (c + 1) % width];
            let g = 0.5 * (next - prev);
            grad[base + c] = g;
            min = min.min(g);
            max = max.max(g);
        }
    }
    let range = max - min;
    if range > f32::EPSILON {
        for g in &mut grad {
            *g = (*g - min) / range;
        }
    }
    grad
}

/// Evaluates `score_fn` for every circular shift.
fn score_shifts(width: usize, score_fn: impl Fn(usize) -> f32 + Send + Sync) -> Vec<f32> {
    #[cfg(feature = "rayon")]
    {
        (0..width).into_par_iter().map(score_fn).collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        (0..width).map(score_fn).collect()
    }
}

/// Pearson correlation from accumulated sums; `NEG_INFINITY` when degenerate.
fn pearson(n: f32, sum_a: f32, sum_b: f32, sum_a2: f32, sum_b2: f32, sum_ab: f32) -> f32 {
    let var_a = sum_a2 - sum_a * sum_a / n;
    let var_b = sum_b2 - sum_b * sum_b / n;
    if var_a <= 1e-6 || var_b <= 1e-6 {
        return f32::NEG_INFINITY;
    }
    let cov = sum_ab - sum_a * sum_b / n;
    let score = cov / (var_a * var_b).sqrt();
    if score.is_finite() {
        score
    } else {
        f32::NEG_INFINITY
    }
}

/// Picks the best shift, refines it sub-sample, and converts to degrees.
fn best_shift_to_angle(scores: &[f32], width: usize) -> Option<(f32, f32)> {
    let (best_idx, &best_score) = scores
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))?;
    if best_score == f32::NEG_INFINITY {
        return None;
    }

    let prev = scores[(best_idx + width - 1) % width];
    let next = scores[(best_idx + 1) % width];
    let offset = parabolic_peak_offset(prev, best_score, next).unwrap_or(0.0);
    let shift = best_idx as f32 + offset;
    let angle_deg = wrap_deg_360(shift * 360.0 / width as f32);
    Some((angle_deg, best_score))
}
