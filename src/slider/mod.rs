//! Horizontal offset search for displaced-piece puzzles.
//!
//! Strategies run as a declared, ordered list, each contributing at most one
//! `MatchCandidate`: the direct (masked) ZNCC scan, a Canny edge-map scan at
//! three aggressiveness levels, and a multi-scale retry across rescaled piece
//! sizes. Border-adjacent placements are rejected up front because they are
//! statistically unreliable artifacts; final selection happens upstream
//! through normalized confidence.

use image::imageops::{self, FilterType};
use imageproc::edges::canny;
use tracing::debug;

use crate::candidate::{CandidateParam, MatchCandidate, MatchMethod};
use crate::corr::{scan_best, Peak, ZnccPlan};
use crate::image::Raster;
use crate::util::{PuzzleMatchError, PuzzleMatchResult};

/// Slider solver configuration.
#[derive(Clone, Debug)]
pub struct SliderConfig {
    /// Canny threshold pairs, from permissive to aggressive.
    pub edge_thresholds: [(f32, f32); 3],
    /// Minimum edge-map score for the edge result to be considered at all.
    pub edge_floor: f32,
    /// Primary scores below this are weak enough for the edge result to
    /// replace them even without beating them.
    pub weak_primary: f32,
    /// Confidence below which the multi-scale retry is attempted.
    pub retry_floor: f32,
    /// Piece scale sweep bounds and step count for the retry.
    pub scale_min: f32,
    pub scale_max: f32,
    pub scale_steps: usize,
    /// Border rejection margin as a fraction of the search range, clamped to
    /// `[border_margin_min, border_margin_max]` pixels.
    pub border_margin_frac: f32,
    pub border_margin_min: usize,
    pub border_margin_max: usize,
}

impl Default for SliderConfig {
    fn default() -> Self {
        Self {
            edge_thresholds: [(50.0, 150.0), (100.0, 200.0), (150.0, 250.0)],
            edge_floor: 0.15,
            weak_primary: 0.3,
            retry_floor: 0.2,
            scale_min: 0.8,
            scale_max: 1.2,
            scale_steps: 15,
            border_margin_frac: 0.05,
            border_margin_min: 1,
            border_margin_max: 8,
        }
    }
}

impl SliderConfig {
    /// Border margin in pixels for a given horizontal search range.
    fn border_margin(&self, range: usize) -> usize {
        let margin = (range as f32 * self.border_margin_frac).round() as usize;
        margin.clamp(self.border_margin_min, self.border_margin_max)
    }
}

/// Runs all slider strategies and returns the surviving candidates.
pub(crate) fn solve_slider(
    background: &Raster,
    piece: &Raster,
    cfg: &SliderConfig,
) -> PuzzleMatchResult<Vec<MatchCandidate>> {
    let range = check_dimensions(background, piece)?;

    let margin = cfg.border_margin(range);
    if margin > range - margin {
        return Err(PuzzleMatchError::NoMatch {
            reason: "search range is narrower than the border rejection margin",
        });
    }
    let (x0, x1) = (margin, range - margin);

    let mut candidates = Vec::new();

    // Primary: dense (masked) ZNCC scan of the preprocessed images.
    let primary = match ZnccPlan::new(piece) {
        Ok(plan) => scan_best(background, &plan, x0, x1)?,
        Err(err) => {
            debug!(%err, "direct scan skipped");
            None
        }
    };
    if let Some(peak) = primary {
        debug!(x = peak.x, y = peak.y, score = peak.score, "direct candidate");
        candidates.push(peak_candidate(peak, MatchMethod::Direct));
    }
    let primary_score = primary.map_or(f32::NEG_INFINITY, |p| p.score);

    // Edge fallback: correlate Canny edge maps at three threshold levels.
    if let Some(peak) = best_edge_peak(background, piece, cfg, x0, x1) {
        let adopt =
            peak.score > cfg.edge_floor && (peak.score > primary_score || primary_score < cfg.weak_primary);
        if adopt {
            debug!(x = peak.x, score = peak.score, "edge candidate adopted");
            candidates.push(peak_candidate(peak, MatchMethod::Edges));
        } else {
            debug!(score = peak.score, "edge candidate below adoption rule");
        }
    }

    // Multi-scale retry only when nothing so far clears the retry floor.
    let best_confidence = candidates
        .iter()
        .map(MatchCandidate::confidence)
        .fold(0.0f32, f32::max);
    if best_confidence < cfg.retry_floor {
        if let Some(peak) = best_rescaled_peak(background, piece, cfg) {
            // A rescaled hit at exactly zero is a known degenerate artifact.
            if peak.score > primary_score && peak.x != 0 {
                debug!(x = peak.x, score = peak.score, "multi-scale candidate adopted");
                candidates.push(peak_candidate(peak, MatchMethod::MultiScale));
            }
        }
    }

    if candidates.is_empty() {
        return Err(PuzzleMatchError::NoMatch {
            reason: "every slider candidate was rejected",
        });
    }
    Ok(candidates)
}

/// Validates the search space and returns the horizontal range.
fn check_dimensions(background: &Raster, piece: &Raster) -> PuzzleMatchResult<usize> {
    if piece.width() >= background.width() || piece.height() > background.height() {
        return Err(PuzzleMatchError::PieceTooLarge {
            piece_width: piece.width(),
            piece_height: piece.height(),
            bg_width: background.width(),
            bg_height: background.height(),
        });
    }
    Ok(background.width() - piece.width())
}

fn peak_candidate(peak: Peak, method: MatchMethod) -> MatchCandidate {
    MatchCandidate {
        param: CandidateParam::Offset {
            x: peak.x as u32,
            y: peak.y as u32,
        },
        raw_score: peak.score,
        method,
    }
}

/// Best edge-map correlation across the three Canny levels.
fn best_edge_peak(
    background: &Raster,
    piece: &Raster,
    cfg: &SliderConfig,
    x0: usize,
    x1: usize,
) -> Option<Peak> {
    let bg_gray = background.to_gray_image();
    let piece_gray = piece.to_gray_image();

    let mut best: Option<Peak> = None;
    for &(low, high) in &cfg.edge_thresholds {
        let bg_edges = Raster::from_gray_image(&canny(&bg_gray, low, high), None).ok()?;
        let piece_edges = Raster::from_gray_image(&canny(&piece_gray, low, high), None).ok()?;

        // A nearly edge-free piece map has no variance at this level.
        let plan = match ZnccPlan::new(&piece_edges) {
            Ok(plan) => plan,
            Err(_) => continue,
        };
        let peak = match scan_best(&bg_edges, &plan, x0, x1) {
            Ok(Some(peak)) => peak,
            _ => continue,
        };
        if best.map_or(true, |b| peak.score > b.score) {
            best = Some(peak);
        }
    }
    best
}

/// Best correlation across rescaled piece sizes (80% to 120%).
fn best_rescaled_peak(background: &Raster, piece: &Raster, cfg: &SliderConfig) -> Option<Peak> {
    if cfg.scale_steps < 2 {
        return None;
    }
    let piece_gray = piece.to_gray_image();
    let step = (cfg.scale_max - cfg.scale_min) / (cfg.scale_steps - 1) as f32;

    let mut best: Option<Peak> = None;
    for i in 0..cfg.scale_steps {
        let scale = cfg.scale_min + step * i as f32;
        let new_w = ((piece.width() as f32) * scale).round() as u32;
        let new_h = ((piece.height() as f32) * scale).round() as u32;
        if new_w == 0 || new_h == 0 {
            continue;
        }
        if new_w as usize >= background.width() || new_h as usize > background.height() {
            continue;
        }

        let resized = imageops::resize(&piece_gray, new_w, new_h, FilterType::Triangle);
        // The rescaled sweep runs unmasked; the cutout geometry does not
        // survive resampling faithfully enough to trust.
        let resized = Raster::from_gray_image(&resized, None).ok()?;
        let plan = match ZnccPlan::new(&resized) {
            Ok(plan) => plan,
            Err(_) => continue,
        };
        let range = background.width() - resized.width();
        let margin = cfg.border_margin(range);
        if margin > range - margin {
            continue;
        }
        let peak = match scan_best(background, &plan, margin, range - margin) {
            Ok(Some(peak)) => peak,
            _ => continue,
        };
        if best.map_or(true, |b| peak.score > b.score) {
            best = Some(peak);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::{solve_slider, SliderConfig};
    use crate::candidate::{select_best, CandidateParam, MatchMethod};
    use crate::image::Raster;
    use crate::util::PuzzleMatchError;

    fn textured(width: usize, height: usize) -> Vec<u8> {
        (0..width * height)
            .map(|i| {
                let x = (i % width) as f32;
                let y = (i / width) as f32;
                (128.0 + 60.0 * (x * 0.35).sin() * (y * 0.27).cos() + 40.0 * (x * 0.11).cos())
                    as u8
            })
            .collect()
    }

    fn scene(bg_w: usize, bg_h: usize, pw: usize, ph: usize, x0: usize, y0: usize) -> (Raster, Raster) {
        let patch = textured(pw, ph);
        let mut bg = vec![90u8; bg_w * bg_h];
        for y in 0..ph {
            let dst = (y0 + y) * bg_w + x0;
            bg[dst..dst + pw].copy_from_slice(&patch[y * pw..(y + 1) * pw]);
        }
        (
            Raster::new(bg, bg_w, bg_h).unwrap(),
            Raster::new(patch, pw, ph).unwrap(),
        )
    }

    fn solved_offset(background: &Raster, piece: &Raster) -> (u32, u32, f32) {
        let candidates = solve_slider(background, piece, &SliderConfig::default()).unwrap();
        let best = select_best(&candidates).unwrap();
        let CandidateParam::Offset { x, y } = best.param else {
            panic!("slider candidates carry offsets");
        };
        (x, y, best.confidence())
    }

    #[test]
    fn exact_paste_is_recovered() {
        let (background, piece) = scene(300, 300, 50, 50, 120, 130);
        let (x, y, confidence) = solved_offset(&background, &piece);
        assert_eq!((x, y), (120, 130));
        assert!(confidence > 0.8, "confidence = {confidence}");
    }

    #[test]
    fn offsets_stay_inside_the_valid_range() {
        for x0 in [20usize, 77, 201, 240] {
            let (background, piece) = scene(300, 120, 50, 50, x0, 33);
            let (x, _, _) = solved_offset(&background, &piece);
            assert!(x <= 250, "x = {x} out of range for paste at {x0}");
        }
    }

    #[test]
    fn oversized_piece_is_a_dimension_error() {
        let (background, _) = scene(100, 100, 20, 20, 10, 10);
        let piece = Raster::new(textured(120, 50), 120, 50).unwrap();
        let err = solve_slider(&background, &piece, &SliderConfig::default()).unwrap_err();
        assert!(matches!(err, PuzzleMatchError::PieceTooLarge { .. }));
        // Equal width also leaves no search space.
        let piece = Raster::new(textured(100, 50), 100, 50).unwrap();
        let err = solve_slider(&background, &piece, &SliderConfig::default()).unwrap_err();
        assert!(matches!(err, PuzzleMatchError::PieceTooLarge { .. }));
    }

    #[test]
    fn border_adjacent_truth_is_never_confidently_wrong() {
        // True offset 2 sits inside the rejection margin (8 px for a 250 px
        // range). The solver must either land on a nearby surviving
        // placement or report clearly reduced confidence.
        let (background, piece) = scene(300, 120, 50, 50, 2, 40);
        let candidates = solve_slider(&background, &piece, &SliderConfig::default());
        let Ok(candidates) = candidates else {
            return; // every candidate rejected: honest failure
        };
        let best = select_best(&candidates).unwrap();
        let CandidateParam::Offset { x, .. } = best.param else {
            panic!("slider candidates carry offsets");
        };
        let near_truth = (x as i64 - 2).unsigned_abs() <= 10;
        assert!(
            near_truth || best.confidence() < 0.6,
            "x = {x}, confidence = {}",
            best.confidence()
        );
    }

    #[test]
    fn masked_piece_matches_through_the_cutout() {
        let (background, piece) = scene(200, 100, 40, 40, 66, 25);
        // Mask out a corner and corrupt it; the masked scan must not care.
        let mut data = piece.data().to_vec();
        let mut mask = vec![1u8; 40 * 40];
        for y in 0..12 {
            for x in 0..12 {
                data[y * 40 + x] = 0;
                mask[y * 40 + x] = 0;
            }
        }
        let piece = Raster::with_mask(data, mask, 40, 40).unwrap();
        let candidates = solve_slider(&background, &piece, &SliderConfig::default()).unwrap();
        let best = select_best(&candidates).unwrap();
        let CandidateParam::Offset { x, y } = best.param else {
            panic!("slider candidates carry offsets");
        };
        assert_eq!((x, y), (66, 25));
        assert_eq!(best.method, MatchMethod::Direct);
    }
}
