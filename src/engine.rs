//! Top-level solve orchestration.
//!
//! The [`Engine`] owns the full pipeline: decode, preprocess, run the
//! candidate-generating strategies, select one winner, and fold every failure
//! mode into a [`SolveReport`] instead of an error. Callers that want to react
//! to individual failure reasons read the report's `error` field; `solve`
//! itself never returns `Err` and never panics on hostile input.

use tracing::{debug, info};

use crate::candidate::{select_best, CandidateParam, MatchCandidate, MatchMethod};
use crate::image::{decode_image, Raster};
use crate::prep::{preprocess, PrepConfig};
use crate::rotation::{solve_rotation, RotationConfig};
use crate::score::{FloorPolicy, ScoreConfig};
use crate::slider::{solve_slider, SliderConfig};
use crate::util::PuzzleMatchResult;

/// One solve task, borrowing the raw (or base64-encoded) image bytes.
#[derive(Clone, Copy, Debug)]
pub enum SolveRequest<'a> {
    /// Find the horizontal placement of a displaced piece in a background.
    Slider {
        background: &'a [u8],
        piece: &'a [u8],
    },
    /// Find the relative rotation between an inner disc and an outer ring.
    Rotation { inner: &'a [u8], outer: &'a [u8] },
}

/// Transform parameter reported by a solve.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Parameter {
    /// Rotation angle in degrees, in [0, 360).
    Angle(f32),
    /// Piece placement inside the background, in pixels.
    Offset { x: u32, y: u32 },
}

impl From<CandidateParam> for Parameter {
    fn from(value: CandidateParam) -> Self {
        match value {
            CandidateParam::Offset { x, y } => Parameter::Offset { x, y },
            CandidateParam::Angle(deg) => Parameter::Angle(deg),
        }
    }
}

/// Outcome of one solve.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolveReport {
    /// Whether a usable result was produced.
    pub success: bool,
    /// Winning transform parameter; failed solves carry the zero value for
    /// their request kind (offset `(0, 0)` or angle `0.0`).
    pub parameter: Option<Parameter>,
    /// Normalized confidence in [0, 1]; 0 when no candidate survived.
    pub confidence: f32,
    /// Technique that produced the winning parameter.
    pub method: Option<MatchMethod>,
    /// Human-readable failure reason, absent on success.
    pub error: Option<String>,
}

impl SolveReport {
    fn failed(reason: String, null_param: Parameter) -> Self {
        Self {
            success: false,
            parameter: Some(null_param),
            confidence: 0.0,
            method: None,
            error: Some(reason),
        }
    }
}

/// Zero-valued parameter for a request kind, reported on failure.
fn null_parameter(request: &SolveRequest<'_>) -> Parameter {
    match request {
        SolveRequest::Slider { .. } => Parameter::Offset { x: 0, y: 0 },
        SolveRequest::Rotation { .. } => Parameter::Angle(0.0),
    }
}

/// External learned predictor for slider puzzles.
///
/// An installed predictor substitutes for the geometric search: its
/// `(x, y, confidence)` prediction is reported as [`MatchMethod::Learned`].
/// Returning `None` abstains, and the solve falls back to the geometric
/// strategies. The `solve()` contract is identical either way.
pub trait SliderPredictor: Send + Sync {
    fn predict(&self, background: &Raster, piece: &Raster) -> Option<(u32, u32, f32)>;
}

/// External learned predictor for rotation puzzles.
///
/// Same substitution contract as [`SliderPredictor`], returning
/// `(angle_deg, confidence)`.
pub trait RotationPredictor: Send + Sync {
    fn predict(&self, inner: &Raster, outer: &Raster) -> Option<(f32, f32)>;
}

/// Engine configuration, assembled from the per-stage configs.
#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    pub prep: PrepConfig,
    pub slider: SliderConfig,
    pub rotation: RotationConfig,
    pub score: ScoreConfig,
}

/// Puzzle solve engine.
pub struct Engine {
    config: EngineConfig,
    slider_predictor: Option<Box<dyn SliderPredictor>>,
    rotation_predictor: Option<Box<dyn RotationPredictor>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            slider_predictor: None,
            rotation_predictor: None,
        }
    }

    /// Installs a learned slider predictor that substitutes for the geometric
    /// search.
    pub fn with_slider_predictor(mut self, predictor: Box<dyn SliderPredictor>) -> Self {
        self.slider_predictor = Some(predictor);
        self
    }

    /// Installs a learned rotation predictor.
    pub fn with_rotation_predictor(mut self, predictor: Box<dyn RotationPredictor>) -> Self {
        self.rotation_predictor = Some(predictor);
        self
    }

    /// Runs one solve. Never panics and never returns an error; every failure
    /// mode becomes a failed [`SolveReport`].
    pub fn solve(&self, request: SolveRequest<'_>) -> SolveReport {
        let result = match request {
            SolveRequest::Slider { background, piece } => self.run_slider(background, piece),
            SolveRequest::Rotation { inner, outer } => self.run_rotation(inner, outer),
        };
        match result {
            Ok(report) => report,
            Err(err) => {
                info!(%err, "solve failed");
                SolveReport::failed(err.to_string(), null_parameter(&request))
            }
        }
    }

    fn run_slider(&self, background: &[u8], piece: &[u8]) -> PuzzleMatchResult<SolveReport> {
        let background = decode_image(background, false)?;
        let piece = decode_image(piece, true)?;

        let background = preprocess(&background, &self.config.prep)?;
        let piece = preprocess(&piece, &self.config.prep)?;

        let learned = self
            .slider_predictor
            .as_deref()
            .and_then(|p| p.predict(&background, &piece));
        let candidates = match learned {
            Some((x, y, confidence)) => vec![MatchCandidate {
                param: CandidateParam::Offset { x, y },
                raw_score: confidence,
                method: MatchMethod::Learned,
            }],
            None => solve_slider(&background, &piece, &self.config.slider)?,
        };

        Ok(self.finish(candidates, Parameter::Offset { x: 0, y: 0 }))
    }

    fn run_rotation(&self, inner: &[u8], outer: &[u8]) -> PuzzleMatchResult<SolveReport> {
        let inner = decode_image(inner, true)?;
        let outer = decode_image(outer, true)?;

        // Near-black padding around the disc artwork is as meaningless as
        // transparent padding and must not vote in the correlation.
        let inner = inner.with_near_zero_masked(self.config.rotation.near_zero);
        let outer = outer.with_near_zero_masked(self.config.rotation.near_zero);

        let inner = preprocess(&inner, &self.config.prep)?;
        let outer = preprocess(&outer, &self.config.prep)?;

        let learned = self
            .rotation_predictor
            .as_deref()
            .and_then(|p| p.predict(&inner, &outer));
        let candidates = match learned {
            Some((angle_deg, confidence)) => vec![MatchCandidate {
                param: CandidateParam::Angle(angle_deg),
                raw_score: confidence,
                method: MatchMethod::Learned,
            }],
            None => solve_rotation(&inner, &outer, &self.config.rotation)?,
        };

        Ok(self.finish(candidates, Parameter::Angle(0.0)))
    }

    /// Selects the winner and applies the confidence floor policy.
    fn finish(&self, candidates: Vec<MatchCandidate>, null_param: Parameter) -> SolveReport {
        let Some(best) = select_best(&candidates) else {
            return SolveReport::failed("no strategy produced a candidate".to_string(), null_param);
        };

        let confidence = best.confidence();
        let floor = self.config.score.floor(best.method);
        let below_floor = confidence < floor;
        if below_floor {
            debug!(
                method = ?best.method,
                confidence, floor, "winning candidate is below its confidence floor"
            );
        }

        let success = match self.config.score.floor_policy {
            FloorPolicy::Advisory => true,
            FloorPolicy::Hard => !below_floor,
        };

        info!(
            method = ?best.method,
            confidence,
            success,
            param = ?best.param,
            "solve finished"
        );

        SolveReport {
            success,
            parameter: Some(best.param.into()),
            confidence,
            method: Some(best.method),
            error: (!success).then(|| {
                format!("confidence {confidence:.3} is below the floor {floor:.3}")
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::png::PngEncoder;
    use image::{ExtendedColorType, ImageEncoder};

    struct FixedSlider;

    impl SliderPredictor for FixedSlider {
        fn predict(&self, _background: &Raster, _piece: &Raster) -> Option<(u32, u32, f32)> {
            Some((42, 7, 0.95))
        }
    }

    fn textured_png(width: u32, height: u32) -> Vec<u8> {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let v = (128.0 + 80.0 * (0.11 * x as f32).sin() * (0.09 * y as f32).cos()) as u8;
                pixels.extend_from_slice(&[v, v, v, 255]);
            }
        }
        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(&pixels, width, height, ExtendedColorType::Rgba8)
            .unwrap();
        out
    }

    #[test]
    fn garbage_bytes_fail_without_panicking() {
        let engine = Engine::default();
        let report = engine.solve(SolveRequest::Slider {
            background: b"not an image",
            piece: b"also not an image",
        });
        assert!(!report.success);
        // Failed slider reports still carry a numeric offset.
        assert_eq!(report.parameter, Some(Parameter::Offset { x: 0, y: 0 }));
        assert!(report.error.is_some());
    }

    #[test]
    fn empty_inputs_fail_cleanly() {
        let engine = Engine::default();
        let report = engine.solve(SolveRequest::Rotation {
            inner: b"",
            outer: b"",
        });
        assert!(!report.success);
        assert_eq!(report.parameter, Some(Parameter::Angle(0.0)));
        assert_eq!(report.confidence, 0.0);
    }

    #[test]
    fn installed_predictor_substitutes_for_the_search() {
        let engine = Engine::default().with_slider_predictor(Box::new(FixedSlider));
        let report = engine.solve(SolveRequest::Slider {
            background: &textured_png(120, 90),
            piece: &textured_png(40, 40),
        });
        assert!(report.success);
        assert_eq!(report.parameter, Some(Parameter::Offset { x: 42, y: 7 }));
        assert_eq!(report.method, Some(MatchMethod::Learned));
    }

    #[test]
    fn oversized_slider_piece_reports_the_null_offset() {
        let engine = Engine::default();
        let report = engine.solve(SolveRequest::Slider {
            background: &textured_png(64, 64),
            piece: &textured_png(64, 64),
        });
        assert!(!report.success);
        assert_eq!(report.parameter, Some(Parameter::Offset { x: 0, y: 0 }));
        assert!(report.error.is_some());
    }

    #[test]
    fn hard_floor_fails_weak_winners() {
        let mut config = EngineConfig::default();
        config.score.floor_policy = FloorPolicy::Hard;
        let engine = Engine::new(config);

        let report = engine.finish(
            vec![MatchCandidate {
                param: CandidateParam::Angle(90.0),
                raw_score: 0.1,
                method: MatchMethod::PolarDisc,
            }],
            Parameter::Angle(0.0),
        );
        assert!(!report.success);
        // The weak parameter is still reported for diagnostics.
        assert_eq!(report.parameter, Some(Parameter::Angle(90.0)));
        assert!(report.error.unwrap().contains("floor"));
    }

    #[test]
    fn advisory_floor_reports_weak_winners_as_success() {
        let engine = Engine::default();
        let report = engine.finish(
            vec![MatchCandidate {
                param: CandidateParam::Angle(90.0),
                raw_score: 0.1,
                method: MatchMethod::PolarDisc,
            }],
            Parameter::Angle(0.0),
        );
        assert!(report.success);
        assert!(report.error.is_none());
    }
}
