//! Match candidates and the selection rule.
//!
//! Every candidate-generating strategy produces `MatchCandidate` values tagged
//! with the method that found them. Selection is a single deterministic rule:
//! highest normalized confidence wins, and exact ties fall to the method
//! declared earlier in the strategy order. This replaces the nested
//! conditional heuristics of the exploratory code with one comparison site.

use crate::score;

/// Technique that produced a candidate.
///
/// Declaration order is the tie-break order during selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MatchMethod {
    /// Dense (masked) ZNCC template scan.
    Direct,
    /// ZNCC over Canny edge maps.
    Edges,
    /// Template scan across rescaled piece sizes.
    MultiScale,
    /// Masked correlation of polar-resampled strips.
    PolarDisc,
    /// Correlation of gradient-filtered polar strips.
    Gradient,
    /// External learned predictor substituted for the geometric search.
    Learned,
}

impl MatchMethod {
    fn order(self) -> u8 {
        match self {
            MatchMethod::Direct => 0,
            MatchMethod::Edges => 1,
            MatchMethod::MultiScale => 2,
            MatchMethod::PolarDisc => 3,
            MatchMethod::Gradient => 4,
            MatchMethod::Learned => 5,
        }
    }
}

/// Transform parameter proposed by a candidate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CandidateParam {
    /// Piece placement inside the background, in pixels.
    Offset { x: u32, y: u32 },
    /// Rotation angle in degrees, in [0, 360).
    Angle(f32),
}

/// One strategy's best proposal, transient to a single search.
#[derive(Clone, Copy, Debug)]
pub struct MatchCandidate {
    /// Proposed transform parameter.
    pub param: CandidateParam,
    /// Raw similarity score, comparable only within the same method family.
    pub raw_score: f32,
    /// Technique that produced this candidate.
    pub method: MatchMethod,
}

impl MatchCandidate {
    /// Normalized confidence in [0, 1].
    pub fn confidence(&self) -> f32 {
        score::confidence(self.method, self.raw_score)
    }
}

/// Picks the winning candidate by normalized confidence.
///
/// Ties on confidence resolve to the method declared earlier, so the polar
/// disc technique beats gradient matching at equal score, and the direct scan
/// beats its fallbacks.
pub fn select_best(candidates: &[MatchCandidate]) -> Option<MatchCandidate> {
    candidates.iter().copied().min_by(|a, b| {
        b.confidence()
            .total_cmp(&a.confidence())
            .then_with(|| a.method.order().cmp(&b.method.order()))
    })
}
