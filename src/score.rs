//! Raw score normalization and success policy.
//!
//! Raw similarity scores live in different domains per technique: correlation
//! scores in [-1, 1] (or [0, 1] for edge maps), mean pixel difference in
//! [0, 255]. Cross-method comparison always goes through the normalized
//! confidence produced here, never through raw scores.

use crate::candidate::MatchMethod;

/// Score domain of a method family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoreFamily {
    /// Normalized correlation; raw values in [-1, 1].
    Correlation,
    /// Mean absolute pixel difference; raw values in [0, 255], lower is better.
    MeanDifference,
}

/// Whether the confidence floor gates success or merely annotates it.
///
/// Advisory matches the observed production behavior: a result below the
/// floor is still reported as successful so downstream consumers can decide
/// to re-verify or retry with relaxed acceptance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FloorPolicy {
    /// Success is reported for any surviving candidate; the floor is a hint.
    #[default]
    Advisory,
    /// Candidates below the floor fail the solve.
    Hard,
}

/// Confidence floors and the policy applied to them.
#[derive(Clone, Debug)]
pub struct ScoreConfig {
    /// Floor gating behavior.
    pub floor_policy: FloorPolicy,
    /// Floor for direct and multi-scale template correlation.
    pub direct_floor: f32,
    /// Floor for edge-map correlation.
    pub edge_floor: f32,
    /// Floor for the rotation techniques.
    pub rotation_floor: f32,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            floor_policy: FloorPolicy::Advisory,
            direct_floor: 0.2,
            edge_floor: 0.15,
            rotation_floor: 0.3,
        }
    }
}

impl ScoreConfig {
    /// Returns the confidence floor for a method.
    pub fn floor(&self, method: MatchMethod) -> f32 {
        match method {
            MatchMethod::Direct | MatchMethod::MultiScale => self.direct_floor,
            MatchMethod::Edges => self.edge_floor,
            MatchMethod::PolarDisc | MatchMethod::Gradient => self.rotation_floor,
            MatchMethod::Learned => 0.0,
        }
    }
}

impl MatchMethod {
    /// Score domain this method reports in.
    ///
    /// Every current method scores by correlation; a method built on
    /// [`ScoreFamily::MeanDifference`] maps itself here and picks up the
    /// matching normalization rule for free.
    pub fn family(self) -> ScoreFamily {
        ScoreFamily::Correlation
    }
}

/// Maps a raw score into the common [0, 1] confidence band.
pub fn normalize(family: ScoreFamily, raw: f32) -> f32 {
    if !raw.is_finite() {
        return 0.0;
    }
    match family {
        // Anti-correlation carries no alignment evidence, so it floors at 0.
        ScoreFamily::Correlation => raw.clamp(0.0, 1.0),
        ScoreFamily::MeanDifference => (1.0 - raw / 255.0).clamp(0.0, 1.0),
    }
}

/// Normalized confidence for a method's raw score.
pub fn confidence(method: MatchMethod, raw: f32) -> f32 {
    normalize(method.family(), raw)
}
