//! PuzzleMatch solves image-based slider and rotation puzzles on the CPU.
//!
//! Two transform searches are provided: a horizontal ZNCC template scan that
//! finds where a displaced piece was cut from a background, and a polar
//! correlation search that finds the relative rotation between an inner disc
//! and an outer ring. Every strategy produces candidates that compete through
//! one normalized-confidence selection rule; optional parallelism is available
//! via the `rayon` feature and report serialization via `serde`.

mod candidate;
mod corr;
mod engine;
pub mod image;
mod polar;
pub mod prep;
pub mod rotation;
pub mod score;
pub mod slider;
pub mod util;

pub use candidate::{select_best, CandidateParam, MatchCandidate, MatchMethod};
pub use corr::{Peak, ZnccPlan};
pub use engine::{
    Engine, EngineConfig, Parameter, RotationPredictor, SliderPredictor, SolveReport, SolveRequest,
};
pub use image::{decode_image, Raster};
pub use prep::{preprocess, PrepConfig};
pub use rotation::RotationConfig;
pub use score::{FloorPolicy, ScoreConfig, ScoreFamily};
pub use slider::SliderConfig;
pub use util::{PuzzleMatchError, PuzzleMatchResult};
