//! Error types for puzzlematch.

use thiserror::Error;

/// Result alias for puzzlematch operations.
pub type PuzzleMatchResult<T> = std::result::Result<T, PuzzleMatchError>;

/// Errors that can occur while decoding inputs or searching for a match.
///
/// All variants are recovered inside [`crate::engine::Engine::solve`] and
/// surfaced as a failed report; none of them escape as a process fault.
#[derive(Debug, Error)]
pub enum PuzzleMatchError {
    /// The input bytes could not be decoded into a raster image.
    #[error("decode failed: {reason}")]
    Decode { reason: String },
    /// An image has a zero or otherwise unusable dimension.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// The piece does not fit inside the background, so the search space is empty.
    #[error("piece {piece_width}x{piece_height} does not fit inside background {bg_width}x{bg_height}")]
    PieceTooLarge {
        piece_width: usize,
        piece_height: usize,
        bg_width: usize,
        bg_height: usize,
    },
    /// Every candidate was rejected by the border or degeneracy rules.
    #[error("no match: {reason}")]
    NoMatch { reason: &'static str },
    /// The template carries no usable signal (for example zero variance).
    #[error("degenerate template: {reason}")]
    DegenerateTemplate { reason: &'static str },
    /// A configuration value is outside its valid range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: &'static str },
    /// A pixel buffer is shorter than its stated dimensions require.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
}
