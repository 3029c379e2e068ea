//! Transport-encoded image decoding.
//!
//! Puzzle jobs carry images either as raw encoded bytes (PNG/JPEG) or as
//! base64 text, optionally prefixed with a `data:<media-type>;base64,` header.
//! The decoder strips the header, tries the raw bytes first and falls back to
//! base64, then reduces the pixels to perceptual luma. When the caller expects
//! a transparency cutout, the alpha channel becomes the validity mask.

use base64::Engine as _;
use image::DynamicImage;

use crate::image::Raster;
use crate::util::{PuzzleMatchError, PuzzleMatchResult};

/// Alpha values at or below this are treated as transparent.
const ALPHA_VALID_MIN: u8 = 128;

/// Decodes transport-encoded bytes into a grayscale raster.
///
/// `expect_alpha` requests a validity mask built from the alpha channel; it is
/// ignored when the decoded image carries no alpha. Malformed encodings, empty
/// buffers, and zero-dimension results all map to [`PuzzleMatchError::Decode`].
pub fn decode_image(bytes: &[u8], expect_alpha: bool) -> PuzzleMatchResult<Raster> {
    if bytes.is_empty() {
        return Err(PuzzleMatchError::Decode {
            reason: "empty input buffer".to_owned(),
        });
    }

    let payload = strip_data_url_prefix(bytes);
    let img = match image::load_from_memory(payload) {
        Ok(img) => img,
        Err(raw_err) => {
            let text = std::str::from_utf8(payload).map_err(|_| PuzzleMatchError::Decode {
                reason: format!("unrecognized image data: {raw_err}"),
            })?;
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(text.trim())
                .map_err(|b64_err| PuzzleMatchError::Decode {
                    reason: format!("neither image bytes nor base64: {b64_err}"),
                })?;
            image::load_from_memory(&decoded).map_err(|err| PuzzleMatchError::Decode {
                reason: format!("base64 payload is not a decodable image: {err}"),
            })?
        }
    };

    raster_from_decoded(img, expect_alpha)
}

/// Strips a `data:...;base64,` style transport prefix if one is present.
fn strip_data_url_prefix(bytes: &[u8]) -> &[u8] {
    if !bytes.starts_with(b"data:") {
        return bytes;
    }
    match bytes.iter().position(|&b| b == b',') {
        Some(comma) => &bytes[comma + 1..],
        None => bytes,
    }
}

fn raster_from_decoded(img: DynamicImage, expect_alpha: bool) -> PuzzleMatchResult<Raster> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    if width == 0 || height == 0 {
        return Err(PuzzleMatchError::Decode {
            reason: format!("decoded image has zero dimension ({width}x{height})"),
        });
    }

    let mask = if expect_alpha && img.color().has_alpha() {
        let rgba = img.to_rgba8();
        let mask: Vec<u8> = rgba
            .pixels()
            .map(|px| u8::from(px[3] >= ALPHA_VALID_MIN))
            .collect();
        if mask.iter().all(|&m| m == 0) {
            return Err(PuzzleMatchError::Decode {
                reason: "image is fully transparent".to_owned(),
            });
        }
        Some(mask)
    } else {
        None
    };

    let gray = img.to_luma8();
    Raster::from_gray_image(&gray, mask)
}
