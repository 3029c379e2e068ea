//! Raster buffers shared by the solvers.
//!
//! `Raster` is an owned, contiguous grayscale image with an optional binary
//! validity mask of the same spatial dimensions. The mask marks pixels that
//! take part in similarity computation; transparent or out-of-disc regions are
//! excluded through it. Rasters are created once per decode call, treated as
//! immutable by the solvers, and dropped when the solve call returns.

use crate::util::{PuzzleMatchError, PuzzleMatchResult};

pub mod decode;

pub use decode::decode_image;

/// Owned grayscale image with an optional same-size binary mask.
#[derive(Clone, Debug)]
pub struct Raster {
    data: Vec<u8>,
    width: usize,
    height: usize,
    mask: Option<Vec<u8>>,
}

impl Raster {
    /// Creates a raster from a contiguous grayscale buffer.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> PuzzleMatchResult<Self> {
        let needed = checked_len(width, height)?;
        if data.len() != needed {
            return Err(PuzzleMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            mask: None,
        })
    }

    /// Creates a raster with a validity mask (`0` = excluded, non-zero = valid).
    pub fn with_mask(
        data: Vec<u8>,
        mask: Vec<u8>,
        width: usize,
        height: usize,
    ) -> PuzzleMatchResult<Self> {
        let mut raster = Self::new(data, width, height)?;
        if mask.len() != raster.data.len() {
            return Err(PuzzleMatchError::BufferTooSmall {
                needed: raster.data.len(),
                got: mask.len(),
            });
        }
        raster.mask = Some(mask);
        Ok(raster)
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the backing grayscale buffer in row-major order.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the validity mask, if one is attached.
    pub fn mask(&self) -> Option<&[u8]> {
        self.mask.as_deref()
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.width;
        self.data.get(start..start + self.width)
    }

    /// Returns the pixel at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// Returns true if `(x, y)` participates in similarity computation.
    pub fn is_valid(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        match &self.mask {
            Some(mask) => mask[y * self.width + x] != 0,
            None => true,
        }
    }

    /// Returns a copy whose mask additionally excludes near-zero pixels.
    ///
    /// Split-ring puzzle assets mark transparent padding either through alpha
    /// or by flattening to near-black; this folds both into one mask before
    /// preprocessing can redistribute those intensities.
    pub fn with_near_zero_masked(&self, threshold: u8) -> Self {
        let mut mask = self
            .mask
            .clone()
            .unwrap_or_else(|| vec![1u8; self.data.len()]);
        for (value, m) in self.data.iter().zip(mask.iter_mut()) {
            if *value <= threshold {
                *m = 0;
            }
        }
        Self {
            data: self.data.clone(),
            width: self.width,
            height: self.height,
            mask: Some(mask),
        }
    }

    /// Builds a raster from a grayscale `image` buffer, keeping `mask`.
    pub(crate) fn from_gray_image(
        img: &image::GrayImage,
        mask: Option<Vec<u8>>,
    ) -> PuzzleMatchResult<Self> {
        let width = img.width() as usize;
        let height = img.height() as usize;
        match mask {
            Some(mask) => Self::with_mask(img.as_raw().clone(), mask, width, height),
            None => Self::new(img.as_raw().clone(), width, height),
        }
    }

    /// Converts the grayscale buffer to an `image` crate buffer (mask dropped).
    pub(crate) fn to_gray_image(&self) -> image::GrayImage {
        image::GrayImage::from_raw(self.width as u32, self.height as u32, self.data.clone())
            .expect("raster buffer length matches its dimensions")
    }
}

fn checked_len(width: usize, height: usize) -> PuzzleMatchResult<usize> {
    if width == 0 || height == 0 {
        return Err(PuzzleMatchError::InvalidDimensions { width, height });
    }
    width
        .checked_mul(height)
        .ok_or(PuzzleMatchError::InvalidDimensions { width, height })
}

#[cfg(test)]
mod tests {
    use super::Raster;
    use crate::util::PuzzleMatchError;

    #[test]
    fn rejects_zero_dimensions() {
        let err = Raster::new(vec![], 0, 4).unwrap_err();
        assert!(matches!(err, PuzzleMatchError::InvalidDimensions { .. }));
    }

    #[test]
    fn rejects_short_buffer() {
        let err = Raster::new(vec![0u8; 5], 3, 2).unwrap_err();
        assert!(matches!(err, PuzzleMatchError::BufferTooSmall { .. }));
    }

    #[test]
    fn mask_controls_validity() {
        let raster = Raster::with_mask(vec![10, 20, 30, 40], vec![1, 0, 1, 0], 2, 2).unwrap();
        assert!(raster.is_valid(0, 0));
        assert!(!raster.is_valid(1, 0));
        assert!(!raster.is_valid(2, 0));
    }

    #[test]
    fn near_zero_masking_excludes_dark_pixels() {
        let raster = Raster::new(vec![0, 5, 120, 255], 2, 2).unwrap();
        let masked = raster.with_near_zero_masked(8);
        assert!(!masked.is_valid(0, 0));
        assert!(!masked.is_valid(1, 0));
        assert!(masked.is_valid(0, 1));
        assert!(masked.is_valid(1, 1));
    }
}
