// src/raster.rs
//
// Shared, immutable RGBA8 pixels. Every resize/crop produces a new Raster;
// clones only bump a reference count.

use crate::error::{ResizerError, Result};
use crate::ops::{Dimensions, MAX_DIMENSION};
use image::{DynamicImage, RgbaImage};
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct Raster {
    pixels: Arc<RgbaImage>,
}

impl Raster {
    /// Wrap decoded pixels. Empty images are rejected.
    pub fn new(image: RgbaImage) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ResizerError::decode_failed("image has zero width or height"));
        }
        Ok(Self {
            pixels: Arc::new(image),
        })
    }

    pub fn from_dynamic(image: DynamicImage) -> Result<Self> {
        Self::new(image.into_rgba8())
    }

    /// Build from raw RGBA bytes. The buffer length must match exactly.
    pub fn from_raw(width: u32, height: u32, bytes: Vec<u8>) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4));
        if expected != Some(bytes.len()) {
            return Err(ResizerError::decode_failed(format!(
                "raw buffer of {} bytes does not match {width}x{height} RGBA",
                bytes.len()
            )));
        }
        let image = RgbaImage::from_raw(width, height, bytes)
            .ok_or_else(|| ResizerError::decode_failed("raw buffer rejected"))?;
        Self::new(image)
    }

    /// Solid fill, mostly for tests and benches.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        Self::new(RgbaImage::from_pixel(width, height, image::Rgba(rgba)))
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Dimensions when both axes are within the editor limits.
    pub fn dimensions(&self) -> Result<Dimensions> {
        let (w, h) = (self.width(), self.height());
        if w > MAX_DIMENSION || h > MAX_DIMENSION {
            return Err(ResizerError::dimension_exceeds_limit(w.max(h), MAX_DIMENSION));
        }
        Dimensions::new(w, h)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Owned pixels; copies only when the storage is shared.
    pub fn into_image(self) -> RgbaImage {
        Arc::try_unwrap(self.pixels).unwrap_or_else(|shared| (*shared).clone())
    }

    /// Same storage, or same size with identical samples.
    pub fn same_content(&self, other: &Raster) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
            || (self.width() == other.width()
                && self.height() == other.height()
                && self.as_bytes() == other.as_bytes())
    }

    pub fn shares_storage(&self, other: &Raster) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

impl fmt::Debug for Raster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("refs", &Arc::strong_count(&self.pixels))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_shares_storage() {
        let a = Raster::filled(4, 4, [1, 2, 3, 255]).unwrap();
        let b = a.clone();
        assert!(a.shares_storage(&b));
        assert!(a.same_content(&b));
    }

    #[test]
    fn same_content_compares_samples() {
        let a = Raster::filled(4, 4, [1, 2, 3, 255]).unwrap();
        let b = Raster::filled(4, 4, [1, 2, 3, 255]).unwrap();
        let c = Raster::filled(4, 4, [9, 2, 3, 255]).unwrap();
        let d = Raster::filled(2, 8, [1, 2, 3, 255]).unwrap();
        assert!(a.same_content(&b));
        assert!(!a.shares_storage(&b));
        assert!(!a.same_content(&c));
        assert!(!a.same_content(&d));
    }

    #[test]
    fn from_raw_checks_length() {
        assert!(Raster::from_raw(2, 2, vec![0; 16]).is_ok());
        assert!(Raster::from_raw(2, 2, vec![0; 15]).is_err());
        assert!(Raster::from_raw(0, 2, vec![]).is_err());
    }

    #[test]
    fn dimensions_rejects_oversize() {
        let r = Raster::filled(8001, 1, [0, 0, 0, 0]).unwrap();
        assert!(matches!(
            r.dimensions(),
            Err(ResizerError::DimensionExceedsLimit { dimension: 8001, max: 8000 })
        ));
    }

    #[test]
    fn into_image_avoids_copy_when_unique() {
        let r = Raster::filled(3, 3, [5, 5, 5, 5]).unwrap();
        let img = r.into_image();
        assert_eq!(img.dimensions(), (3, 3));
    }
}
