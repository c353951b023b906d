// src/engine/encoder.rs
//
// Encoder operations: PNG via the image crate, optionally re-compressed by oxipng.

use crate::engine::common::run_with_panic_policy;
use crate::error::ResizerError;
use crate::raster::Raster;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::debug;

type EncoderResult<T> = std::result::Result<T, ResizerError>;

/// Highest oxipng preset; higher values are clamped.
pub const MAX_OPTIMIZE_LEVEL: u8 = 6;

/// How exported PNGs are compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PngSettings {
    /// Run oxipng after encoding (lossless).
    pub optimize: bool,
    /// oxipng preset, 0 (fast) to 6 (smallest).
    pub level: u8,
}

impl Default for PngSettings {
    fn default() -> Self {
        Self {
            optimize: true,
            level: 2,
        }
    }
}

impl PngSettings {
    /// Plain encode, no optimization pass. Used for previews and tests.
    pub fn fast() -> Self {
        Self {
            optimize: false,
            level: 0,
        }
    }
}

/// Encode a raster as PNG.
pub fn encode_png(raster: &Raster, settings: PngSettings) -> EncoderResult<Vec<u8>> {
    run_with_panic_policy("encode:png", || {
        let mut buf = Vec::new();
        raster
            .image()
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| ResizerError::encode_failed("png", format!("PNG encode failed: {e}")))?;

        if !settings.optimize {
            return Ok(buf);
        }

        // Lossless re-compression; the preset trades time for size.
        let options = oxipng::Options::from_preset(settings.level.min(MAX_OPTIMIZE_LEVEL));
        let optimized = oxipng::optimize_from_memory(&buf, &options).map_err(|e| {
            ResizerError::encode_failed("png", format!("oxipng optimization failed: {e}"))
        })?;

        debug!(
            target: "image_resizer::encode",
            width = raster.width(),
            height = raster.height(),
            raw = buf.len(),
            optimized = optimized.len(),
            "png encoded"
        );

        // oxipng never returns a larger file than it was given, but keep the smaller one anyway.
        Ok(if optimized.len() < buf.len() {
            optimized
        } else {
            buf
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::decoder::decode_raster;
    use image::{Rgba, RgbaImage};

    fn checker(width: u32, height: u32) -> Raster {
        Raster::new(RgbaImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 128])
            }
        }))
        .unwrap()
    }

    #[test]
    fn png_starts_with_signature() {
        let png = encode_png(&checker(8, 8), PngSettings::fast()).unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn optimized_png_is_lossless() {
        let raster = checker(32, 16);
        let png = encode_png(&raster, PngSettings::default()).unwrap();
        let decoded = decode_raster(&png).unwrap();
        assert!(decoded.same_content(&raster));
    }

    #[test]
    fn optimize_is_not_larger() {
        let raster = Raster::filled(64, 64, [10, 20, 30, 255]).unwrap();
        let plain = encode_png(&raster, PngSettings::fast()).unwrap();
        let optimized = encode_png(
            &raster,
            PngSettings {
                optimize: true,
                level: 9,
            },
        )
        .unwrap();
        assert!(optimized.len() <= plain.len());
    }
}
