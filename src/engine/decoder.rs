// src/engine/decoder.rs
//
// Decoder operations: PNG (zune-png), everything else through the image crate.

use crate::engine::common::run_with_panic_policy;
use crate::engine::pipeline::orient;
use crate::error::ResizerError;
use crate::ops::MAX_DIMENSION;
use crate::raster::Raster;
use image::{DynamicImage, GrayAlphaImage, GrayImage, ImageFormat, ImageReader, RgbImage, RgbaImage};
use std::io::Cursor;
use tracing::debug;
use zune_core::bytestream::ZCursor;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_png::PngDecoder;

type DecoderResult<T> = std::result::Result<T, ResizerError>;

/// Decode non-PNG formats using the image crate under the global panic policy.
pub fn decode_with_image_crate(data: &[u8]) -> DecoderResult<DynamicImage> {
    run_with_panic_policy("decode:image", || {
        image::load_from_memory(data)
            .map_err(|e| ResizerError::decode_failed(format!("decode failed: {e}")))
    })
}

/// Decode PNG using zune-png (SIMD-optimized). 16-bit input is stripped to 8-bit.
pub fn decode_png_zune(data: &[u8]) -> DecoderResult<DynamicImage> {
    run_with_panic_policy("decode:png", || {
        let options = DecoderOptions::default().png_set_strip_to_8bit(true);
        let mut decoder = PngDecoder::new_with_options(ZCursor::new(data), options);
        decoder
            .decode_headers()
            .map_err(|e| ResizerError::decode_failed(format!("png: bad header: {e}")))?;
        let (width, height) = decoder
            .dimensions()
            .ok_or_else(|| ResizerError::decode_failed("png: missing header info"))?;
        // Reject before the pixel buffer is allocated.
        check_dimensions(width as u32, height as u32)?;

        let pixels = decoder
            .decode()
            .map_err(|e| ResizerError::decode_failed(format!("png: decode failed: {e}")))?;
        let (width, height) = (width as u32, height as u32);

        let buf = match pixels {
            zune_core::result::DecodingResult::U8(v) => v,
            _ => {
                return Err(ResizerError::decode_failed(
                    "png: unexpected non-U8 pixel buffer",
                ))
            }
        };

        let colorspace = decoder
            .colorspace()
            .ok_or_else(|| ResizerError::decode_failed("png: missing colorspace"))?;

        let img = match colorspace {
            ColorSpace::RGB => RgbImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| ResizerError::decode_failed("png: failed to build RGB image"))?,
            ColorSpace::RGBA => RgbaImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageRgba8)
                .ok_or_else(|| ResizerError::decode_failed("png: failed to build RGBA image"))?,
            ColorSpace::Luma => GrayImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(|| ResizerError::decode_failed("png: failed to build Luma image"))?,
            ColorSpace::LumaA => GrayAlphaImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageLumaA8)
                .ok_or_else(|| ResizerError::decode_failed("png: failed to build LumaA image"))?,
            other => {
                return Err(ResizerError::decode_failed(format!(
                    "png: unsupported colorspace {other:?}"
                )))
            }
        };

        Ok(img)
    })
}

/// Detect input format using magic bytes. Returns None if unknown.
pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Unified decode entrypoint:
/// - Check the header dimensions before allocating pixels
/// - Route PNG to zune-png, others to the image crate
/// - Return decoded image and detected format
pub fn decode_image(bytes: &[u8]) -> DecoderResult<(DynamicImage, Option<ImageFormat>)> {
    if bytes.is_empty() {
        return Err(ResizerError::decode_failed("empty input"));
    }
    let detected = detect_format(bytes);
    let img = match detected {
        Some(ImageFormat::Png) => decode_png_zune(bytes)?,
        Some(_) => {
            ensure_dimensions_safe(bytes)?;
            decode_with_image_crate(bytes)?
        }
        None => return Err(ResizerError::unsupported_format("unrecognized image data")),
    };
    // Formats whose header could not be inspected are re-checked here.
    check_dimensions(img.width(), img.height())?;
    Ok((img, detected))
}

/// Decode to an upright RGBA raster, applying the EXIF Orientation tag.
pub fn decode_raster(bytes: &[u8]) -> DecoderResult<Raster> {
    let (img, format) = decode_image(bytes)?;
    let orientation = detect_exif_orientation(bytes).unwrap_or(1);
    debug!(
        target: "image_resizer::decode",
        format = ?format,
        width = img.width(),
        height = img.height(),
        orientation,
        "decoded"
    );
    Raster::new(orient(img.into_rgba8(), orientation))
}

/// Check if image dimensions are within the editor limits.
pub fn check_dimensions(width: u32, height: u32) -> DecoderResult<()> {
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(ResizerError::dimension_exceeds_limit(
            width.max(height),
            MAX_DIMENSION,
        ));
    }
    if width == 0 || height == 0 {
        return Err(ResizerError::decode_failed("image has zero width or height"));
    }
    Ok(())
}

/// Inspect encoded bytes and ensure the image dimensions are safe before decoding.
pub fn ensure_dimensions_safe(bytes: &[u8]) -> DecoderResult<()> {
    let cursor = Cursor::new(bytes);
    if let Ok(reader) = ImageReader::new(cursor).with_guessed_format() {
        if let Ok((width, height)) = reader.into_dimensions() {
            return check_dimensions(width, height);
        }
    }
    Ok(())
}

/// Extract EXIF Orientation tag (1-8). Returns None if missing or invalid.
pub fn detect_exif_orientation(bytes: &[u8]) -> Option<u16> {
    let mut cursor = Cursor::new(bytes);
    let exif_reader = exif::Reader::new();
    let exif = exif_reader.read_from_container(&mut cursor).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    // exif crate can represent as Short/Long; use get_uint for safety
    let value = field.value.get_uint(0)?;
    let orientation = value as u16;
    if (1..=8).contains(&orientation) {
        Some(orientation)
    } else {
        None
    }
}
