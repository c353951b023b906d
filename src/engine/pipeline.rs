// src/engine/pipeline.rs
//
// Pipeline operations: step-down resize, crop, orientation

use crate::error::ResizerError;
use crate::ops::{CropRegion, Dimensions, ResampleFilter};
use crate::raster::Raster;
use fast_image_resize::{self as fir, MulDiv, PixelType, ResizeOptions};
use image::{imageops, RgbaImage};
use tracing::{debug, warn};

// Type alias for Result - always use ResizerError to preserve error taxonomy
// so that a failed allocation stays a ResourceLimit rather than a CodecError.
type PipelineResult<T> = std::result::Result<T, ResizerError>;

const BYTES_PER_PIXEL: usize = 4;

/// Intermediate and final sizes visited when scaling `source` to `target`.
///
/// Enlarging (either axis at or above the source) is one direct step.
/// Shrinking halves both axes, never below the target, while either axis is
/// more than twice its target, then lands on the exact target.
/// An empty plan means the sizes already match.
pub fn plan_steps(source: (u32, u32), target: (u32, u32)) -> Vec<(u32, u32)> {
    if source == target {
        return Vec::new();
    }
    let (tw, th) = target;
    if tw >= source.0 || th >= source.1 {
        return vec![target];
    }

    let mut steps = Vec::new();
    let mut current = source;
    while current.0 as u64 > 2 * tw as u64 || current.1 as u64 > 2 * th as u64 {
        current = ((current.0 / 2).max(tw), (current.1 / 2).max(th));
        steps.push(current);
    }
    if current != target {
        steps.push(target);
    }
    steps
}

/// Resize `source` to exactly `width` x `height`.
///
/// Targets outside `1..=MAX_DIMENSION` fail with `InvalidDimension`.
pub fn resize(
    source: &Raster,
    width: u32,
    height: u32,
    filter: ResampleFilter,
) -> PipelineResult<Raster> {
    let target = Dimensions::new(width, height)?;
    resize_to(source, target, filter)
}

pub fn resize_to(
    source: &Raster,
    target: Dimensions,
    filter: ResampleFilter,
) -> PipelineResult<Raster> {
    let src_dims = (source.width(), source.height());
    let steps = plan_steps(src_dims, target.as_tuple());
    if steps.is_empty() {
        return Ok(source.clone());
    }

    debug!(
        target: "image_resizer::resize",
        source = ?src_dims,
        target = %target,
        steps = steps.len(),
        filter = filter.as_str(),
        "resizing"
    );

    let resized = match resample_chain(source.image(), &steps, filter) {
        Ok(img) => img,
        // Allocation failures are final; a second resampler would need the same memory.
        Err(ChainError::Canvas(err)) => return Err(err),
        Err(ChainError::Resampler(reason)) => {
            warn!(
                target: "image_resizer::resize",
                %reason,
                "SIMD resampler failed, falling back to image crate"
            );
            resample_chain_with_image_crate(source.image(), &steps, filter)?
        }
    };

    if (resized.width(), resized.height()) != target.as_tuple() {
        return Err(ResizerError::resize_failed(
            src_dims,
            target.as_tuple(),
            format!(
                "resampler produced {}x{}",
                resized.width(),
                resized.height()
            ),
        ));
    }
    Raster::new(resized)
}

/// Cut `region` out of `source`. The region is clamped to the source bounds.
pub fn crop(source: &Raster, region: CropRegion) -> PipelineResult<Raster> {
    let (img_w, img_h) = (source.width(), source.height());
    if region.width == 0 || region.height == 0 || region.x >= img_w || region.y >= img_h {
        return Err(ResizerError::invalid_crop_region(
            region.x,
            region.y,
            region.width,
            region.height,
            img_w,
            img_h,
        ));
    }

    let width = region.width.min(img_w - region.x);
    let height = region.height.min(img_h - region.y);
    let mut pixels = allocate_canvas(width, height)?;

    let stride = img_w as usize * BYTES_PER_PIXEL;
    let row_bytes = width as usize * BYTES_PER_PIXEL;
    let src = source.as_bytes();
    for row in region.y as usize..(region.y + height) as usize {
        let start = row * stride + region.x as usize * BYTES_PER_PIXEL;
        pixels.extend_from_slice(&src[start..start + row_bytes]);
    }

    debug!(
        target: "image_resizer::crop",
        x = region.x,
        y = region.y,
        width,
        height,
        "cropped"
    );

    let image = RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| ResizerError::internal_panic("crop produced a short buffer"))?;
    Raster::new(image)
}

/// Apply an EXIF orientation value (1-8). Unknown values leave the image untouched.
pub fn orient(image: RgbaImage, orientation: u16) -> RgbaImage {
    match orientation {
        2 => imageops::flip_horizontal(&image),
        3 => imageops::rotate180(&image),
        4 => imageops::flip_vertical(&image),
        5 => imageops::flip_horizontal(&imageops::rotate90(&image)), // transpose
        6 => imageops::rotate90(&image),
        7 => imageops::flip_horizontal(&imageops::rotate270(&image)), // transverse
        8 => imageops::rotate270(&image),
        _ => image,
    }
}

/// Reserve a zeroed-capacity RGBA buffer for a `width` x `height` surface.
///
/// This is the one place a destination surface is allocated, so an
/// allocation failure surfaces as `CanvasUnavailable` instead of an abort.
pub(crate) fn allocate_canvas(width: u32, height: u32) -> PipelineResult<Vec<u8>> {
    let bytes = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(BYTES_PER_PIXEL))
        .ok_or_else(|| ResizerError::canvas_unavailable(width, height, "size overflow"))?;
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(bytes)
        .map_err(|e| ResizerError::canvas_unavailable(width, height, e.to_string()))?;
    Ok(buffer)
}

fn allocate_zeroed(width: u32, height: u32) -> PipelineResult<Vec<u8>> {
    let mut buffer = allocate_canvas(width, height)?;
    buffer.resize(buffer.capacity(), 0);
    Ok(buffer)
}

enum ChainError {
    Canvas(ResizerError),
    Resampler(String),
}

impl From<ResizerError> for ChainError {
    fn from(err: ResizerError) -> Self {
        ChainError::Canvas(err)
    }
}

fn fir_filter(filter: ResampleFilter) -> fir::FilterType {
    match filter {
        ResampleFilter::Bilinear => fir::FilterType::Bilinear,
        ResampleFilter::CatmullRom => fir::FilterType::CatmullRom,
        ResampleFilter::Lanczos3 => fir::FilterType::Lanczos3,
    }
}

fn image_filter(filter: ResampleFilter) -> imageops::FilterType {
    match filter {
        ResampleFilter::Bilinear => imageops::FilterType::Triangle,
        ResampleFilter::CatmullRom => imageops::FilterType::CatmullRom,
        ResampleFilter::Lanczos3 => imageops::FilterType::Lanczos3,
    }
}

/// Run every step of the plan through fast_image_resize.
///
/// Alpha is premultiplied once before the first step and divided once after
/// the last, so transparent pixels never bleed color into their neighbours.
/// Alpha handling is disabled on the resizer itself for the same reason.
fn resample_chain(
    source: &RgbaImage,
    steps: &[(u32, u32)],
    filter: ResampleFilter,
) -> std::result::Result<RgbaImage, ChainError> {
    let (src_width, src_height) = source.dimensions();
    let mut src_pixels = allocate_canvas(src_width, src_height)?;
    src_pixels.extend_from_slice(source.as_raw());

    // U8x4 samples are byte-aligned, so an owned buffer is always accepted.
    let mut current =
        fir::images::Image::from_vec_u8(src_width, src_height, src_pixels, PixelType::U8x4)
            .map_err(|e| ChainError::Resampler(format!("fir source image error: {e:?}")))?;

    let needs_premultiply = !is_fully_opaque(&current, src_width, src_height);
    let mul_div = MulDiv::default();
    if needs_premultiply {
        mul_div
            .multiply_alpha_inplace(&mut current)
            .map_err(|e| ChainError::Resampler(format!("failed to premultiply alpha: {e}")))?;
    }

    let options = ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir_filter(filter)))
        .use_alpha(false);
    let mut resizer = fir::Resizer::new();

    for &(w, h) in steps {
        let buffer = allocate_zeroed(w, h)?;
        let mut next = fir::images::Image::from_vec_u8(w, h, buffer, PixelType::U8x4)
            .map_err(|e| ChainError::Resampler(format!("fir destination error: {e:?}")))?;
        resizer
            .resize(&current, &mut next, &options)
            .map_err(|e| ChainError::Resampler(format!("fir resize error: {e:?}")))?;
        current = next;
    }

    if needs_premultiply {
        mul_div
            .divide_alpha_inplace(&mut current)
            .map_err(|e| ChainError::Resampler(format!("failed to unpremultiply alpha: {e}")))?;
    }

    let (width, height) = (current.width(), current.height());
    RgbaImage::from_raw(width, height, current.into_vec()).ok_or_else(|| {
        ChainError::Resampler("failed to create rgba image from resized data".to_string())
    })
}

fn resample_chain_with_image_crate(
    source: &RgbaImage,
    steps: &[(u32, u32)],
    filter: ResampleFilter,
) -> PipelineResult<RgbaImage> {
    let filter = image_filter(filter);
    let mut current: Option<RgbaImage> = None;
    for &(w, h) in steps {
        // Surface the allocation failure before imageops allocates internally.
        drop(allocate_canvas(w, h)?);
        let input = current.as_ref().unwrap_or(source);
        current = Some(imageops::resize(input, w, h, filter));
    }
    current.ok_or_else(|| {
        ResizerError::resize_failed(
            source.dimensions(),
            source.dimensions(),
            "empty resize plan",
        )
    })
}

/// Check if an RGBA image is fully opaque (all alpha values are 255)
///
/// Only checks images ≥1MP - for smaller images, the check overhead exceeds
/// the premultiply cost (SIMD premultiply is very fast for small images)
fn is_fully_opaque(image: &fir::images::Image, width: u32, height: u32) -> bool {
    const THRESHOLD_PIXELS: u64 = 1_000_000;
    if (width as u64).saturating_mul(height as u64) < THRESHOLD_PIXELS {
        return false; // Assume not opaque, do premultiply (it's fast anyway)
    }
    image.buffer().iter().skip(3).step_by(4).all(|&alpha| alpha == 255)
}
