// src/ops.rs
//
// Value types shared by the engine, the session and the CLI.
// These are cheap to create and copy - the expensive work happens in the engine.

use crate::error::{ResizerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest width or height accepted anywhere in the crate.
pub const MAX_DIMENSION: u32 = 8000;

/// Selections smaller than this (in display pixels) are rejected.
pub const MIN_CROP_DISPLAY_PX: f64 = 10.0;

/// Largest term accepted for a custom aspect ratio.
pub const MAX_RATIO_TERM: u32 = 100;

/// Validated image dimensions. Both axes are in `1..=MAX_DIMENSION`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDimensions", into = "RawDimensions")]
pub struct Dimensions {
    width: u32,
    height: u32,
}

#[derive(Serialize, Deserialize)]
struct RawDimensions {
    width: u32,
    height: u32,
}

impl TryFrom<RawDimensions> for Dimensions {
    type Error = ResizerError;

    fn try_from(raw: RawDimensions) -> Result<Self> {
        Dimensions::new(raw.width, raw.height)
    }
}

impl From<Dimensions> for RawDimensions {
    fn from(dims: Dimensions) -> Self {
        RawDimensions {
            width: dims.width,
            height: dims.height,
        }
    }
}

fn check_axis(axis: &'static str, value: u32) -> Result<u32> {
    if value == 0 || value > MAX_DIMENSION {
        return Err(ResizerError::invalid_dimension(
            axis,
            value as u64,
            MAX_DIMENSION,
        ));
    }
    Ok(value)
}

#[inline]
fn clamp_axis(value: u64) -> u32 {
    value.clamp(1, MAX_DIMENSION as u64) as u32
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Ok(Self {
            width: check_axis("width", width)?,
            height: check_axis("height", height)?,
        })
    }

    /// Build dimensions, pulling each axis into `1..=MAX_DIMENSION`.
    pub fn clamped(width: u64, height: u64) -> Self {
        Self {
            width: clamp_axis(width),
            height: clamp_axis(height),
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn as_tuple(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Pixel count, used for logging and pool heuristics.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Keep `width`, derive the height from this aspect ratio.
    pub fn fit_width(&self, width: u32) -> Self {
        let height = round_ratio(width as u64 * self.height as u64, self.width as u64);
        Self::clamped(width as u64, height)
    }

    /// Keep `height`, derive the width from this aspect ratio.
    pub fn fit_height(&self, height: u32) -> Self {
        let width = round_ratio(height as u64 * self.width as u64, self.height as u64);
        Self::clamped(width, height as u64)
    }

    /// Reduced ratio label, e.g. `16:9` for 1920x1080.
    pub fn ratio_label(&self) -> String {
        let g = gcd(self.width, self.height);
        format!("{}:{}", self.width / g, self.height / g)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Dimensions {
    type Err = ResizerError;

    /// Parses `WxH` (also accepts `×`).
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let (w, h) = trimmed
            .split_once(['x', 'X', '×'])
            .ok_or_else(|| {
                ResizerError::invalid_argument("size", trimmed.to_string(), "expected WIDTHxHEIGHT")
            })?;
        let parse = |axis: &'static str, raw: &str| {
            raw.trim().parse::<u32>().map_err(|_| {
                ResizerError::invalid_argument(axis, raw.trim().to_string(), "expected an integer")
            })
        };
        Dimensions::new(parse("width", w)?, parse("height", h)?)
    }
}

/// Integer division rounded half away from zero.
#[inline]
fn round_ratio(numerator: u64, denominator: u64) -> u64 {
    if denominator == 0 {
        return 0;
    }
    (numerator * 2 + denominator) / (denominator * 2)
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.max(1)
}

/// User-chosen aspect ratio. Terms are clamped to `1..=MAX_RATIO_TERM`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AspectRatio {
    width: u32,
    height: u32,
}

impl AspectRatio {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.clamp(1, MAX_RATIO_TERM),
            height: height.clamp(1, MAX_RATIO_TERM),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Dimensions with the given width and a height following this ratio.
    pub fn apply_to_width(&self, width: u32) -> Dimensions {
        let height = round_ratio(width as u64 * self.height as u64, self.width as u64);
        Dimensions::clamped(width as u64, height)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = ResizerError;

    fn from_str(s: &str) -> Result<Self> {
        let (w, h) = s.trim().split_once(':').ok_or_else(|| {
            ResizerError::invalid_argument("ratio", s.to_string(), "expected W:H")
        })?;
        let parse = |raw: &str| {
            raw.trim().parse::<u32>().map_err(|_| {
                ResizerError::invalid_argument("ratio", s.to_string(), "terms must be integers")
            })
        };
        Ok(AspectRatio::new(parse(w)?, parse(h)?))
    }
}

/// Crop rectangle in source-pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Convert a selection made on a scaled preview into source pixels.
    ///
    /// `selection` is `(x, y, width, height)` relative to the top-left of the
    /// displayed image; `displayed` is the on-screen size of the image and
    /// `natural` its real size. The selection may be dragged in any
    /// direction, so negative extents are normalized first.
    pub fn from_display(
        selection: (f64, f64, f64, f64),
        displayed: (f64, f64),
        natural: Dimensions,
    ) -> Result<Self> {
        let (mut sx, mut sy, mut sw, mut sh) = selection;
        if sw < 0.0 {
            sx += sw;
            sw = -sw;
        }
        if sh < 0.0 {
            sy += sh;
            sh = -sh;
        }
        if !(sw >= MIN_CROP_DISPLAY_PX && sh >= MIN_CROP_DISPLAY_PX) {
            return Err(ResizerError::crop_too_small(
                sw.max(0.0) as u32,
                sh.max(0.0) as u32,
                MIN_CROP_DISPLAY_PX as u32,
            ));
        }
        let (dw, dh) = displayed;
        if !(dw > 0.0 && dh > 0.0) {
            return Err(ResizerError::invalid_argument(
                "displayed",
                format!("{dw}x{dh}"),
                "displayed size must be positive",
            ));
        }

        let scale_x = natural.width() as f64 / dw;
        let scale_y = natural.height() as f64 / dh;
        let x = (sx * scale_x).max(0.0).round();
        let y = (sy * scale_y).max(0.0).round();
        let width = (sw * scale_x).round().max(1.0);
        let height = (sh * scale_y).round().max(1.0);

        Ok(Self {
            x: x.min(u32::MAX as f64) as u32,
            y: y.min(u32::MAX as f64) as u32,
            width: width.min(u32::MAX as f64) as u32,
            height: height.min(u32::MAX as f64) as u32,
        })
    }
}

/// Convolution filter used for every resample step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResampleFilter {
    Bilinear,
    /// Bicubic (Catmull-Rom), the closest match to a browser's "high" smoothing.
    #[default]
    CatmullRom,
    Lanczos3,
}

impl ResampleFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResampleFilter::Bilinear => "bilinear",
            ResampleFilter::CatmullRom => "catmull-rom",
            ResampleFilter::Lanczos3 => "lanczos3",
        }
    }
}

impl FromStr for ResampleFilter {
    type Err = ResizerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bilinear" | "linear" => Ok(Self::Bilinear),
            "catmull-rom" | "catmullrom" | "bicubic" | "cubic" => Ok(Self::CatmullRom),
            "lanczos3" | "lanczos" => Ok(Self::Lanczos3),
            other => Err(ResizerError::invalid_argument(
                "filter",
                other.to_string(),
                "expected bilinear, catmull-rom or lanczos3",
            )),
        }
    }
}

impl fmt::Display for ResampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
