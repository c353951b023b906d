// src/validation.rs
//
// Input limits and boundary validation. Every raw value coming from the
// user (files, dimension fields, ratio fields) passes through here before
// it reaches the engine.

use crate::engine::{ImageFile, MAX_FILE_BYTES};
use crate::error::{ResizerError, Result};
use crate::ops::{Dimensions, MAX_DIMENSION};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Limits applied to user input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputLimits {
    /// Largest accepted file, in bytes.
    pub max_bytes: u64,
    /// Largest accepted width or height, in pixels. Never above MAX_DIMENSION.
    pub max_dimension: u32,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_bytes: MAX_FILE_BYTES,
            max_dimension: MAX_DIMENSION,
        }
    }
}

impl InputLimits {
    /// Tighter limits, e.g. for a preview-only embedding.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension.clamp(1, MAX_DIMENSION);
        self
    }

    /// Reject limits that could never accept an image.
    pub fn validate(&self) -> Result<()> {
        if self.max_bytes == 0 {
            return Err(ResizerError::invalid_config("max_bytes must be positive"));
        }
        if self.max_dimension == 0 || self.max_dimension > MAX_DIMENSION {
            return Err(ResizerError::invalid_config(format!(
                "max_dimension must be between 1 and {MAX_DIMENSION}"
            )));
        }
        Ok(())
    }

    /// Presence, MIME type and size of a selected file.
    pub fn check_file<'a>(&self, file: Option<&'a ImageFile>) -> Result<&'a ImageFile> {
        let file = file.ok_or_else(ResizerError::missing_file)?;
        if !file.mime().starts_with("image/") {
            return Err(ResizerError::unsupported_mime(file.mime().to_string()));
        }
        self.enforce_source_len(file.size()?)?;
        debug!(
            target: "image_resizer::validation",
            name = file.name(),
            mime = file.mime(),
            "file accepted"
        );
        Ok(file)
    }

    pub fn enforce_source_len(&self, len: u64) -> Result<()> {
        if len > self.max_bytes {
            return Err(ResizerError::file_too_large(len, self.max_bytes));
        }
        Ok(())
    }

    /// Natural image dimensions must not exceed the limit.
    pub fn enforce_dimensions(&self, width: u32, height: u32) -> Result<()> {
        if width > self.max_dimension || height > self.max_dimension {
            return Err(ResizerError::dimension_exceeds_limit(
                width.max(height),
                self.max_dimension,
            ));
        }
        Ok(())
    }

    /// Parse a raw dimension field.
    ///
    /// Leading integer semantics: surrounding whitespace is ignored and
    /// parsing stops at the first non-digit (`"120px"` is 120). Blank or
    /// non-numeric input is `DimensionRequired`, zero or negative is
    /// `InvalidDimension`, and anything above the limit clamps to it.
    pub fn parse_dimension(&self, axis: &'static str, raw: &str) -> Result<u32> {
        let value = parse_leading_int(raw).ok_or_else(ResizerError::dimension_required)?;
        if value <= 0 {
            return Err(ResizerError::invalid_dimension(
                axis,
                value.unsigned_abs(),
                self.max_dimension,
            ));
        }
        Ok(value.min(self.max_dimension as i64) as u32)
    }

    /// Strict check of a width/height pair without clamping.
    pub fn check_dimensions(&self, width: Option<i64>, height: Option<i64>) -> Result<Dimensions> {
        let (Some(width), Some(height)) = (width, height) else {
            return Err(ResizerError::dimension_required());
        };
        for (axis, value) in [("width", width), ("height", height)] {
            if value <= 0 || value > self.max_dimension as i64 {
                return Err(ResizerError::invalid_dimension(
                    axis,
                    value.unsigned_abs(),
                    self.max_dimension,
                ));
            }
        }
        Dimensions::new(width as u32, height as u32)
    }
}

/// Integer prefix of `raw`, or None when there are no leading digits.
fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // Saturate absurdly long inputs instead of failing; they clamp anyway.
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}
