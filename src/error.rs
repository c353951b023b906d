// src/error.rs
//
// One error type for the whole crate. Every variant belongs to a category,
// and the category decides how the session presents it: user mistakes come
// back as warnings, everything else as errors.

use std::borrow::Cow;
use std::sync::Arc;
use thiserror::Error;

/// Error taxonomy used to route errors to the right notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCategory {
    /// Bad input the user can correct.
    UserError,
    /// The bytes could not be decoded or encoded.
    CodecError,
    /// Size caps, allocation and disk failures.
    ResourceLimit,
    /// A broken invariant inside the crate.
    InternalBug,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::UserError => "UserError",
            ErrorCategory::CodecError => "CodecError",
            ErrorCategory::ResourceLimit => "ResourceLimit",
            ErrorCategory::InternalBug => "InternalBug",
        }
    }
}

/// image-resizer error types
///
/// Messages are written for the person at the keyboard: they are shown
/// verbatim in notifications.
#[derive(Debug, Clone, Error)]
pub enum ResizerError {
    // Input validation
    #[error("Please select an image file")]
    MissingFile,

    #[error("Selected file must be an image (got '{mime}')")]
    UnsupportedMime { mime: Cow<'static, str> },

    #[error("Image size must be less than {max_mb}MB (got {size} bytes)")]
    FileTooLarge { size: u64, max_mb: u64 },

    #[error("Both width and height are required")]
    DimensionRequired,

    #[error("Invalid {axis} {value}: dimensions must be between 1 and {max} pixels")]
    InvalidDimension {
        axis: Cow<'static, str>,
        value: u64,
        max: u32,
    },

    // File I/O Errors
    #[error("File not found: {path}")]
    FileNotFound { path: Cow<'static, str> },

    #[error("Failed to read file '{path}': {source}")]
    FileReadFailed {
        path: Cow<'static, str>,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("Failed to memory-map file '{path}': {source}")]
    MmapFailed {
        path: Cow<'static, str>,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWriteFailed {
        path: Cow<'static, str>,
        #[source]
        source: Arc<std::io::Error>,
    },

    // Decode Errors
    #[error("Unsupported image format: {format}")]
    UnsupportedFormat { format: Cow<'static, str> },

    #[error("Failed to decode image: {message}")]
    DecodeFailed { message: Cow<'static, str> },

    // Size Limit Errors
    #[error("Image dimensions too large: {dimension} exceeds maximum {max}")]
    DimensionExceedsLimit { dimension: u32, max: u32 },

    #[error("Canvas not available for {width}x{height}: {message}")]
    CanvasUnavailable {
        width: u32,
        height: u32,
        message: Cow<'static, str>,
    },

    // Operation Errors
    #[error("Crop origin ({x}, {y}) with size {width}x{height} is outside the {img_width}x{img_height} image")]
    InvalidCropRegion {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        img_width: u32,
        img_height: u32,
    },

    #[error("Crop area too small ({width}x{height}, minimum {min}px)")]
    CropTooSmall { width: u32, height: u32, min: u32 },

    #[error("Resize failed ({source_width}x{source_height} -> {target_width}x{target_height}): {message}")]
    ResizeFailed {
        source_width: u32,
        source_height: u32,
        target_width: u32,
        target_height: u32,
        message: Cow<'static, str>,
    },

    // Encode Errors
    #[error("Failed to encode as {format}: {message}")]
    EncodeFailed {
        format: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    // Presets, export and storage
    #[error("Invalid preset: {reason}")]
    InvalidPreset { reason: Cow<'static, str> },

    #[error("No preset at index {index}")]
    PresetNotFound { index: usize },

    #[error("Please select at least one size to download")]
    EmptySelection,

    #[error("Failed to persist '{key}': {message}")]
    StorageFailed {
        key: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: Cow<'static, str> },

    #[error("Invalid value for {name}: {value}. {reason}")]
    InvalidArgument {
        name: Cow<'static, str>,
        value: Cow<'static, str>,
        reason: Cow<'static, str>,
    },

    // State Errors
    #[error("Please load an image first")]
    NoImageLoaded,

    #[error("Error applying changes: {message}")]
    HistoryApply { message: Cow<'static, str> },

    // Internal Errors
    #[error("Internal error: {message}")]
    InternalPanic { message: Cow<'static, str> },
}

// Constructor Helpers
impl ResizerError {
    pub fn missing_file() -> Self {
        Self::MissingFile
    }

    pub fn unsupported_mime(mime: impl Into<Cow<'static, str>>) -> Self {
        Self::UnsupportedMime { mime: mime.into() }
    }

    pub fn file_too_large(size: u64, max_bytes: u64) -> Self {
        Self::FileTooLarge {
            size,
            max_mb: max_bytes / (1024 * 1024),
        }
    }

    pub fn dimension_required() -> Self {
        Self::DimensionRequired
    }

    pub fn invalid_dimension(axis: impl Into<Cow<'static, str>>, value: u64, max: u32) -> Self {
        Self::InvalidDimension {
            axis: axis.into(),
            value,
            max,
        }
    }

    pub fn file_not_found(path: impl Into<Cow<'static, str>>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn file_read_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub fn mmap_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::MmapFailed {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub fn file_write_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::FileWriteFailed {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub fn unsupported_format(format: impl Into<Cow<'static, str>>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn decode_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn dimension_exceeds_limit(dimension: u32, max: u32) -> Self {
        Self::DimensionExceedsLimit { dimension, max }
    }

    pub fn canvas_unavailable(
        width: u32,
        height: u32,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::CanvasUnavailable {
            width,
            height,
            message: message.into(),
        }
    }

    pub fn invalid_crop_region(
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        img_width: u32,
        img_height: u32,
    ) -> Self {
        Self::InvalidCropRegion {
            x,
            y,
            width,
            height,
            img_width,
            img_height,
        }
    }

    pub fn crop_too_small(width: u32, height: u32, min: u32) -> Self {
        Self::CropTooSmall { width, height, min }
    }

    pub fn resize_failed(
        source_dims: (u32, u32),
        target_dims: (u32, u32),
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::ResizeFailed {
            source_width: source_dims.0,
            source_height: source_dims.1,
            target_width: target_dims.0,
            target_height: target_dims.1,
            message: message.into(),
        }
    }

    pub fn encode_failed(
        format: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn invalid_preset(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidPreset {
            reason: reason.into(),
        }
    }

    pub fn preset_not_found(index: usize) -> Self {
        Self::PresetNotFound { index }
    }

    pub fn empty_selection() -> Self {
        Self::EmptySelection
    }

    pub fn storage_failed(
        key: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::StorageFailed {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn invalid_config(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn invalid_argument(
        name: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn no_image_loaded() -> Self {
        Self::NoImageLoaded
    }

    pub fn history_apply(message: impl Into<Cow<'static, str>>) -> Self {
        Self::HistoryApply {
            message: message.into(),
        }
    }

    pub fn internal_panic(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InternalPanic {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (user can fix it)
    ///
    /// Consistent with category():
    /// - UserError and ResourceLimit errors are recoverable
    /// - CodecError and InternalBug errors are not
    pub fn is_recoverable(&self) -> bool {
        match self.category() {
            ErrorCategory::UserError | ErrorCategory::ResourceLimit => true,
            ErrorCategory::CodecError | ErrorCategory::InternalBug => false,
        }
    }

    /// Get the error category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingFile
            | Self::UnsupportedMime { .. }
            | Self::DimensionRequired
            | Self::InvalidDimension { .. }
            | Self::FileNotFound { .. }
            | Self::InvalidCropRegion { .. }
            | Self::CropTooSmall { .. }
            | Self::InvalidPreset { .. }
            | Self::PresetNotFound { .. }
            | Self::EmptySelection
            | Self::InvalidConfig { .. }
            | Self::InvalidArgument { .. }
            | Self::NoImageLoaded => ErrorCategory::UserError,

            Self::UnsupportedFormat { .. }
            | Self::DecodeFailed { .. }
            | Self::EncodeFailed { .. }
            | Self::ResizeFailed { .. } => ErrorCategory::CodecError,

            // File I/O failures usually mean disk pressure or permissions; the
            // user can fix those, so they sit with the other limits.
            Self::FileTooLarge { .. }
            | Self::DimensionExceedsLimit { .. }
            | Self::CanvasUnavailable { .. }
            | Self::FileReadFailed { .. }
            | Self::MmapFailed { .. }
            | Self::FileWriteFailed { .. }
            | Self::StorageFailed { .. } => ErrorCategory::ResourceLimit,

            Self::HistoryApply { .. } | Self::InternalPanic { .. } => ErrorCategory::InternalBug,
        }
    }
}

// Result type alias
pub type Result<T> = std::result::Result<T, ResizerError>;
