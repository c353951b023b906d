// src/engine.rs
//
// The resize engine: decode, step-down resize, crop, encode.
// This file is a facade over the modules in engine/.

// =============================================================================
// INPUT LIMITS
// =============================================================================

/// Maximum allowed image dimension (width or height), for inputs and targets.
pub use crate::ops::MAX_DIMENSION;

/// Maximum accepted input file size: 10 MiB.
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

// =============================================================================
// MODULE DECOMPOSITION
// =============================================================================

mod common;
mod decoder;
mod encoder;
mod io;
mod pipeline;
mod pool;
mod tasks;

pub use common::run_with_panic_policy;
pub use decoder::{
    check_dimensions, decode_image, decode_raster, detect_exif_orientation, detect_format,
};
pub use encoder::{encode_png, PngSettings, MAX_OPTIMIZE_LEVEL};
pub use io::{sniff_mime, ImageFile, Source};
pub use pipeline::{crop, orient, plan_steps, resize, resize_to};
pub use pool::{configured_threads, THREADS_ENV};
pub use tasks::{write_atomic, RenderJob, RenderOutcome, RenderQueue, RequestId};

pub(crate) use pool::install as install_in_pool;
