// lib.rs
//
// image-resizer: an image resizing engine with an editor session on top.
//
// Layers, bottom up:
// - engine: decode, step-down resize, crop, PNG encode, worker pool
// - history: bounded, debounced undo/redo
// - state / session: the editor a UI drives (validation, notifications)
// - presets / export: persisted presets, single PNG and zipped packages
//
// Design goals:
// - High-quality downscaling (halving steps, premultiplied alpha)
// - Nothing blocks the caller: renders run on the pool, edits are debounced
// - No operation is fatal to a session; errors become notifications

pub mod cli;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod export;
pub mod history;
pub mod notifications;
pub mod ops;
pub mod presets;
pub mod raster;
pub mod session;
pub mod state;
pub mod validation;

pub use config::EditorConfig;
pub use error::{ErrorCategory, ResizerError, Result};
pub use history::{History, HistoryConfig, HistoryState, Navigation, PushOutcome};
pub use ops::{AspectRatio, CropRegion, Dimensions, ResampleFilter, MAX_DIMENSION};
pub use raster::Raster;
pub use session::Editor;

/// Library version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
