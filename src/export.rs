// src/export.rs
//
// Single-image export and zipped size packages.
//
// Archive layout:
//   resized-images/resized-{w}x{h}.png
//   icons/ios/ios-icon-{w}x{h}.png
//   icons/android/android-icon-{w}x{h}.png
//   icons/favicon/favicon-{w}x{h}.png      (width <= 64)
//   icons/favicon/web-icon-{w}x{h}.png     (width > 64)

use crate::engine::{encode_png, install_in_pool, resize_to, write_atomic, PngSettings};
use crate::error::{ResizerError, Result};
use crate::ops::{Dimensions, ResampleFilter};
use crate::raster::Raster;
use bitflags::bitflags;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fmt;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// File name of a single exported image.
pub const SINGLE_EXPORT_NAME: &str = "resized-image.png";

/// Favicons up to this width keep the `favicon-` prefix.
const FAVICON_MAX_WIDTH: u32 = 64;

pub const COMMON_SIZES: &[(u32, u32)] = &[
    (1920, 1080),
    (1280, 720),
    (1080, 1920),
    (1080, 1080),
    (800, 600),
    (640, 480),
];

pub const IOS_ICON_SIZES: &[u32] = &[1024, 180, 167, 152, 120, 87, 80, 76, 60, 58, 40, 29, 20];

pub const ANDROID_ICON_SIZES: &[u32] = &[512, 192, 144, 96, 72, 48, 36];

pub const WEB_ICON_SIZES: &[u32] = &[256, 128, 96, 64, 48, 32, 16];

bitflags! {
    /// Which built-in size groups go into a package.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ExportSelection: u8 {
        const COMMON = 0b01;
        const ICONS  = 0b10;
    }
}

impl ExportSelection {
    /// Every built-in size for the selected groups.
    pub fn sizes(self) -> Vec<ExportSize> {
        let mut sizes = Vec::new();
        if self.contains(ExportSelection::COMMON) {
            sizes.extend(
                COMMON_SIZES
                    .iter()
                    .map(|&(w, h)| ExportSize::new(SizeCategory::Common, w, h)),
            );
        }
        if self.contains(ExportSelection::ICONS) {
            for (category, edges) in [
                (SizeCategory::Ios, IOS_ICON_SIZES),
                (SizeCategory::Android, ANDROID_ICON_SIZES),
                (SizeCategory::Web, WEB_ICON_SIZES),
            ] {
                sizes.extend(edges.iter().map(|&edge| ExportSize::new(category, edge, edge)));
            }
        }
        sizes
    }
}

/// Group a size belongs to; decides folder and file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeCategory {
    Common,
    Ios,
    Android,
    /// Favicons and other web icons.
    Web,
}

impl SizeCategory {
    pub fn is_icon(&self) -> bool {
        !matches!(self, SizeCategory::Common)
    }

    fn folder(&self) -> &'static str {
        match self {
            SizeCategory::Common => "resized-images",
            SizeCategory::Ios => "icons/ios",
            SizeCategory::Android => "icons/android",
            SizeCategory::Web => "icons/favicon",
        }
    }

    fn prefix(&self, width: u32) -> &'static str {
        match self {
            SizeCategory::Common => "resized",
            SizeCategory::Ios => "ios-icon",
            SizeCategory::Android => "android-icon",
            SizeCategory::Web if width <= FAVICON_MAX_WIDTH => "favicon",
            SizeCategory::Web => "web-icon",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExportSize {
    pub category: SizeCategory,
    pub dimensions: Dimensions,
}

impl ExportSize {
    /// Built-in catalog entries are always in range; out-of-range values clamp.
    pub fn new(category: SizeCategory, width: u32, height: u32) -> Self {
        Self {
            category,
            dimensions: Dimensions::clamped(width as u64, height as u64),
        }
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}-{}.png",
            self.category.prefix(self.dimensions.width()),
            self.dimensions
        )
    }

    /// Path of the entry inside the archive.
    pub fn entry_path(&self) -> String {
        format!("{}/{}", self.category.folder(), self.file_name())
    }
}

impl fmt::Display for ExportSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.entry_path())
    }
}

/// Archive name for a set of sizes, or `EmptySelection`.
pub fn archive_name(sizes: &[ExportSize]) -> Result<&'static str> {
    let icons = sizes.iter().any(|s| s.category.is_icon());
    let common = sizes.iter().any(|s| !s.category.is_icon());
    match (common, icons) {
        (true, true) => Ok("image-package.zip"),
        (true, false) => Ok("resized-images.zip"),
        (false, true) => Ok("icon-package.zip"),
        (false, false) => Err(ResizerError::empty_selection()),
    }
}

/// Archive entries in order, duplicates removed.
pub fn plan_entries(sizes: &[ExportSize]) -> Result<Vec<ExportSize>> {
    if sizes.is_empty() {
        return Err(ResizerError::empty_selection());
    }
    let mut seen = HashSet::new();
    Ok(sizes
        .iter()
        .copied()
        .filter(|size| seen.insert(size.entry_path()))
        .collect())
}

/// A file ready to be saved.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ExportFile {
    /// Save under `dir` with the export's own name.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.name);
        write_atomic(&path, &self.bytes)?;
        Ok(path)
    }
}

/// A zipped package and the paths it contains.
#[derive(Debug, Clone)]
pub struct ExportPackage {
    pub file: ExportFile,
    pub entries: Vec<String>,
}

impl ExportPackage {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// PNG of `image` as `resized-image.png`.
pub fn export_single(image: &Raster, png: PngSettings) -> Result<ExportFile> {
    Ok(ExportFile {
        name: SINGLE_EXPORT_NAME.to_string(),
        bytes: encode_png(image, png)?,
    })
}

/// Resize `source` to every size and zip the results.
///
/// Variants render in parallel on the worker pool; the archive keeps the
/// order of `sizes`. Any failure aborts the whole package.
pub fn build_package(
    source: &Raster,
    sizes: &[ExportSize],
    filter: ResampleFilter,
    png: PngSettings,
) -> Result<ExportPackage> {
    let name = archive_name(sizes)?;
    let entries = plan_entries(sizes)?;
    let started = Instant::now();

    let rendered: Vec<(String, Vec<u8>)> = install_in_pool(|| {
        entries
            .par_iter()
            .map(|size| {
                let image = resize_to(source, size.dimensions, filter)?;
                Ok((size.entry_path(), encode_png(&image, png)?))
            })
            .collect::<Result<Vec<_>>>()
    })?;

    let bytes = zip_entries(&rendered)?;
    info!(
        target: "image_resizer::export",
        archive = name,
        files = rendered.len(),
        bytes = bytes.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "package built"
    );

    Ok(ExportPackage {
        file: ExportFile {
            name: name.to_string(),
            bytes,
        },
        entries: rendered.into_iter().map(|(path, _)| path).collect(),
    })
}

fn zip_entries(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let zip_error = |e: zip::result::ZipError| ResizerError::encode_failed("zip", e.to_string());
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut folders = HashSet::new();
    for (path, data) in files {
        // Explicit folder entries, so the tree shows up even in picky unzippers.
        let mut prefix = String::new();
        if let Some((dirs, _)) = path.rsplit_once('/') {
            for part in dirs.split('/') {
                prefix.push_str(part);
                prefix.push('/');
                if folders.insert(prefix.clone()) {
                    zip.add_directory(prefix.as_str(), options).map_err(zip_error)?;
                }
            }
        }
        zip.start_file(path.as_str(), options).map_err(zip_error)?;
        zip.write_all(data)
            .map_err(|e| ResizerError::encode_failed("zip", e.to_string()))?;
        debug!(target: "image_resizer::export", path = %path, bytes = data.len(), "entry added");
    }

    let cursor = zip.finish().map_err(zip_error)?;
    Ok(cursor.into_inner())
}
