// src/engine/io.rs
//
// I/O operations: Source enum, file loading, MIME sniffing

use crate::error::{ResizerError, Result};
use image::ImageFormat;
use memmap2::Mmap;
use std::borrow::Cow;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Image source - supports in-memory data, memory-mapped files, and file paths (lazy loading)
#[derive(Clone, Debug)]
pub enum Source {
    /// In-memory image data
    Memory(Arc<Vec<u8>>),
    /// Memory-mapped file (zero-copy access)
    Mapped(Arc<Mmap>),
    /// File path for lazy loading (data is read only when needed)
    Path(PathBuf),
}

impl Source {
    /// Map a file into memory.
    pub fn map(path: &Path) -> Result<Self> {
        let display = path.to_string_lossy().into_owned();
        if !path.exists() {
            return Err(ResizerError::file_not_found(display));
        }
        let file = File::open(path).map_err(|e| ResizerError::file_read_failed(display.clone(), e))?;
        // Mapping an empty file fails on some platforms; treat it as empty bytes.
        let len = file
            .metadata()
            .map_err(|e| ResizerError::file_read_failed(display.clone(), e))?
            .len();
        if len == 0 {
            return Ok(Source::Memory(Arc::new(Vec::new())));
        }
        // Safety: the file is assumed not to be truncated while mapped. The
        // session copies what it needs into a Raster right after decoding.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| ResizerError::mmap_failed(display, e))?;
        Ok(Source::Mapped(Arc::new(mmap)))
    }

    /// Load the actual bytes from the source.
    /// Memory and Mapped sources borrow; only Path sources read the file.
    pub fn load(&self) -> Result<Cow<'_, [u8]>> {
        match self {
            Source::Memory(data) => Ok(Cow::Borrowed(data.as_slice())),
            Source::Mapped(mmap) => Ok(Cow::Borrowed(mmap.as_ref())),
            Source::Path(path) => {
                let data = std::fs::read(path).map_err(|e| {
                    ResizerError::file_read_failed(path.to_string_lossy().into_owned(), e)
                })?;
                Ok(Cow::Owned(data))
            }
        }
    }

    /// Get path if this is a Path source
    pub fn as_path(&self) -> Option<&PathBuf> {
        match self {
            Source::Path(p) => Some(p),
            Source::Memory(_) | Source::Mapped(_) => None,
        }
    }

    /// Get the bytes directly - works for both Memory and Mapped sources
    /// Returns None only for Path sources (which need to be loaded first)
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Source::Memory(data) => Some(data.as_slice()),
            Source::Mapped(mmap) => Some(mmap.as_ref()),
            Source::Path(_) => None,
        }
    }

    /// Size in bytes. Path sources ask the filesystem.
    pub fn len(&self) -> Result<u64> {
        match self {
            Source::Memory(data) => Ok(data.len() as u64),
            Source::Mapped(mmap) => Ok(mmap.len() as u64),
            Source::Path(path) => std::fs::metadata(path)
                .map(|m| m.len())
                .map_err(|e| ResizerError::file_read_failed(path.to_string_lossy().into_owned(), e)),
        }
    }
}

/// A user-selected file: name, declared MIME type and contents.
#[derive(Clone, Debug)]
pub struct ImageFile {
    name: String,
    mime: String,
    source: Source,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, source: Source) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            source,
        }
    }

    /// In-memory file; the MIME type is sniffed from the bytes, then the name.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime = sniff_mime(&bytes, Some(Path::new(&name)));
        Self::new(name, mime, Source::Memory(Arc::new(bytes)))
    }

    /// Memory-map a file from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let source = Source::map(path)?;
        let mime = sniff_mime(source.as_bytes().unwrap_or_default(), Some(path));
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Ok(Self::new(name, mime, source))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn size(&self) -> Result<u64> {
        self.source.len()
    }

    pub fn bytes(&self) -> Result<Cow<'_, [u8]>> {
        self.source.load()
    }
}

/// Best-effort MIME type: magic bytes first, then the file extension.
pub fn sniff_mime(bytes: &[u8], path: Option<&Path>) -> String {
    if let Ok(format) = image::guess_format(bytes) {
        return format.to_mime_type().to_string();
    }
    path.and_then(|p| p.extension())
        .and_then(|ext| ImageFormat::from_extension(ext))
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}
