// src/presets.rs
//
// Persisted user presets and UI settings.
//
// Storage is a flat string key-value store, so the same data can live in
// memory (tests, embedding) or in a JSON file next to the user's config.
// Presets are stored as one JSON array under `imageResizer_presets`.

use crate::engine::write_atomic;
use crate::error::{ResizerError, Result};
use crate::ops::{AspectRatio, Dimensions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

pub const PRESETS_KEY: &str = "imageResizer_presets";
pub const THEME_KEY: &str = "theme";
pub const ACTIVE_TAB_KEY: &str = "activeTab";

/// Tab shown when nothing was saved yet.
pub const DEFAULT_TAB: &str = "aspect-ratios";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// A JSON object on disk, rewritten atomically on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStore {
    /// Open `path`. A missing file is an empty store; an unreadable one is
    /// replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(
                    target: "image_resizer::presets",
                    path = %path.display(),
                    error = %e,
                    "ignoring corrupt store"
                );
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(ResizerError::file_read_failed(path.display().to_string(), e)),
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, key: &str) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.values)
            .map_err(|e| ResizerError::storage_failed(key.to_string(), e.to_string()))?;
        write_atomic(&self.path, &json)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.persist(key)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.values.remove(key).is_some() {
            self.persist(key)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetKind {
    /// Exact width and height.
    #[serde(rename = "size")]
    Fixed,
    /// Width and height read as a ratio.
    Ratio,
}

impl FromStr for PresetKind {
    type Err = ResizerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "size" | "fixed" => Ok(PresetKind::Fixed),
            "ratio" => Ok(PresetKind::Ratio),
            other => Err(ResizerError::invalid_argument(
                "kind",
                other.to_string(),
                "expected 'size' or 'ratio'",
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PresetKind,
    pub width: u32,
    pub height: u32,
    /// `"w:h"` for ratio presets.
    #[serde(default)]
    pub ratio: Option<String>,
    /// Unix milliseconds.
    #[serde(rename = "timestamp", default)]
    pub created_at: u64,
}

impl Preset {
    pub fn new(name: &str, kind: PresetKind, width: u32, height: u32) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ResizerError::invalid_preset("Please enter a preset name"));
        }
        if width == 0 || height == 0 {
            return Err(ResizerError::invalid_preset("Please set dimensions first"));
        }
        Ok(Self {
            name: name.to_string(),
            kind,
            width,
            height,
            ratio: (kind == PresetKind::Ratio).then(|| format!("{width}:{height}")),
            created_at: unix_millis(),
        })
    }

    /// Target size when applied. Fixed presets give their own size; ratio
    /// presets keep the current width and derive the height.
    pub fn resolve(&self, current: Option<Dimensions>) -> Dimensions {
        match self.kind {
            PresetKind::Fixed => Dimensions::clamped(self.width as u64, self.height as u64),
            PresetKind::Ratio => {
                let ratio = self
                    .ratio
                    .as_deref()
                    .and_then(|r| r.parse::<AspectRatio>().ok())
                    .unwrap_or_else(|| AspectRatio::new(self.width, self.height));
                let width = current.map_or(self.width, |d| d.width());
                ratio.apply_to_width(width)
            }
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, &self.ratio) {
            (PresetKind::Ratio, Some(ratio)) => write!(f, "{} (Ratio: {ratio})", self.name),
            _ => write!(f, "{} (Size: {}x{})", self.name, self.width, self.height),
        }
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Ordered preset list backed by a store.
pub struct PresetManager<S: KeyValueStore> {
    store: S,
    presets: Vec<Preset>,
}

impl<S: KeyValueStore> PresetManager<S> {
    /// Load the saved list. Unparseable data starts an empty list.
    pub fn load(store: S) -> Result<Self> {
        let presets = match store.get(PRESETS_KEY)? {
            Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!(target: "image_resizer::presets", error = %e, "discarding unreadable presets");
                Vec::new()
            }),
            None => Vec::new(),
        };
        debug!(target: "image_resizer::presets", count = presets.len(), "presets loaded");
        Ok(Self { store, presets })
    }

    fn save(&mut self) -> Result<()> {
        let json = serde_json::to_string(&self.presets)
            .map_err(|e| ResizerError::storage_failed(PRESETS_KEY, e.to_string()))?;
        self.store.set(PRESETS_KEY, &json)
    }

    pub fn add(&mut self, name: &str, kind: PresetKind, width: u32, height: u32) -> Result<&Preset> {
        let preset = Preset::new(name, kind, width, height)?;
        self.presets.push(preset);
        if let Err(e) = self.save() {
            self.presets.pop();
            return Err(e);
        }
        let index = self.presets.len() - 1;
        Ok(&self.presets[index])
    }

    pub fn remove(&mut self, index: usize) -> Result<Preset> {
        if index >= self.presets.len() {
            return Err(ResizerError::preset_not_found(index));
        }
        let removed = self.presets.remove(index);
        if let Err(e) = self.save() {
            self.presets.insert(index, removed);
            return Err(e);
        }
        Ok(removed)
    }

    /// Target dimensions for the preset at `index`.
    pub fn apply(&self, index: usize, current: Option<Dimensions>) -> Result<Dimensions> {
        self.get(index)
            .map(|p| p.resolve(current))
            .ok_or_else(|| ResizerError::preset_not_found(index))
    }

    pub fn get(&self, index: usize) -> Option<&Preset> {
        self.presets.get(index)
    }

    pub fn list(&self) -> &[Preset] {
        &self.presets
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// Theme and last settings tab, stored as plain strings.
pub struct Settings<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> Settings<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Anything other than `dark` reads as light.
    pub fn theme(&self) -> Result<Theme> {
        Ok(match self.store.get(THEME_KEY)?.as_deref() {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        })
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        self.store.set(THEME_KEY, theme.as_str())
    }

    pub fn toggle_theme(&mut self) -> Result<Theme> {
        let next = self.theme()?.toggled();
        self.set_theme(next)?;
        Ok(next)
    }

    pub fn active_tab(&self) -> Result<String> {
        Ok(self
            .store
            .get(ACTIVE_TAB_KEY)?
            .unwrap_or_else(|| DEFAULT_TAB.to_string()))
    }

    pub fn set_active_tab(&mut self, tab: &str) -> Result<()> {
        self.store.set(ACTIVE_TAB_KEY, tab)
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
