// src/state.rs
//
// Application state owned by the editor session.
//
// Three images are tracked:
// - origin: the image as first loaded (auto-oriented). Crops and resets
//   always start from it.
// - base: the working image resizes are derived from. Load, crop, reset and
//   history restores replace it; a resize does not, so repeated resizes never
//   compound resampling loss.
// - display: what the user currently sees and what history snapshots.
//
// Every mutation goes through a method that notifies subscribers.

use crate::error::{ResizerError, Result};
use crate::history::{HistoryState, HistoryTarget};
use crate::ops::Dimensions;
use crate::raster::Raster;
use std::fmt;
use tracing::debug;

/// What changed in an `AppState`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateChange {
    /// A new image replaced everything.
    Loaded(Dimensions),
    /// The displayed image changed (resize result).
    Displayed(Dimensions),
    /// Display and working base changed together (crop, reset).
    Rebased(Dimensions),
    /// The dimension fields changed, before any render.
    Target(Dimensions),
    LockToggled(bool),
    /// A history entry was applied.
    Restored(Dimensions),
    Cleared,
}

/// Handle returned by `AppState::subscribe`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&StateChange) + Send>;

struct Loaded {
    origin: Raster,
    origin_dimensions: Dimensions,
    base: Raster,
    display: Raster,
    display_dimensions: Dimensions,
    /// Values in the width/height fields. Differs from the displayed size
    /// while a render is pending.
    target: Dimensions,
}

pub struct AppState {
    loaded: Option<Loaded>,
    aspect_locked: bool,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("origin", &self.origin_dimensions())
            .field("display", &self.display_dimensions())
            .field("target", &self.target())
            .field("aspect_locked", &self.aspect_locked)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            loaded: None,
            aspect_locked: true,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Register an observer. It is called after every mutation.
    pub fn subscribe<F>(&mut self, subscriber: F) -> SubscriptionId
    where
        F: FnMut(&StateChange) + Send + 'static,
    {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    fn emit(&mut self, change: StateChange) {
        debug!(target: "image_resizer::state", ?change, "state changed");
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(&change);
        }
    }

    fn loaded_mut(&mut self) -> Result<&mut Loaded> {
        self.loaded.as_mut().ok_or_else(ResizerError::no_image_loaded)
    }

    /// Replace everything with a freshly loaded image.
    pub fn load(&mut self, image: Raster) -> Result<Dimensions> {
        let dimensions = image.dimensions()?;
        self.loaded = Some(Loaded {
            origin: image.clone(),
            origin_dimensions: dimensions,
            base: image.clone(),
            display: image,
            display_dimensions: dimensions,
            target: dimensions,
        });
        self.emit(StateChange::Loaded(dimensions));
        Ok(dimensions)
    }

    /// Show a rendered image. The working base is kept.
    pub fn set_display(&mut self, image: Raster) -> Result<Dimensions> {
        let dimensions = image.dimensions()?;
        let loaded = self.loaded_mut()?;
        loaded.display = image;
        loaded.display_dimensions = dimensions;
        loaded.target = dimensions;
        self.emit(StateChange::Displayed(dimensions));
        Ok(dimensions)
    }

    /// Show `image` and make it the working base.
    pub fn rebase(&mut self, image: Raster) -> Result<Dimensions> {
        let dimensions = image.dimensions()?;
        let loaded = self.loaded_mut()?;
        loaded.base = image.clone();
        loaded.display = image;
        loaded.display_dimensions = dimensions;
        loaded.target = dimensions;
        self.emit(StateChange::Rebased(dimensions));
        Ok(dimensions)
    }

    /// Record the requested size without rendering.
    pub fn set_target(&mut self, target: Dimensions) -> Result<()> {
        self.loaded_mut()?.target = target;
        self.emit(StateChange::Target(target));
        Ok(())
    }

    pub fn set_aspect_locked(&mut self, locked: bool) {
        if self.aspect_locked != locked {
            self.aspect_locked = locked;
            self.emit(StateChange::LockToggled(locked));
        }
    }

    pub fn toggle_aspect_lock(&mut self) -> bool {
        self.set_aspect_locked(!self.aspect_locked);
        self.aspect_locked
    }

    /// Forget the loaded image. The lock preference survives.
    pub fn clear(&mut self) {
        if self.loaded.take().is_some() {
            self.emit(StateChange::Cleared);
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn aspect_locked(&self) -> bool {
        self.aspect_locked
    }

    pub fn origin(&self) -> Option<&Raster> {
        self.loaded.as_ref().map(|l| &l.origin)
    }

    pub fn origin_dimensions(&self) -> Option<Dimensions> {
        self.loaded.as_ref().map(|l| l.origin_dimensions)
    }

    pub fn base(&self) -> Option<&Raster> {
        self.loaded.as_ref().map(|l| &l.base)
    }

    /// Size of the working base; the aspect ratio the lock follows.
    pub fn base_dimensions(&self) -> Option<Dimensions> {
        self.loaded
            .as_ref()
            .and_then(|l| Dimensions::new(l.base.width(), l.base.height()).ok())
    }

    pub fn display(&self) -> Option<&Raster> {
        self.loaded.as_ref().map(|l| &l.display)
    }

    pub fn display_dimensions(&self) -> Option<Dimensions> {
        self.loaded.as_ref().map(|l| l.display_dimensions)
    }

    pub fn target(&self) -> Option<Dimensions> {
        self.loaded.as_ref().map(|l| l.target)
    }
}

impl HistoryTarget for AppState {
    /// The entry becomes both the display and the working base, and the
    /// origin it was recorded with comes back.
    fn apply_history(&mut self, entry: &HistoryState) -> Result<()> {
        let origin_dimensions = entry.origin.dimensions()?;
        let loaded = self.loaded_mut()?;
        loaded.origin = entry.origin.clone();
        loaded.origin_dimensions = origin_dimensions;
        loaded.base = entry.image.clone();
        loaded.display = entry.image.clone();
        loaded.display_dimensions = entry.dimensions;
        loaded.target = entry.dimensions;
        self.emit(StateChange::Restored(entry.dimensions));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Instant;

    fn raster(w: u32, h: u32) -> Raster {
        Raster::filled(w, h, [10, 20, 30, 255]).unwrap()
    }

    fn dims(w: u32, h: u32) -> Dimensions {
        Dimensions::new(w, h).unwrap()
    }

    fn recording(state: &mut AppState) -> Arc<Mutex<Vec<StateChange>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        state.subscribe(move |change| sink.lock().push(*change));
        seen
    }

    #[test]
    fn starts_empty_and_locked() {
        let state = AppState::new();
        assert!(!state.is_loaded());
        assert!(state.aspect_locked());
        assert_eq!(state.display_dimensions(), None);
    }

    #[test]
    fn load_sets_every_image() {
        let mut state = AppState::new();
        let seen = recording(&mut state);
        let img = raster(40, 30);
        state.load(img.clone()).unwrap();
        assert!(state.origin().unwrap().shares_storage(&img));
        assert!(state.base().unwrap().shares_storage(&img));
        assert!(state.display().unwrap().shares_storage(&img));
        assert_eq!(state.target(), Some(dims(40, 30)));
        assert_eq!(*seen.lock(), vec![StateChange::Loaded(dims(40, 30))]);
    }

    #[test]
    fn set_display_keeps_base() {
        let mut state = AppState::new();
        let original = raster(40, 30);
        state.load(original.clone()).unwrap();
        state.set_display(raster(20, 15)).unwrap();
        assert_eq!(state.display_dimensions(), Some(dims(20, 15)));
        assert!(state.base().unwrap().shares_storage(&original));
        assert_eq!(state.base_dimensions(), Some(dims(40, 30)));
    }

    #[test]
    fn rebase_moves_base() {
        let mut state = AppState::new();
        state.load(raster(40, 30)).unwrap();
        let cropped = raster(10, 10);
        state.rebase(cropped.clone()).unwrap();
        assert!(state.base().unwrap().shares_storage(&cropped));
        assert_eq!(state.origin_dimensions(), Some(dims(40, 30)));
    }

    #[test]
    fn mutations_without_image_fail() {
        let mut state = AppState::new();
        assert!(matches!(
            state.set_display(raster(2, 2)),
            Err(ResizerError::NoImageLoaded)
        ));
        assert!(state.set_target(dims(2, 2)).is_err());
    }

    #[test]
    fn lock_toggle_notifies_once_per_change() {
        let mut state = AppState::new();
        let seen = recording(&mut state);
        state.set_aspect_locked(true);
        assert!(!state.toggle_aspect_lock());
        assert_eq!(*seen.lock(), vec![StateChange::LockToggled(false)]);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let mut state = AppState::new();
        let seen = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&seen);
        let id = state.subscribe(move |_| *counter.lock() += 1);
        state.load(raster(4, 4)).unwrap();
        assert!(state.unsubscribe(id));
        assert!(!state.unsubscribe(id));
        state.clear();
        assert_eq!(*seen.lock(), 1);
    }

    #[test]
    fn history_restore_sets_display_base_and_origin() {
        let mut state = AppState::new();
        state.load(raster(40, 30)).unwrap();
        let entry = HistoryState {
            image: raster(8, 6),
            dimensions: dims(8, 6),
            origin: raster(80, 60),
            created_at: Instant::now(),
        };
        state.apply_history(&entry).unwrap();
        assert_eq!(state.display_dimensions(), Some(dims(8, 6)));
        assert_eq!(state.base_dimensions(), Some(dims(8, 6)));
        assert_eq!(state.origin_dimensions(), Some(dims(80, 60)));
    }
}
