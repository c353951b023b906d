// src/session.rs
//
// The editor session: single owner of state, history and the render queue.
//
// Raw input is validated here before anything reaches the engine. Every
// operation returns its Result for programmatic callers and also leaves a
// notification behind, so a UI only has to render `notifications()`.
//
// Nothing blocks: dimension edits are debounced, renders run on the worker
// pool, and `tick(now)` moves finished work into the state. `settle` is the
// blocking variant for headless callers.

use crate::config::EditorConfig;
use crate::debounce::{Clock, Debouncer, SystemClock};
use crate::engine::{
    self, decode_raster, run_with_panic_policy, ImageFile, RenderJob, RenderOutcome, RenderQueue,
    RequestId,
};
use crate::error::{ResizerError, Result};
use crate::export::{self, ExportFile, ExportPackage, ExportSize};
use crate::history::{History, Navigation};
use crate::notifications::{Notification, NotificationId, Notifications, Severity};
use crate::ops::{AspectRatio, CropRegion, Dimensions};
use crate::presets::Preset;
use crate::raster::Raster;
use crate::state::AppState;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub struct Editor<C: Clock = SystemClock> {
    config: EditorConfig,
    clock: C,
    state: AppState,
    history: History,
    renders: RenderQueue,
    resize_requests: Debouncer<Dimensions>,
    /// Renders up to this id were issued against a state that no longer
    /// exists (new image, reset, crop, undo/redo).
    discard_through: Option<RequestId>,
    notifications: Notifications,
}

impl Editor<SystemClock> {
    pub fn new(config: EditorConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> Editor<C> {
    pub fn with_clock(config: EditorConfig, clock: C) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            history: History::new(config.history),
            resize_requests: Debouncer::new(config.resize_debounce()),
            config,
            clock,
            state: AppState::new(),
            renders: RenderQueue::new(),
            discard_through: None,
            notifications: Notifications::new(),
        })
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Mutable access for subscribing observers.
    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        self.notifications.dismiss(id)
    }

    pub fn expire(&mut self, now: Instant) -> usize {
        self.notifications.expire(now)
    }

    /// True while a resize is debounced, a render is running, or a history
    /// snapshot is waiting for its window.
    pub fn is_busy(&self) -> bool {
        self.resize_requests.is_pending() || self.renders.in_flight() > 0 || self.history.has_pending()
    }

    // ---------------------------------------------------------------------
    // Notification helpers
    // ---------------------------------------------------------------------

    fn notify(&mut self, severity: Severity, message: impl Into<String>) -> NotificationId {
        let now = self.clock.now();
        self.notifications.push(Notification::new(severity, message, now))
    }

    /// Pass `result` through, turning an error into a notification.
    fn report<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            debug!(target: "image_resizer::session", error = %e, category = e.category().as_str(), "operation rejected");
            let now = self.clock.now();
            self.notifications.push(Notification::from_error(e, now));
        }
        result
    }

    fn loaded(&self) -> Result<()> {
        if self.state.is_loaded() {
            Ok(())
        } else {
            Err(ResizerError::no_image_loaded())
        }
    }

    /// Drop the debounced resize and make every render issued so far stale.
    fn invalidate_renders(&mut self) {
        self.resize_requests.cancel();
        if let Some(latest) = self.renders.latest() {
            self.discard_through = Some(latest);
        }
    }

    fn record(&mut self, image: Raster, dimensions: Dimensions, now: Instant) {
        if let Some(origin) = self.state.origin().cloned() {
            self.history.push(image, dimensions, origin, now);
        }
    }

    // ---------------------------------------------------------------------
    // Loading
    // ---------------------------------------------------------------------

    fn decode_file(&self, file: Option<&ImageFile>) -> Result<Raster> {
        let limits = &self.config.limits;
        let file = limits.check_file(file)?;
        let bytes = file.bytes()?;
        limits.enforce_source_len(bytes.len() as u64)?;
        let image = decode_raster(&bytes)?;
        limits.enforce_dimensions(image.width(), image.height())?;
        Ok(image)
    }

    /// Validate, decode and show `file`. History restarts with the new
    /// image as its baseline.
    pub fn load_image(&mut self, file: Option<&ImageFile>) -> Result<Dimensions> {
        let decoded = self.decode_file(file);
        let image = self.report(decoded)?;

        self.invalidate_renders();
        let loaded = self.state.load(image.clone());
        let dimensions = self.report(loaded)?;

        let now = self.clock.now();
        self.history.clear();
        self.history.push(image.clone(), dimensions, image, now);
        self.history.flush_now(now);

        info!(
            target: "image_resizer::session",
            name = file.map(|f| f.name()).unwrap_or_default(),
            %dimensions,
            "image loaded"
        );
        self.notify(Severity::Success, "Image loaded successfully");
        Ok(dimensions)
    }

    // ---------------------------------------------------------------------
    // Dimension edits
    // ---------------------------------------------------------------------

    fn limit(&self, dimensions: Dimensions) -> Dimensions {
        let max = self.config.limits.max_dimension as u64;
        Dimensions::clamped(
            (dimensions.width() as u64).min(max),
            (dimensions.height() as u64).min(max),
        )
    }

    /// Aspect ratio the lock follows: the working base, since every resize
    /// is derived from it.
    fn aspect_source(&self) -> Result<Dimensions> {
        self.state
            .base_dimensions()
            .ok_or_else(ResizerError::no_image_loaded)
    }

    fn target_for_width(&self, raw: &str) -> Result<Dimensions> {
        self.loaded()?;
        let width = self.config.limits.parse_dimension("width", raw)?;
        let target = if self.state.aspect_locked() {
            self.aspect_source()?.fit_width(width)
        } else {
            let height = self.state.target().map_or(1, |d| d.height());
            Dimensions::clamped(width as u64, height as u64)
        };
        Ok(self.limit(target))
    }

    fn target_for_height(&self, raw: &str) -> Result<Dimensions> {
        self.loaded()?;
        let height = self.config.limits.parse_dimension("height", raw)?;
        let target = if self.state.aspect_locked() {
            self.aspect_source()?.fit_height(height)
        } else {
            let width = self.state.target().map_or(1, |d| d.width());
            Dimensions::clamped(width as u64, height as u64)
        };
        Ok(self.limit(target))
    }

    /// Width field changed. With the lock on, the height follows.
    pub fn set_width(&mut self, raw: &str) -> Result<Dimensions> {
        let target = self.target_for_width(raw);
        let target = self.report(target)?;
        self.request_resize(target)?;
        Ok(target)
    }

    /// Height field changed. With the lock on, the width follows.
    pub fn set_height(&mut self, raw: &str) -> Result<Dimensions> {
        let target = self.target_for_height(raw);
        let target = self.report(target)?;
        self.request_resize(target)?;
        Ok(target)
    }

    /// Ask for a render at `target`. Requests inside the debounce window
    /// collapse into the last one.
    pub fn request_resize(&mut self, target: Dimensions) -> Result<()> {
        let max = self.config.limits.max_dimension;
        let checked = match self.loaded() {
            Ok(()) if target.width() > max || target.height() > max => Err(
                ResizerError::invalid_dimension("size", target.width().max(target.height()) as u64, max),
            ),
            other => other,
        };
        self.report(checked)?;
        let targeted = self.state.set_target(target);
        self.report(targeted)?;
        self.resize_requests.call(target, self.clock.now());
        debug!(target: "image_resizer::session", %target, "resize requested");
        Ok(())
    }

    pub fn toggle_lock(&mut self) -> bool {
        self.state.toggle_aspect_lock()
    }

    /// Keep the current width and set the height from `width:height`.
    /// Ratio terms clamp to 1..=100.
    pub fn apply_ratio(&mut self, width: u32, height: u32) -> Result<Dimensions> {
        let current = self.loaded().and_then(|()| {
            self.state
                .target()
                .ok_or_else(ResizerError::no_image_loaded)
        });
        let current = self.report(current)?;
        let ratio = AspectRatio::new(width, height);
        let target = self.limit(ratio.apply_to_width(current.width()));
        self.request_resize(target)?;
        Ok(target)
    }

    pub fn apply_preset(&mut self, preset: &Preset) -> Result<Dimensions> {
        let loaded = self.loaded();
        self.report(loaded)?;
        let target = self.limit(preset.resolve(self.state.target()));
        self.request_resize(target)?;
        self.notify(Severity::Success, format!("Applied preset: {}", preset.name));
        Ok(target)
    }

    // ---------------------------------------------------------------------
    // Crop and reset
    // ---------------------------------------------------------------------

    /// Crop the origin image and make the result the new working base.
    /// `region` is in origin pixels.
    ///
    /// Runs on the calling thread: a crop is a row copy, and any edit made
    /// after it has to see the cropped base.
    pub fn crop(&mut self, region: CropRegion) -> Result<Dimensions> {
        let origin = self
            .state
            .origin()
            .cloned()
            .ok_or_else(ResizerError::no_image_loaded);
        let origin = self.report(origin)?;

        let cropped = run_with_panic_policy("crop", || engine::crop(&origin, region));
        let cropped = match cropped {
            Ok(image) => image,
            Err(e) => {
                warn!(target: "image_resizer::session", ?region, error = %e, "crop failed");
                return self.report(Err(e));
            }
        };
        self.invalidate_renders();
        let rebased = self.state.rebase(cropped.clone());
        let dimensions = self.report(rebased)?;
        self.record(cropped, dimensions, self.clock.now());
        debug!(target: "image_resizer::session", ?region, %dimensions, "cropped");
        self.notify(Severity::Success, "Image cropped successfully");
        Ok(dimensions)
    }

    /// Crop from a selection drawn on the preview. `displayed` is the
    /// on-screen size of the preview, which shows the origin image.
    pub fn crop_display(
        &mut self,
        selection: (f64, f64, f64, f64),
        displayed: (f64, f64),
    ) -> Result<Dimensions> {
        let region = self
            .state
            .origin_dimensions()
            .ok_or_else(ResizerError::no_image_loaded)
            .and_then(|natural| CropRegion::from_display(selection, displayed, natural));
        let region = self.report(region)?;
        self.crop(region)
    }

    /// Back to the origin image at its natural size.
    pub fn reset_to_original(&mut self) -> Result<Dimensions> {
        let origin = self
            .state
            .origin()
            .cloned()
            .ok_or_else(ResizerError::no_image_loaded);
        let origin = self.report(origin)?;
        self.invalidate_renders();
        let rebased = self.state.rebase(origin.clone());
        let dimensions = self.report(rebased)?;
        self.record(origin, dimensions, self.clock.now());
        self.notify(Severity::Success, "Reset to original size");
        Ok(dimensions)
    }

    // ---------------------------------------------------------------------
    // History
    // ---------------------------------------------------------------------

    pub fn undo(&mut self) -> Navigation {
        self.history.flush_now(self.clock.now());
        self.invalidate_renders();
        let navigation = self.history.undo(&mut self.state);
        self.report_navigation(&navigation, "Nothing to undo");
        navigation
    }

    pub fn redo(&mut self) -> Navigation {
        self.history.flush_now(self.clock.now());
        self.invalidate_renders();
        let navigation = self.history.redo(&mut self.state);
        self.report_navigation(&navigation, "Nothing to redo");
        navigation
    }

    fn report_navigation(&mut self, navigation: &Navigation, unavailable: &'static str) {
        match navigation {
            Navigation::Applied(dimensions) => {
                debug!(target: "image_resizer::session", %dimensions, "history entry applied");
            }
            Navigation::Unavailable => {
                self.notify(Severity::Warning, unavailable);
            }
            Navigation::Failed(e) => {
                let now = self.clock.now();
                self.notifications.push(Notification::from_error(e, now));
            }
        }
    }

    // ---------------------------------------------------------------------
    // Render loop
    // ---------------------------------------------------------------------

    fn submit_resize(&mut self, target: Dimensions) {
        let Some(base) = self.state.base().cloned() else {
            return;
        };
        let id = self.renders.submit(RenderJob {
            source: base,
            target,
            filter: self.config.filter,
        });
        debug!(target: "image_resizer::session", %id, %target, "resize submitted");
    }

    /// Submit a due resize, apply finished renders, and commit a due
    /// history snapshot. Returns how many renders were applied.
    pub fn tick(&mut self, now: Instant) -> usize {
        if let Some(target) = self.resize_requests.poll(now) {
            self.submit_resize(target);
        }

        let mut finished = Vec::new();
        self.renders.drain(|outcome| finished.push(outcome));

        let mut applied = 0;
        for outcome in finished {
            if self.discard_through.is_some_and(|stale| outcome.id <= stale) {
                debug!(target: "image_resizer::session", id = %outcome.id, "render superseded");
                continue;
            }
            if self.apply_render(outcome, now) {
                applied += 1;
            }
        }

        self.history.flush(now);
        applied
    }

    fn apply_render(&mut self, outcome: RenderOutcome, now: Instant) -> bool {
        let RenderOutcome { id, result } = outcome;
        let applied = result.and_then(|image| {
            self.state
                .set_display(image.clone())
                .map(|dimensions| (image, dimensions))
        });
        match applied {
            Ok((image, dimensions)) => {
                self.record(image, dimensions, now);
                self.notify(Severity::Success, "Image resized successfully");
                true
            }
            Err(e) => {
                warn!(target: "image_resizer::session", %id, error = %e, "resize failed");
                self.notify(Severity::Error, "Error resizing image");
                false
            }
        }
    }

    /// Run all outstanding work to completion: submit a debounced resize
    /// right away, wait for renders, apply them and commit history.
    /// Returns false if renders were still running at `timeout`.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        if let Some(target) = self.resize_requests.take() {
            self.submit_resize(target);
        }
        let idle = self.renders.wait_idle(timeout);
        let now = self.clock.now();
        self.tick(now);
        self.history.flush_now(now);
        idle
    }

    // ---------------------------------------------------------------------
    // Export
    // ---------------------------------------------------------------------

    /// PNG of the displayed image.
    pub fn export_single(&mut self) -> Result<ExportFile> {
        let result = self
            .state
            .display()
            .ok_or_else(ResizerError::no_image_loaded)
            .and_then(|image| export::export_single(image, self.config.png));
        self.report(result)
    }

    /// Zip of `sizes`, each resized from the working base.
    pub fn export_package(&mut self, sizes: &[ExportSize]) -> Result<ExportPackage> {
        let result = self
            .state
            .base()
            .ok_or_else(ResizerError::no_image_loaded)
            .and_then(|base| export::build_package(base, sizes, self.config.filter, self.config.png));
        match result {
            Ok(package) => {
                self.notify(
                    Severity::Success,
                    format!("{} images downloaded successfully", package.len()),
                );
                Ok(package)
            }
            Err(e) if e.category() == crate::error::ErrorCategory::UserError => self.report(Err(e)),
            Err(e) => {
                warn!(target: "image_resizer::session", error = %e, "package failed");
                self.notify(Severity::Error, "There was an error processing the images");
                Err(e)
            }
        }
    }
}
