//! Runtime settings for the drag pipeline.
//!
//! Stored as JSON at `<config_dir>/apz_dnd/settings.json`. Every field has a
//! default, so partial files are fine and a missing file means defaults.

use crate::constants::{
    DEFAULT_ACK_TIMEOUT_MS, DEFAULT_DISPATCH_QUEUE_DEPTH, DEFAULT_DRAG_THRESHOLD_PX, DEFAULT_LOG_FILTER,
    DEFAULT_MAX_REMAP_ATTEMPTS, DEFAULT_TRANSFORM_HISTORY,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

const SETTINGS_DIR: &str = "apz_dnd";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DndSettings {
    /// Pointer travel (host pixels) before a press becomes a drag
    pub drag_threshold_px: f32,
    /// How long dispatch waits for content to acknowledge an event
    pub ack_timeout_ms: u64,
    /// Bounded depth of the content delivery queue
    pub dispatch_queue_depth: usize,
    /// Transform snapshots retained for `map_at`
    pub transform_history: usize,
    /// Remaps attempted when the transform moves during dispatch
    pub max_remap_attempts: u32,
    pub log_filter: String,
}

impl Default for DndSettings {
    fn default() -> Self {
        Self {
            drag_threshold_px: DEFAULT_DRAG_THRESHOLD_PX,
            ack_timeout_ms: DEFAULT_ACK_TIMEOUT_MS,
            dispatch_queue_depth: DEFAULT_DISPATCH_QUEUE_DEPTH,
            transform_history: DEFAULT_TRANSFORM_HISTORY,
            max_remap_attempts: DEFAULT_MAX_REMAP_ATTEMPTS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// Default settings location, if the platform has a config directory.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(SETTINGS_DIR).join(SETTINGS_FILE))
}

impl DndSettings {
    /// Load from the default location, falling back to defaults.
    pub fn load() -> Self {
        let Some(path) = default_settings_path() else {
            debug!("No config directory, using default settings");
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), "Failed to load settings, using defaults: {e:#}");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid settings JSON in {}", path.display()))?;
        Ok(settings.sanitized())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, json).with_context(|| format!("Failed to write settings to {}", path.display()))?;
        debug!(path = %path.display(), "Settings saved");
        Ok(())
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    /// Replace values that would wedge the pipeline with their defaults.
    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !self.drag_threshold_px.is_finite() || self.drag_threshold_px < 0.0 {
            warn!(value = self.drag_threshold_px, "Invalid drag threshold, using default");
            self.drag_threshold_px = defaults.drag_threshold_px;
        }
        if self.dispatch_queue_depth == 0 {
            warn!("Dispatch queue depth of zero, using default");
            self.dispatch_queue_depth = defaults.dispatch_queue_depth;
        }
        if self.transform_history == 0 {
            self.transform_history = 1;
        }
        self
    }
}
