//! UI configuration
//!
//! [`UiConfig`] is plain data, deserializable from JSON. At runtime it lives
//! inside a [`UiConfigHandle`] shared by every layout: components read it
//! and subscribe to [`UiConfigHandle::on_updated`], while only the UI
//! manager mutates it.

use crate::{event::EventDispatcher, player::SourceInfo, Error, Result};
use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell};

/// A marker on the seek bar timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineMarker {
    /// Position in seconds
    pub time: f64,
    /// Length of the marked range in seconds, if it is a range
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub css_classes: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl TimelineMarker {
    /// Point marker at `time` seconds
    pub fn at(time: f64) -> Self {
        Self {
            time,
            duration: None,
            title: None,
            css_classes: Vec::new(),
            image_url: None,
        }
    }

    /// Set the marker title
    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Whether `position` falls on this marker
    pub fn contains(&self, position: f64, snapping_range: f64) -> bool {
        match self.duration {
            Some(duration) => position >= self.time && position <= self.time + duration,
            None => (position - self.time).abs() <= snapping_range,
        }
    }
}

/// Title, description and markers shown by the UI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub markers: Vec<TimelineMarker>,
}

/// UI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Re-resolve the UI variant on player events
    pub auto_ui_variant_resolve: bool,
    pub metadata: UiMetadata,
    pub playback_speed_selection_enabled: bool,
    pub enter_fullscreen_on_initial_playback: bool,
    pub disable_auto_hide_when_hovered: bool,
    /// Delay before controls auto-hide, in milliseconds (negative disables auto-hide)
    pub hide_delay_ms: i64,
    /// Seconds around a point marker within which seeking snaps to it
    pub seekbar_snapping_range: f64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            auto_ui_variant_resolve: true,
            metadata: UiMetadata::default(),
            playback_speed_selection_enabled: false,
            enter_fullscreen_on_initial_playback: false,
            disable_auto_hide_when_hovered: false,
            hide_delay_ms: 5000,
            seekbar_snapping_range: 1.0,
        }
    }
}

impl UiConfig {
    /// Parse and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let config: UiConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !self.seekbar_snapping_range.is_finite() || self.seekbar_snapping_range < 0.0 {
            return Err(Error::config(format!(
                "seekbar_snapping_range must be a non-negative number, got {}",
                self.seekbar_snapping_range
            )));
        }
        if let Some(marker) = self.metadata.markers.iter().find(|m| m.time < 0.0) {
            return Err(Error::config(format!(
                "timeline marker at {}s is before the start of the timeline",
                marker.time
            )));
        }
        Ok(())
    }

    /// Export as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Metadata with the source's values taking precedence over this config's
    fn merged_metadata(&self, source: &SourceInfo) -> UiMetadata {
        UiMetadata {
            title: source.title.clone().or_else(|| self.metadata.title.clone()),
            description: source
                .description
                .clone()
                .or_else(|| self.metadata.description.clone()),
            markers: if source.markers.is_empty() {
                self.metadata.markers.clone()
            } else {
                source.markers.clone()
            },
        }
    }
}

/// Shared, observable configuration
#[derive(Debug)]
pub struct UiConfigHandle {
    base: UiConfig,
    current: RefCell<UiConfig>,
    on_updated: EventDispatcher<()>,
}

impl UiConfigHandle {
    pub(crate) fn new(config: UiConfig) -> Self {
        Self {
            current: RefCell::new(config.clone()),
            base: config,
            on_updated: EventDispatcher::new(),
        }
    }

    /// Current configuration. Do not hold the borrow across UI calls.
    pub fn get(&self) -> Ref<'_, UiConfig> {
        self.current.borrow()
    }

    /// Copy of the current configuration
    pub fn snapshot(&self) -> UiConfig {
        self.current.borrow().clone()
    }

    /// Fired after any change to the configuration
    pub fn on_updated(&self) -> &EventDispatcher<()> {
        &self.on_updated
    }

    pub(crate) fn notify_updated(&self) {
        self.on_updated.dispatch(&mut ());
    }

    /// Overlay the source's metadata onto the configuration given at construction
    pub(crate) fn apply_source(&self, source: Option<&SourceInfo>) {
        let metadata = match source {
            Some(source) => self.base.merged_metadata(source),
            None => self.base.metadata.clone(),
        };
        self.current.borrow_mut().metadata = metadata;
    }

    pub(crate) fn timeline_markers(&self) -> Vec<TimelineMarker> {
        self.current.borrow().metadata.markers.clone()
    }

    pub(crate) fn add_timeline_marker(&self, marker: TimelineMarker) {
        self.current.borrow_mut().metadata.markers.push(marker);
    }

    pub(crate) fn remove_timeline_marker(&self, marker: &TimelineMarker) -> bool {
        let mut current = self.current.borrow_mut();
        let markers = &mut current.metadata.markers;
        match markers.iter().position(|m| m == marker) {
            Some(index) => {
                markers.remove(index);
                true
            }
            None => false,
        }
    }
}
