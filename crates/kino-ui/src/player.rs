//! Host player boundary
//!
//! The UI core never owns playback. It talks to whatever drives the media
//! element through the [`Player`] trait: event subscription, the handful of
//! state queries variant resolution needs, and a generic member table for
//! everything components want to read or write without the core knowing
//! about it.

use crate::{config::TimelineMarker, Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::rc::Rc;

/// Callback registered for a player event. Identity is the `Rc` allocation.
pub type EventCallback = Rc<dyn Fn(&PlayerEvent)>;

/// Player event kinds the UI layer reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerEventKind {
    Ready,
    SourceLoaded,
    SourceUnloaded,
    Play,
    Playing,
    Paused,
    TimeChanged,
    Seek,
    Seeked,
    AdBreakStarted,
    AdStarted,
    AdFinished,
    AdBreakFinished,
    AdSkipped,
    AdError,
    PlayerResized,
    ViewModeChanged,
    Destroy,
}

impl PlayerEventKind {
    /// Wire name of the event kind
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerEventKind::Ready => "ready",
            PlayerEventKind::SourceLoaded => "sourceloaded",
            PlayerEventKind::SourceUnloaded => "sourceunloaded",
            PlayerEventKind::Play => "play",
            PlayerEventKind::Playing => "playing",
            PlayerEventKind::Paused => "paused",
            PlayerEventKind::TimeChanged => "timechanged",
            PlayerEventKind::Seek => "seek",
            PlayerEventKind::Seeked => "seeked",
            PlayerEventKind::AdBreakStarted => "adbreakstarted",
            PlayerEventKind::AdStarted => "adstarted",
            PlayerEventKind::AdFinished => "adfinished",
            PlayerEventKind::AdBreakFinished => "adbreakfinished",
            PlayerEventKind::AdSkipped => "adskipped",
            PlayerEventKind::AdError => "aderror",
            PlayerEventKind::PlayerResized => "playerresized",
            PlayerEventKind::ViewModeChanged => "viewmodechanged",
            PlayerEventKind::Destroy => "destroy",
        }
    }
}

impl fmt::Display for PlayerEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keys the event record owns when serialized
const RESERVED_KEYS: [&str; 3] = ["type", "timestamp", "uiSourced"];

/// An event as delivered to UI callbacks.
///
/// Serialized, the payload is flattened next to `type`, `timestamp` and
/// `uiSourced`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEvent {
    #[serde(rename = "type")]
    pub kind: PlayerEventKind,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    /// True when the event was synthesized for the UI and never passed through the host
    #[serde(default)]
    pub ui_sourced: bool,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl PlayerEvent {
    /// Create an event stamped with the current time
    pub fn new(kind: PlayerEventKind) -> Self {
        Self::with_data(kind, Map::new())
    }

    /// Create an event carrying a payload.
    ///
    /// Payload entries named like the event's own fields are dropped.
    pub fn with_data(kind: PlayerEventKind, mut data: Map<String, Value>) -> Self {
        for key in RESERVED_KEYS {
            data.remove(key);
        }
        Self {
            kind,
            timestamp: Utc::now().timestamp_millis(),
            ui_sourced: false,
            data,
        }
    }

    /// Create a UI-only replay of an event
    pub fn ui_sourced(kind: PlayerEventKind, data: Map<String, Value>) -> Self {
        Self {
            ui_sourced: true,
            ..Self::with_data(kind, data)
        }
    }

    /// Ad client type carried by ad events (`clientType`)
    pub fn client_type(&self) -> Option<&str> {
        self.data.get("clientType").and_then(Value::as_str)
    }

    /// Whether the ad in an ad event is linear (`ad.isLinear`)
    pub fn is_linear_ad(&self) -> bool {
        self.data
            .get("ad")
            .and_then(|ad| ad.get("isLinear"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Export as a JSON object
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Presentation mode of the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Inline,
    Fullscreen,
    PictureInPicture,
}

/// Descriptive data about the source currently loaded in the host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub markers: Vec<TimelineMarker>,
}

/// A host member the relay forwards without interpreting it
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerMember {
    /// Plain value, copied once when the relay is built
    Value { name: String, value: Value },
    /// Getter/setter pair, read and written live on the host
    Accessor { name: String, writable: bool },
}

impl PlayerMember {
    /// Member name
    pub fn name(&self) -> &str {
        match self {
            PlayerMember::Value { name, .. } | PlayerMember::Accessor { name, .. } => name,
        }
    }
}

/// The host player as seen by the UI core
pub trait Player {
    /// Subscribe `callback` to events of `kind`
    fn on(&self, kind: PlayerEventKind, callback: EventCallback);

    /// Remove one subscription of `callback` from events of `kind`
    fn off(&self, kind: PlayerEventKind, callback: &EventCallback);

    /// Members to expose through relays, beyond the methods of this trait
    fn members(&self) -> Vec<PlayerMember> {
        Vec::new()
    }

    /// Read an accessor member
    fn get_property(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Write an accessor member
    fn set_property(&self, name: &str, _value: Value) -> Result<()> {
        Err(Error::UnknownMember {
            name: name.to_string(),
        })
    }

    fn is_playing(&self) -> bool;

    fn view_mode(&self) -> ViewMode;

    /// The active source, if any
    fn source(&self) -> Option<SourceInfo>;

    fn has_source(&self) -> bool {
        self.source().is_some()
    }

    /// Whether a linear ad is playing right now
    fn is_linear_ad_active(&self) -> bool;
}
