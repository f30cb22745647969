//! Kino UI - Player UI core for Kino
//!
//! This crate provides the framework-agnostic core of the player UI:
//! - Ordered UI variants selected by conditions on the playback context
//! - Ad context tracking that survives event races
//! - Lazy configuration and mounting of component trees
//! - Per-variant player relays with teardown and UI-local events
//! - Shared configuration with source metadata and timeline markers
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            Kino UI                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │    Player    │  │   Variant    │  │   Surface /  │           │
//! │  │    (host)    │  │   Resolver   │  │   Scheduler  │           │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘           │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │     UI      │                              │
//! │                    │   Manager   │                              │
//! │                    └──────┬──────┘                              │
//! │                           │  one per variant                    │
//! │  ┌──────────────┐  ┌──────┴──────┐  ┌──────────────┐            │
//! │  │    Player    │  │  Instance   │  │  Component   │            │
//! │  │    Relay     │  │   Manager   │  │     Tree     │            │
//! │  └──────────────┘  └─────────────┘  └──────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is single-threaded and driven by the host's event loop.

pub mod error;
pub mod event;
pub mod player;
pub mod relay;
pub mod component;
pub mod config;
pub mod instance;
pub mod variant;
pub mod surface;
pub mod scheduler;
pub mod headless;
pub mod manager;

pub use error::{Error, Result};
pub use event::{EventDispatcher, Handler};
pub use player::{EventCallback, Player, PlayerEvent, PlayerEventKind, PlayerMember, SourceInfo, ViewMode};
pub use relay::PlayerRelay;
pub use component::{Component, UiLayout};
pub use config::{TimelineMarker, UiConfig, UiConfigHandle, UiMetadata};
pub use instance::{InstanceState, UiInstanceId, UiInstanceManager};
pub use variant::{ConditionContext, ContextOverride, UiVariant, VariantResolver};
pub use surface::UiSurface;
pub use scheduler::{DeferredQueue, FrameScheduler};
#[cfg(feature = "tokio-scheduler")]
pub use scheduler::LocalTaskScheduler;
pub use manager::{OnShow, UiManager, UiManagerBuilder};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the UI library
pub fn init() {
    tracing::info!(version = VERSION, "Kino UI initialized");
}
