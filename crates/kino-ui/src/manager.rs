//! UI Manager - Main orchestrator for the player UI
//!
//! Coordinates:
//! - UI variant resolution on player events
//! - Ad context tracking across event races
//! - Lazy configuration, mounting and show/hide of layouts
//! - Source metadata and timeline markers in the shared configuration
//! - Teardown of every layout and subscription

use crate::{
    component::UiLayout,
    config::{TimelineMarker, UiConfig, UiConfigHandle},
    event::EventDispatcher,
    instance::UiInstanceManager,
    player::{EventCallback, Player, PlayerEvent, PlayerEventKind, ViewMode},
    relay::PlayerRelay,
    scheduler::FrameScheduler,
    surface::UiSurface,
    variant::{ConditionContext, ContextOverride, UiVariant, VariantResolver},
    Error, Result,
};
use serde_json::Map;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, error, info, instrument};

/// Action run right before a newly selected variant is shown
pub type OnShow = Box<dyn FnOnce(&Rc<UiInstanceManager>)>;

/// Player events that trigger variant resolution
const RESOLVE_TRIGGERS: [PlayerEventKind; 10] = [
    PlayerEventKind::SourceLoaded,
    PlayerEventKind::SourceUnloaded,
    PlayerEventKind::Play,
    PlayerEventKind::Paused,
    PlayerEventKind::AdStarted,
    PlayerEventKind::AdFinished,
    PlayerEventKind::AdSkipped,
    PlayerEventKind::AdError,
    PlayerEventKind::PlayerResized,
    PlayerEventKind::ViewModeChanged,
];

/// Builder for [`UiManager`]
pub struct UiManagerBuilder {
    player: Rc<dyn Player>,
    surface: Rc<dyn UiSurface>,
    scheduler: Rc<dyn FrameScheduler>,
    variants: Vec<UiVariant>,
    config: UiConfig,
}

impl UiManagerBuilder {
    /// Use a single layout for every context
    pub fn layout(mut self, layout: Rc<dyn UiLayout>) -> Self {
        self.variants = vec![UiVariant::new(layout)];
        self
    }

    /// Use an ordered list of variants
    pub fn variants(mut self, variants: Vec<UiVariant>) -> Self {
        self.variants = variants;
        self
    }

    /// Append one variant
    pub fn variant(mut self, variant: UiVariant) -> Self {
        self.variants.push(variant);
        self
    }

    pub fn config(mut self, config: UiConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the variants, wire up the player and resolve the initial variant
    pub fn build(self) -> Result<UiManager> {
        let resolver = VariantResolver::new(self.variants)?;
        self.config.validate()?;

        let config = Rc::new(UiConfigHandle::new(self.config));
        config.apply_source(self.player.source().as_ref());

        let instances = resolver
            .variants()
            .iter()
            .map(|variant| {
                UiInstanceManager::new(variant.layout().clone(), self.player.clone(), config.clone())
            })
            .collect();

        let inner = Rc::new(ManagerInner {
            relay: PlayerRelay::new(self.player.clone()),
            player: self.player,
            surface: self.surface,
            scheduler: self.scheduler,
            config,
            resolver,
            instances,
            current: Cell::new(None),
            ad_started: RefCell::new(None),
            on_ui_variant_resolve: EventDispatcher::new(),
            released: Cell::new(false),
        });

        inner.subscribe_player_events(Rc::downgrade(&inner));

        info!(
            variants = inner.instances.len(),
            auto_resolve = inner.config.get().auto_ui_variant_resolve,
            "UI manager created"
        );

        let manager = UiManager { inner };
        manager.inner.resolve(&ContextOverride::default(), None)?;
        Ok(manager)
    }
}

/// Top-level UI controller for one player
pub struct UiManager {
    inner: Rc<ManagerInner>,
}

struct ManagerInner {
    /// Host player
    player: Rc<dyn Player>,
    /// Relay for the manager's own player subscriptions
    relay: PlayerRelay,
    /// Where layouts are mounted
    surface: Rc<dyn UiSurface>,
    /// Deferral of the configured notification
    scheduler: Rc<dyn FrameScheduler>,
    /// Shared configuration
    config: Rc<UiConfigHandle>,
    /// Ordered variants
    resolver: VariantResolver,
    /// One instance per variant, same order
    instances: Vec<Rc<UiInstanceManager>>,
    /// Index of the active variant
    current: Cell<Option<usize>>,
    /// Most recent ad-start event while an ad is believed to be running
    ad_started: RefCell<Option<PlayerEvent>>,
    /// Hook to adjust the context before selection
    on_ui_variant_resolve: EventDispatcher<ConditionContext>,
    released: Cell<bool>,
}

impl UiManager {
    /// Start building a manager for `player`, mounting layouts on `surface`
    pub fn builder(
        player: Rc<dyn Player>,
        surface: Rc<dyn UiSurface>,
        scheduler: Rc<dyn FrameScheduler>,
    ) -> UiManagerBuilder {
        UiManagerBuilder {
            player,
            surface,
            scheduler,
            variants: Vec::new(),
            config: UiConfig::default(),
        }
    }

    /// Shared configuration handed to every component
    pub fn config(&self) -> &Rc<UiConfigHandle> {
        &self.inner.config
    }

    pub fn variants(&self) -> &[UiVariant] {
        self.inner.resolver.variants()
    }

    /// Instance managers, in variant order
    pub fn instances(&self) -> &[Rc<UiInstanceManager>] {
        &self.inner.instances
    }

    pub fn current_variant_index(&self) -> Option<usize> {
        self.inner.current.get()
    }

    /// Instance of the variant currently shown
    pub fn active_instance(&self) -> Option<Rc<UiInstanceManager>> {
        self.inner.current.get().map(|index| self.inner.instances[index].clone())
    }

    /// The ad-start event of the ad believed to be running
    pub fn ad_context(&self) -> Option<PlayerEvent> {
        self.inner.ad_started.borrow().clone()
    }

    pub fn is_released(&self) -> bool {
        self.inner.released.get()
    }

    /// Fired with the computed context before every selection. Handlers may modify it.
    pub fn on_ui_variant_resolve(&self) -> &EventDispatcher<ConditionContext> {
        &self.inner.on_ui_variant_resolve
    }

    /// Show `variant`, bypassing conditions
    pub fn switch_to_variant(&self, variant: &UiVariant, on_show: Option<OnShow>) -> Result<()> {
        self.inner.ensure_live()?;
        let index = self
            .inner
            .resolver
            .index_of(variant)
            .ok_or_else(|| Error::UnknownVariant {
                layout: variant.layout().name(),
            })?;
        self.inner.switch_to(Some(index), on_show)
    }

    /// Resolve the variant for the current context with `overrides` applied
    pub fn resolve_variant(&self, overrides: &ContextOverride, on_show: Option<OnShow>) -> Result<()> {
        self.inner.resolve(overrides, on_show)
    }

    pub fn timeline_markers(&self) -> Vec<TimelineMarker> {
        self.inner.config.timeline_markers()
    }

    pub fn add_timeline_marker(&self, marker: TimelineMarker) {
        self.inner.config.add_timeline_marker(marker);
        self.inner.config.notify_updated();
    }

    /// Remove the first marker equal to `marker`. Returns false if none matched.
    pub fn remove_timeline_marker(&self, marker: &TimelineMarker) -> bool {
        if self.inner.config.remove_timeline_marker(marker) {
            self.inner.config.notify_updated();
            true
        } else {
            false
        }
    }

    /// Release every layout and drop every subscription. Further switching fails.
    pub fn release(&self) {
        self.inner.release();
    }
}

impl Drop for UiManager {
    fn drop(&mut self) {
        self.inner.release();
    }
}

impl fmt::Debug for UiManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiManager")
            .field("variants", &self.inner.resolver.variants())
            .field("current", &self.inner.current.get())
            .field("ad_active", &self.inner.ad_started.borrow().is_some())
            .field("released", &self.inner.released.get())
            .finish()
    }
}

impl ManagerInner {
    fn ensure_live(&self) -> Result<()> {
        if self.released.get() {
            Err(Error::Released)
        } else {
            Ok(())
        }
    }

    /// Subscribe to the player through the manager's relay
    fn subscribe_player_events(&self, this: Weak<ManagerInner>) {
        let weak = this.clone();
        let on_source_change: EventCallback = Rc::new(move |_event: &PlayerEvent| {
            if let Some(inner) = weak.upgrade() {
                inner.refresh_source_metadata();
            }
        });
        self.relay
            .on(PlayerEventKind::SourceLoaded, on_source_change.clone())
            .on(PlayerEventKind::SourceUnloaded, on_source_change);

        if !self.config.get().auto_ui_variant_resolve {
            return;
        }

        let on_trigger: EventCallback = Rc::new(move |event: &PlayerEvent| {
            if let Some(inner) = this.upgrade() {
                if let Err(err) = inner.resolve_from_event(event) {
                    error!(event = %event.kind, error = %err, "UI variant resolution failed");
                }
            }
        });
        for kind in RESOLVE_TRIGGERS {
            self.relay.on(kind, on_trigger.clone());
        }
    }

    fn refresh_source_metadata(&self) {
        self.config.apply_source(self.player.source().as_ref());
        self.config.notify_updated();
    }

    /// Update the persisted ad context from a player event
    fn track_ad_context(&self, event: &PlayerEvent) {
        match event.kind {
            PlayerEventKind::AdStarted => {
                *self.ad_started.borrow_mut() = Some(event.clone());
            }
            PlayerEventKind::AdFinished | PlayerEventKind::AdSkipped | PlayerEventKind::AdError => {
                self.ad_started.borrow_mut().take();
            }
            // A new source while no linear ad runs means any ad end was missed
            PlayerEventKind::SourceLoaded | PlayerEventKind::SourceUnloaded => {
                if !self.player.is_linear_ad_active() && self.ad_started.borrow_mut().take().is_some() {
                    debug!(event = %event.kind, "Stale ad context cleared");
                }
            }
            _ => {}
        }
    }

    fn resolve_from_event(&self, event: &PlayerEvent) -> Result<()> {
        self.ensure_live()?;
        self.track_ad_context(event);

        let context = self.resolve_context(&ContextOverride::default());

        // Layouts created after the ad started never saw its start event.
        // Only replay it when the selection was made for an ad.
        let on_show = if context.is_ad {
            self.ad_started.borrow().clone().map(|ad| -> OnShow {
                Box::new(move |instance: &Rc<UiInstanceManager>| {
                    instance
                        .player()
                        .fire_in_ui(PlayerEventKind::AdStarted, ad.data);
                })
            })
        } else {
            None
        };

        self.switch_to(self.select(&context), on_show)
    }

    /// Context from live player and surface state plus the persisted ad context
    fn condition_context(&self) -> ConditionContext {
        let ad_started = self.ad_started.borrow();
        ConditionContext {
            is_ad: ad_started.is_some(),
            ad_client_type: ad_started
                .as_ref()
                .and_then(|event| event.client_type())
                .map(str::to_string),
            is_fullscreen: self.player.view_mode() == ViewMode::Fullscreen,
            is_mobile: self.surface.is_mobile(),
            is_playing: self.player.is_playing(),
            width: self.surface.width(),
            document_width: self.surface.document_width(),
        }
    }

    fn resolve(&self, overrides: &ContextOverride, on_show: Option<OnShow>) -> Result<()> {
        self.ensure_live()?;
        let context = self.resolve_context(overrides);
        self.switch_to(self.select(&context), on_show)
    }

    /// Final context: computed, then overridden, then adjusted by resolve hooks
    fn resolve_context(&self, overrides: &ContextOverride) -> ConditionContext {
        let mut context = self.condition_context();
        overrides.apply(&mut context);
        self.on_ui_variant_resolve.dispatch(&mut context);
        context
    }

    /// Runs every condition before anything is hidden, shown or configured
    fn select(&self, context: &ConditionContext) -> Option<usize> {
        let selected = self.resolver.select_index(context);
        debug!(
            is_ad = context.is_ad,
            is_fullscreen = context.is_fullscreen,
            is_mobile = context.is_mobile,
            is_playing = context.is_playing,
            width = context.width,
            selected = ?selected,
            "UI variant resolved"
        );

        selected
    }

    #[instrument(skip(self, on_show))]
    fn switch_to(&self, target: Option<usize>, on_show: Option<OnShow>) -> Result<()> {
        self.ensure_live()?;

        let previous = self.current.get();
        if previous == target {
            return Ok(());
        }

        if let Some(index) = previous {
            self.instances[index].layout().hide();
        }
        self.current.set(target);

        let Some(index) = target else {
            info!(from = ?previous, "No UI variant selected");
            return Ok(());
        };
        let instance = self.instances[index].clone();

        if !instance.is_configured() {
            if let Err(err) = self.add_ui(&instance) {
                self.current.set(None);
                return Err(err);
            }
            // Components keyed off source loading must still initialize when joining late
            if self.player.has_source() {
                instance
                    .player()
                    .fire_in_ui(PlayerEventKind::SourceLoaded, Map::new());
            }
        }

        if let Some(on_show) = on_show {
            on_show(&instance);
        }
        instance.layout().show();

        info!(
            from = ?previous,
            to = index,
            layout = %instance.layout().name(),
            "UI variant switched"
        );

        Ok(())
    }

    /// Configure and mount a layout selected for the first time
    fn add_ui(&self, instance: &Rc<UiInstanceManager>) -> Result<()> {
        instance.configure()?;
        // Mount only once configured, so the initial layout never shows half-built
        self.surface.attach(instance.layout());

        if self.player.has_source() {
            self.config.notify_updated();
        }

        let weak = Rc::downgrade(instance);
        self.scheduler.after_next_paint(Box::new(move || {
            if let Some(instance) = weak.upgrade() {
                if instance.is_configured() {
                    instance.on_configured().dispatch(&mut ());
                }
            }
        }));

        Ok(())
    }

    fn release(&self) {
        if self.released.replace(true) {
            return;
        }

        for instance in &self.instances {
            let was_configured = instance.is_configured();
            instance.release();
            if was_configured {
                self.surface.detach(instance.layout());
            }
            instance.clear_event_handlers();
        }

        self.current.set(None);
        self.ad_started.borrow_mut().take();
        self.relay.clear_all();
        self.on_ui_variant_resolve.unsubscribe_all();

        info!(variants = self.instances.len(), "UI manager released");
    }
}
