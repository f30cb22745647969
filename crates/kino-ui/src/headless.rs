//! Headless host implementations
//!
//! In-process stand-ins for the pieces the UI core expects from its
//! environment: a [`HeadlessPlayer`] that emits player events on demand, a
//! [`HeadlessSurface`] with a settable viewport, and [`Panel`], a generic
//! container component that records what happens to it. They back the test
//! suites, the benchmarks and the scenario simulator of `kino-ui-cli`.

use crate::{
    component::{Component, UiLayout},
    event::same_rc,
    instance::UiInstanceManager,
    player::{EventCallback, Player, PlayerEvent, PlayerEventKind, PlayerMember, SourceInfo, ViewMode},
    relay::PlayerRelay,
    surface::UiSurface,
    Error, Result,
};
use serde_json::{json, Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::debug;

/// Scriptable host player
#[derive(Default)]
pub struct HeadlessPlayer {
    listeners: RefCell<HashMap<PlayerEventKind, Vec<EventCallback>>>,
    values: Vec<(String, Value)>,
    accessors: RefCell<HashMap<String, (Value, bool)>>,
    playing: Cell<bool>,
    view_mode: Cell<ViewMode>,
    source: RefCell<Option<SourceInfo>>,
    linear_ad_active: Cell<bool>,
    emitted: Cell<usize>,
}

impl HeadlessPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose a plain value member
    pub fn with_value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.values.push((name.into(), value));
        self
    }

    /// Expose a getter/setter member
    pub fn with_accessor(self, name: impl Into<String>, value: Value, writable: bool) -> Self {
        self.accessors
            .borrow_mut()
            .insert(name.into(), (value, writable));
        self
    }

    /// Number of callbacks currently subscribed, through relays or not
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().values().map(Vec::len).sum()
    }

    /// Number of callbacks subscribed to `kind`
    pub fn listeners_for(&self, kind: PlayerEventKind) -> usize {
        self.listeners.borrow().get(&kind).map_or(0, Vec::len)
    }

    /// Number of events dispatched by this player
    pub fn emitted_count(&self) -> usize {
        self.emitted.get()
    }

    /// Dispatch an event without payload
    pub fn emit(&self, kind: PlayerEventKind) {
        self.dispatch(PlayerEvent::new(kind));
    }

    /// Dispatch an event with payload
    pub fn emit_with(&self, kind: PlayerEventKind, data: Map<String, Value>) {
        self.dispatch(PlayerEvent::with_data(kind, data));
    }

    /// Deliver `event` to every subscriber of its kind
    pub fn dispatch(&self, event: PlayerEvent) {
        let callbacks: Vec<EventCallback> = self
            .listeners
            .borrow()
            .get(&event.kind)
            .cloned()
            .unwrap_or_default();

        self.emitted.set(self.emitted.get() + 1);
        debug!(event = %event.kind, callbacks = callbacks.len(), "Headless player event");

        for callback in callbacks {
            callback(&event);
        }
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.set(playing);
    }

    pub fn set_view_mode(&self, mode: ViewMode) {
        self.view_mode.set(mode);
    }

    pub fn set_linear_ad_active(&self, active: bool) {
        self.linear_ad_active.set(active);
    }

    /// Replace the source without emitting anything
    pub fn set_source(&self, source: Option<SourceInfo>) {
        *self.source.borrow_mut() = source;
    }

    /// Load a source and emit `sourceloaded`
    pub fn load(&self, source: SourceInfo) {
        self.set_source(Some(source));
        self.emit(PlayerEventKind::SourceLoaded);
    }

    /// Unload the source and emit `sourceunloaded`
    pub fn unload(&self) {
        self.set_source(None);
        self.playing.set(false);
        self.emit(PlayerEventKind::SourceUnloaded);
    }

    pub fn play(&self) {
        self.playing.set(true);
        self.emit(PlayerEventKind::Play);
    }

    pub fn pause(&self) {
        self.playing.set(false);
        self.emit(PlayerEventKind::Paused);
    }

    /// Start a linear ad and emit `adstarted`
    pub fn start_ad(&self, client_type: &str) {
        self.linear_ad_active.set(true);
        let mut data = Map::new();
        data.insert("clientType".to_string(), json!(client_type));
        data.insert("ad".to_string(), json!({ "isLinear": true }));
        self.emit_with(PlayerEventKind::AdStarted, data);
    }

    /// End the running ad and emit `kind` (finished, skipped or error)
    pub fn end_ad(&self, kind: PlayerEventKind) {
        self.linear_ad_active.set(false);
        self.emit(kind);
    }

    /// Switch view mode and emit `viewmodechanged`
    pub fn change_view_mode(&self, mode: ViewMode) {
        self.view_mode.set(mode);
        let mut data = Map::new();
        data.insert("to".to_string(), json!(mode));
        self.emit_with(PlayerEventKind::ViewModeChanged, data);
    }
}

impl Player for HeadlessPlayer {
    fn on(&self, kind: PlayerEventKind, callback: EventCallback) {
        self.listeners
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push(callback);
    }

    fn off(&self, kind: PlayerEventKind, callback: &EventCallback) {
        let mut listeners = self.listeners.borrow_mut();
        if let Some(callbacks) = listeners.get_mut(&kind) {
            if let Some(index) = callbacks.iter().position(|c| same_rc(c, callback)) {
                callbacks.remove(index);
            }
        }
    }

    fn members(&self) -> Vec<PlayerMember> {
        let mut members: Vec<PlayerMember> = self
            .values
            .iter()
            .map(|(name, value)| PlayerMember::Value {
                name: name.clone(),
                value: value.clone(),
            })
            .collect();

        let mut accessors: Vec<PlayerMember> = self
            .accessors
            .borrow()
            .iter()
            .map(|(name, (_, writable))| PlayerMember::Accessor {
                name: name.clone(),
                writable: *writable,
            })
            .collect();
        accessors.sort_by(|a, b| a.name().cmp(b.name()));

        members.extend(accessors);
        members
    }

    fn get_property(&self, name: &str) -> Option<Value> {
        self.accessors
            .borrow()
            .get(name)
            .map(|(value, _)| value.clone())
    }

    fn set_property(&self, name: &str, value: Value) -> Result<()> {
        match self.accessors.borrow_mut().get_mut(name) {
            Some((current, true)) => {
                *current = value;
                Ok(())
            }
            Some((_, false)) => Err(Error::ReadOnlyMember {
                name: name.to_string(),
            }),
            None => Err(Error::UnknownMember {
                name: name.to_string(),
            }),
        }
    }

    fn is_playing(&self) -> bool {
        self.playing.get()
    }

    fn view_mode(&self) -> ViewMode {
        self.view_mode.get()
    }

    fn source(&self) -> Option<SourceInfo> {
        self.source.borrow().clone()
    }

    fn is_linear_ad_active(&self) -> bool {
        self.linear_ad_active.get()
    }
}

impl fmt::Debug for HeadlessPlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessPlayer")
            .field("listeners", &self.listener_count())
            .field("playing", &self.playing.get())
            .field("view_mode", &self.view_mode.get())
            .field("linear_ad_active", &self.linear_ad_active.get())
            .finish()
    }
}

/// Surface with a settable viewport that records attached layouts
pub struct HeadlessSurface {
    width: Cell<f64>,
    document_width: Cell<f64>,
    mobile: Cell<bool>,
    attached: RefCell<Vec<Rc<dyn UiLayout>>>,
}

impl HeadlessSurface {
    pub fn new(width: f64, document_width: f64) -> Self {
        Self {
            width: Cell::new(width),
            document_width: Cell::new(document_width),
            mobile: Cell::new(false),
            attached: RefCell::new(Vec::new()),
        }
    }

    pub fn set_width(&self, width: f64) {
        self.width.set(width);
    }

    pub fn set_document_width(&self, width: f64) {
        self.document_width.set(width);
    }

    pub fn set_mobile(&self, mobile: bool) {
        self.mobile.set(mobile);
    }

    /// Names of the attached layouts, in attach order
    pub fn attached_names(&self) -> Vec<String> {
        self.attached.borrow().iter().map(|l| l.name()).collect()
    }

    pub fn attached_count(&self) -> usize {
        self.attached.borrow().len()
    }

    pub fn is_attached(&self, layout: &Rc<dyn UiLayout>) -> bool {
        self.attached.borrow().iter().any(|l| same_rc(l, layout))
    }
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new(1280.0, 1280.0)
    }
}

impl UiSurface for HeadlessSurface {
    fn attach(&self, layout: &Rc<dyn UiLayout>) {
        if !self.is_attached(layout) {
            self.attached.borrow_mut().push(layout.clone());
        }
    }

    fn detach(&self, layout: &Rc<dyn UiLayout>) {
        self.attached.borrow_mut().retain(|l| !same_rc(l, layout));
    }

    fn width(&self) -> f64 {
        self.width.get()
    }

    fn document_width(&self) -> f64 {
        self.document_width.get()
    }

    fn is_mobile(&self) -> bool {
        self.mobile.get()
    }
}

impl fmt::Debug for HeadlessSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessSurface")
            .field("width", &self.width.get())
            .field("document_width", &self.document_width.get())
            .field("mobile", &self.mobile.get())
            .field("attached", &self.attached_names())
            .finish()
    }
}

/// Generic container component.
///
/// Counts its lifecycle calls and, when built with
/// [`Panel::listening_to`], records every player event it receives between
/// configure and release.
#[derive(Default)]
pub struct Panel {
    label: String,
    children: RefCell<Vec<Rc<dyn Component>>>,
    listen: Vec<PlayerEventKind>,
    subscriptions: RefCell<Vec<(PlayerEventKind, EventCallback)>>,
    player: RefCell<Option<Rc<PlayerRelay>>>,
    manager: RefCell<Weak<UiInstanceManager>>,
    received: Rc<RefCell<Vec<PlayerEvent>>>,
    shown: Cell<bool>,
    show_count: Cell<u32>,
    hide_count: Cell<u32>,
    initialize_count: Cell<u32>,
    configure_count: Cell<u32>,
    release_count: Cell<u32>,
}

impl Panel {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    /// Childless panel
    pub fn leaf(label: impl Into<String>) -> Rc<Self> {
        Rc::new(Self::new(label))
    }

    pub fn with_child<C: Component + 'static>(self, child: Rc<C>) -> Self {
        self.children.borrow_mut().push(child);
        self
    }

    /// Subscribe to `kinds` on configure
    pub fn listening_to(mut self, kinds: &[PlayerEventKind]) -> Self {
        self.listen.extend_from_slice(kinds);
        self
    }

    pub fn into_rc(self) -> Rc<Self> {
        Rc::new(self)
    }

    /// Append a child after construction
    pub fn add_child(&self, child: Rc<dyn Component>) {
        self.children.borrow_mut().push(child);
    }

    pub fn clear_children(&self) {
        self.children.borrow_mut().clear();
    }

    /// Events received since configure
    pub fn received_events(&self) -> Vec<PlayerEvent> {
        self.received.borrow().clone()
    }

    pub fn received_kinds(&self) -> Vec<PlayerEventKind> {
        self.received.borrow().iter().map(|e| e.kind).collect()
    }

    /// Instance manager handed over on configure, while it is alive
    pub fn instance(&self) -> Option<Rc<UiInstanceManager>> {
        self.manager.borrow().upgrade()
    }

    pub fn show_count(&self) -> u32 {
        self.show_count.get()
    }

    pub fn hide_count(&self) -> u32 {
        self.hide_count.get()
    }

    pub fn initialize_count(&self) -> u32 {
        self.initialize_count.get()
    }

    pub fn configure_count(&self) -> u32 {
        self.configure_count.get()
    }

    pub fn release_count(&self) -> u32 {
        self.release_count.get()
    }
}

impl Component for Panel {
    fn name(&self) -> String {
        self.label.clone()
    }

    fn initialize(&self) {
        self.initialize_count.set(self.initialize_count.get() + 1);
    }

    fn configure(&self, player: &Rc<PlayerRelay>, manager: &Weak<UiInstanceManager>) {
        self.configure_count.set(self.configure_count.get() + 1);

        let mut subscriptions = self.subscriptions.borrow_mut();
        for &kind in &self.listen {
            let received = self.received.clone();
            let callback: EventCallback =
                Rc::new(move |event: &PlayerEvent| received.borrow_mut().push(event.clone()));
            player.on(kind, callback.clone());
            subscriptions.push((kind, callback));
        }
        *self.player.borrow_mut() = Some(player.clone());
        *self.manager.borrow_mut() = manager.clone();
    }

    fn release(&self) {
        self.release_count.set(self.release_count.get() + 1);

        let subscriptions = std::mem::take(&mut *self.subscriptions.borrow_mut());
        if let Some(player) = self.player.borrow_mut().take() {
            for (kind, callback) in &subscriptions {
                player.off(*kind, callback);
            }
        }
        self.shown.set(false);
    }

    fn children(&self) -> Vec<Rc<dyn Component>> {
        self.children.borrow().clone()
    }
}

impl UiLayout for Panel {
    fn show(&self) {
        self.shown.set(true);
        self.show_count.set(self.show_count.get() + 1);
    }

    fn hide(&self) {
        self.shown.set(false);
        self.hide_count.set(self.hide_count.get() + 1);
    }

    fn is_shown(&self) -> bool {
        self.shown.get()
    }
}

impl fmt::Debug for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Panel")
            .field("label", &self.label)
            .field("children", &self.children.borrow().len())
            .field("shown", &self.shown.get())
            .finish()
    }
}
