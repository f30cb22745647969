//! UI instance manager
//!
//! One [`UiInstanceManager`] exists per UI variant. It owns the variant's
//! lifecycle (unconfigured, configured, released), the player relay its
//! components subscribe through, and the event bus components use to talk
//! to each other (seeking, component and controls visibility, release).

use crate::{
    component::{check_unique, descendants, UiLayout},
    config::{TimelineMarker, UiConfigHandle},
    event::EventDispatcher,
    player::Player,
    relay::PlayerRelay,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Unique UI instance identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UiInstanceId(Uuid);

impl UiInstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UiInstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UiInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a UI instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceState {
    Unconfigured,
    Configured,
    Released,
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceState::Unconfigured => write!(f, "unconfigured"),
            InstanceState::Configured => write!(f, "configured"),
            InstanceState::Released => write!(f, "released"),
        }
    }
}

/// Seek bar hover/scrub preview
#[derive(Debug, Clone, PartialEq)]
pub struct SeekPreviewArgs {
    /// Timeline position in percent (0-100)
    pub position: f64,
    /// True while the user drags the playhead
    pub scrubbing: bool,
    /// Marker under the preview position
    pub marker: Option<TimelineMarker>,
}

/// Visibility change of a single component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentVisibilityArgs {
    pub component: String,
}

/// Announcement that the controls are about to hide. Set `cancel` to keep them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlsHideArgs {
    pub cancel: bool,
}

/// Lifecycle and event bus of one UI variant
pub struct UiInstanceManager {
    id: UiInstanceId,
    layout: Rc<dyn UiLayout>,
    player: Rc<PlayerRelay>,
    config: Rc<UiConfigHandle>,
    state: Cell<InstanceState>,

    on_configured: EventDispatcher<()>,
    on_seek: EventDispatcher<()>,
    on_seek_preview: EventDispatcher<SeekPreviewArgs>,
    on_seeked: EventDispatcher<()>,
    on_component_show: EventDispatcher<ComponentVisibilityArgs>,
    on_component_hide: EventDispatcher<ComponentVisibilityArgs>,
    on_controls_show: EventDispatcher<()>,
    on_preview_controls_hide: EventDispatcher<ControlsHideArgs>,
    on_controls_hide: EventDispatcher<()>,
    on_release: EventDispatcher<()>,
}

impl UiInstanceManager {
    /// Create an unconfigured instance with its own relay over `player`
    pub fn new(
        layout: Rc<dyn UiLayout>,
        player: Rc<dyn Player>,
        config: Rc<UiConfigHandle>,
    ) -> Rc<Self> {
        Rc::new(Self {
            id: UiInstanceId::new(),
            layout,
            player: Rc::new(PlayerRelay::new(player)),
            config,
            state: Cell::new(InstanceState::Unconfigured),
            on_configured: EventDispatcher::new(),
            on_seek: EventDispatcher::new(),
            on_seek_preview: EventDispatcher::new(),
            on_seeked: EventDispatcher::new(),
            on_component_show: EventDispatcher::new(),
            on_component_hide: EventDispatcher::new(),
            on_controls_show: EventDispatcher::new(),
            on_preview_controls_hide: EventDispatcher::new(),
            on_controls_hide: EventDispatcher::new(),
            on_release: EventDispatcher::new(),
        })
    }

    pub fn id(&self) -> UiInstanceId {
        self.id
    }

    /// Root component of this variant
    pub fn layout(&self) -> &Rc<dyn UiLayout> {
        &self.layout
    }

    /// The relay components of this variant subscribe through
    pub fn player(&self) -> &Rc<PlayerRelay> {
        &self.player
    }

    pub fn config(&self) -> &Rc<UiConfigHandle> {
        &self.config
    }

    pub fn state(&self) -> InstanceState {
        self.state.get()
    }

    pub fn is_configured(&self) -> bool {
        self.state.get() == InstanceState::Configured
    }

    pub fn is_released(&self) -> bool {
        self.state.get() == InstanceState::Released
    }

    /// Initialize and configure every component of the layout.
    ///
    /// The whole tree is checked for repeated component instances before any
    /// component is touched.
    #[instrument(skip(self), fields(instance = %self.id))]
    pub fn configure(self: &Rc<Self>) -> Result<()> {
        match self.state.get() {
            InstanceState::Configured => return Err(Error::AlreadyConfigured),
            InstanceState::Released => return Err(Error::InstanceReleased),
            InstanceState::Unconfigured => {}
        }

        check_unique(&*self.layout)?;

        let manager = Rc::downgrade(self);
        self.layout.initialize();
        self.layout.configure(&self.player, &manager);

        let components = descendants(&*self.layout);
        for component in &components {
            component.initialize();
            component.configure(&self.player, &manager);
        }

        self.state.set(InstanceState::Configured);
        info!(
            layout = %self.layout.name(),
            components = components.len() + 1,
            "UI instance configured"
        );

        Ok(())
    }

    /// Release every component of the layout. Terminal.
    ///
    /// Components are only released if the instance was configured.
    #[instrument(skip(self), fields(instance = %self.id))]
    pub fn release(&self) {
        match self.state.get() {
            InstanceState::Released => return,
            InstanceState::Unconfigured => {
                self.state.set(InstanceState::Released);
                debug!("Unconfigured UI instance released");
                return;
            }
            InstanceState::Configured => {}
        }

        self.on_release.dispatch(&mut ());

        self.layout.release();
        for component in descendants(&*self.layout) {
            component.release();
        }

        self.state.set(InstanceState::Released);
        info!(layout = %self.layout.name(), "UI instance released");
    }

    /// Drop every subscription held by this instance, on the player and on its event bus
    pub fn clear_event_handlers(&self) {
        self.player.clear_all();

        self.on_configured.unsubscribe_all();
        self.on_seek.unsubscribe_all();
        self.on_seek_preview.unsubscribe_all();
        self.on_seeked.unsubscribe_all();
        self.on_component_show.unsubscribe_all();
        self.on_component_hide.unsubscribe_all();
        self.on_controls_show.unsubscribe_all();
        self.on_preview_controls_hide.unsubscribe_all();
        self.on_controls_hide.unsubscribe_all();
        self.on_release.unsubscribe_all();
    }

    /// Announce that the controls are about to hide and hide them unless a
    /// subscriber cancels. Returns true if the controls were hidden.
    pub fn request_controls_hide(&self) -> bool {
        let mut args = ControlsHideArgs::default();
        self.on_preview_controls_hide.dispatch(&mut args);

        if args.cancel {
            debug!(instance = %self.id, "Controls hide cancelled");
            return false;
        }

        self.on_controls_hide.dispatch(&mut ());
        true
    }

    /// Fired once the layout is configured and has been laid out
    pub fn on_configured(&self) -> &EventDispatcher<()> {
        &self.on_configured
    }

    /// Fired when a seek starts from the UI
    pub fn on_seek(&self) -> &EventDispatcher<()> {
        &self.on_seek
    }

    pub fn on_seek_preview(&self) -> &EventDispatcher<SeekPreviewArgs> {
        &self.on_seek_preview
    }

    pub fn on_seeked(&self) -> &EventDispatcher<()> {
        &self.on_seeked
    }

    pub fn on_component_show(&self) -> &EventDispatcher<ComponentVisibilityArgs> {
        &self.on_component_show
    }

    pub fn on_component_hide(&self) -> &EventDispatcher<ComponentVisibilityArgs> {
        &self.on_component_hide
    }

    pub fn on_controls_show(&self) -> &EventDispatcher<()> {
        &self.on_controls_show
    }

    /// Cancelable preview of `on_controls_hide`
    pub fn on_preview_controls_hide(&self) -> &EventDispatcher<ControlsHideArgs> {
        &self.on_preview_controls_hide
    }

    pub fn on_controls_hide(&self) -> &EventDispatcher<()> {
        &self.on_controls_hide
    }

    /// Fired before the components are released
    pub fn on_release(&self) -> &EventDispatcher<()> {
        &self.on_release
    }
}

impl fmt::Debug for UiInstanceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiInstanceManager")
            .field("id", &self.id)
            .field("layout", &self.layout.name())
            .field("state", &self.state.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UiConfig;
    use crate::headless::{HeadlessPlayer, Panel};
    use crate::player::PlayerEventKind;
    use std::cell::RefCell;

    fn instance_for(layout: Rc<Panel>, host: &Rc<HeadlessPlayer>) -> Rc<UiInstanceManager> {
        UiInstanceManager::new(
            layout,
            host.clone(),
            Rc::new(UiConfigHandle::new(UiConfig::default())),
        )
    }

    #[test]
    fn test_configure_walks_tree_once() {
        let play = Panel::leaf("play");
        let volume = Panel::leaf("volume");
        let layout = Panel::new("root")
            .with_child(play.clone())
            .with_child(Panel::new("bar").with_child(volume.clone()).into_rc())
            .into_rc();
        let host = Rc::new(HeadlessPlayer::new());
        let instance = instance_for(layout.clone(), &host);

        assert_eq!(instance.state(), InstanceState::Unconfigured);
        instance.configure().unwrap();

        assert!(instance.is_configured());
        for panel in [&layout, &play, &volume] {
            assert_eq!(panel.initialize_count(), 1);
            assert_eq!(panel.configure_count(), 1);
        }
    }

    #[test]
    fn test_configure_twice_fails() {
        let host = Rc::new(HeadlessPlayer::new());
        let layout = Panel::leaf("root");
        let instance = instance_for(layout.clone(), &host);

        instance.configure().unwrap();
        assert!(matches!(instance.configure(), Err(Error::AlreadyConfigured)));
        assert_eq!(layout.configure_count(), 1);
    }

    #[test]
    fn test_duplicate_component_fails_before_configuring_anything() {
        let x = Panel::leaf("X");
        let layout = Panel::new("root").with_child(x.clone()).with_child(x.clone()).into_rc();
        let host = Rc::new(HeadlessPlayer::new());
        let instance = instance_for(layout.clone(), &host);

        let err = instance.configure().unwrap_err();
        assert!(matches!(err, Error::DuplicateComponent { ref component } if component == "X"));
        assert_eq!(layout.configure_count(), 0);
        assert_eq!(x.configure_count(), 0);
        assert_eq!(instance.state(), InstanceState::Unconfigured);
    }

    #[test]
    fn test_release_without_configure_skips_components() {
        let host = Rc::new(HeadlessPlayer::new());
        let layout = Panel::leaf("root");
        let instance = instance_for(layout.clone(), &host);

        let releases = Rc::new(Cell::new(0));
        let counter = releases.clone();
        instance.on_release().subscribe(move |_| counter.set(counter.get() + 1));

        instance.release();

        assert_eq!(layout.release_count(), 0);
        assert_eq!(releases.get(), 0);
        assert!(instance.is_released());
        assert!(matches!(instance.configure(), Err(Error::InstanceReleased)));
    }

    #[test]
    fn test_release_notifies_then_releases_components() {
        let child = Panel::leaf("child");
        let layout = Panel::new("root").with_child(child.clone()).into_rc();
        let host = Rc::new(HeadlessPlayer::new());
        let instance = instance_for(layout.clone(), &host);
        instance.configure().unwrap();

        let order = Rc::new(RefCell::new(Vec::new()));
        let log = order.clone();
        let observed = child.clone();
        instance.on_release().subscribe(move |_| {
            log.borrow_mut().push(observed.release_count());
        });

        instance.release();
        instance.release();

        assert_eq!(*order.borrow(), vec![0]);
        assert_eq!(layout.release_count(), 1);
        assert_eq!(child.release_count(), 1);
        assert!(instance.is_released());
        assert!(!instance.is_configured());
    }

    #[test]
    fn test_clear_event_handlers() {
        let layout = Panel::new("root")
            .listening_to(&[PlayerEventKind::Play, PlayerEventKind::Paused])
            .into_rc();
        let host = Rc::new(HeadlessPlayer::new());
        let instance = instance_for(layout, &host);
        instance.configure().unwrap();
        instance.on_seek().subscribe(|_| {});
        instance.on_controls_hide().subscribe(|_| {});

        assert_eq!(host.listener_count(), 2);
        instance.clear_event_handlers();

        assert_eq!(host.listener_count(), 0);
        assert_eq!(instance.player().subscription_count(), 0);
        assert_eq!(instance.on_seek().listener_count(), 0);
        assert_eq!(instance.on_controls_hide().listener_count(), 0);
    }

    #[test]
    fn test_components_do_not_keep_instance_alive() {
        let host = Rc::new(HeadlessPlayer::new());
        let child = Panel::leaf("child");
        let layout = Panel::new("root").with_child(child.clone()).into_rc();
        let instance = instance_for(layout.clone(), &host);
        instance.configure().unwrap();

        assert!(child
            .instance()
            .is_some_and(|handle| Rc::ptr_eq(&handle, &instance)));

        instance.release();
        drop(instance);

        assert!(layout.instance().is_none());
        assert!(child.instance().is_none());
    }

    #[test]
    fn test_controls_hide_can_be_cancelled() {
        let host = Rc::new(HeadlessPlayer::new());
        let instance = instance_for(Panel::leaf("root"), &host);

        let hidden = Rc::new(Cell::new(0));
        let counter = hidden.clone();
        instance
            .on_controls_hide()
            .subscribe(move |_| counter.set(counter.get() + 1));

        let keep_visible = instance
            .on_preview_controls_hide()
            .subscribe(|args| args.cancel = true);
        assert!(!instance.request_controls_hide());
        assert_eq!(hidden.get(), 0);

        instance.on_preview_controls_hide().unsubscribe(&keep_visible);
        assert!(instance.request_controls_hide());
        assert_eq!(hidden.get(), 1);
    }

    #[test]
    fn test_seek_preview_carries_marker() {
        let host = Rc::new(HeadlessPlayer::new());
        let instance = instance_for(Panel::leaf("root"), &host);

        let previews = Rc::new(RefCell::new(Vec::new()));
        let sink = previews.clone();
        instance
            .on_seek_preview()
            .subscribe(move |args| sink.borrow_mut().push(args.clone()));

        instance.on_seek_preview().dispatch(&mut SeekPreviewArgs {
            position: 25.0,
            scrubbing: true,
            marker: Some(TimelineMarker::at(30.0).titled("Chapter 2")),
        });

        let previews = previews.borrow();
        assert_eq!(previews.len(), 1);
        assert_eq!(previews[0].position, 25.0);
        assert_eq!(
            previews[0].marker.as_ref().and_then(|m| m.title.as_deref()),
            Some("Chapter 2")
        );
    }
}
