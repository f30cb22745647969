//! Player relay - subscription-tracking proxy over the host player
//!
//! Every UI layout (and the UI manager itself) talks to the host through its
//! own [`PlayerRelay`]. The relay looks exactly like the host, with three
//! differences:
//!
//! - `on`/`off` are forwarded to the host and also recorded, so
//!   [`PlayerRelay::clear_all`] can revoke everything registered through
//!   this relay in one go;
//! - [`PlayerRelay::fire_in_ui`] delivers a synthetic event to this relay's
//!   callbacks only, without the host ever seeing it;
//! - host members are exposed through [`PlayerRelay::get`] and
//!   [`PlayerRelay::set`], plain values copied at construction and
//!   accessors forwarded live.

use crate::{
    event::same_rc,
    player::{EventCallback, Player, PlayerEvent, PlayerEventKind, PlayerMember, SourceInfo, ViewMode},
    Error, Result,
};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// How a host member is exposed
#[derive(Debug, Clone)]
enum ForwardedMember {
    Snapshot(Value),
    Live { writable: bool },
}

/// Proxy over the host player handed to UI components
pub struct PlayerRelay {
    host: Rc<dyn Player>,
    subscriptions: RefCell<HashMap<PlayerEventKind, Vec<EventCallback>>>,
    members: RefCell<HashMap<String, ForwardedMember>>,
}

impl PlayerRelay {
    /// Wrap `host`, building the member table from [`Player::members`]
    pub fn new(host: Rc<dyn Player>) -> Self {
        let members = host
            .members()
            .into_iter()
            .map(|member| match member {
                PlayerMember::Value { name, value } => (name, ForwardedMember::Snapshot(value)),
                PlayerMember::Accessor { name, writable } => {
                    (name, ForwardedMember::Live { writable })
                }
            })
            .collect();

        Self {
            host,
            subscriptions: RefCell::new(HashMap::new()),
            members: RefCell::new(members),
        }
    }

    /// The wrapped host player
    pub fn host(&self) -> &Rc<dyn Player> {
        &self.host
    }

    /// Subscribe on the host and record the subscription
    pub fn on(&self, kind: PlayerEventKind, callback: EventCallback) -> &Self {
        self.host.on(kind, callback.clone());
        self.subscriptions
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push(callback);
        self
    }

    /// Unsubscribe on the host and forget at most one matching record
    pub fn off(&self, kind: PlayerEventKind, callback: &EventCallback) -> &Self {
        self.host.off(kind, callback);
        let mut subscriptions = self.subscriptions.borrow_mut();
        if let Some(callbacks) = subscriptions.get_mut(&kind) {
            if let Some(index) = callbacks.iter().position(|c| same_rc(c, callback)) {
                callbacks.remove(index);
            }
            if callbacks.is_empty() {
                subscriptions.remove(&kind);
            }
        }
        self
    }

    /// Deliver a synthetic event to this relay's callbacks for `kind`.
    ///
    /// The host is not involved. Callbacks run synchronously in subscription
    /// order and receive `data` plus `type`, `timestamp` and `uiSourced`.
    pub fn fire_in_ui(&self, kind: PlayerEventKind, data: Map<String, Value>) {
        let callbacks: Vec<EventCallback> = match self.subscriptions.borrow().get(&kind) {
            Some(callbacks) if !callbacks.is_empty() => callbacks.clone(),
            _ => return,
        };

        let event = PlayerEvent::ui_sourced(kind, data);
        debug!(event = %kind, callbacks = callbacks.len(), "Firing event in UI");

        for callback in callbacks {
            callback(&event);
        }
    }

    /// Revoke every subscription made through this relay
    pub fn clear_all(&self) {
        let subscriptions = std::mem::take(&mut *self.subscriptions.borrow_mut());
        let count: usize = subscriptions.values().map(Vec::len).sum();

        for (kind, callbacks) in subscriptions {
            for callback in &callbacks {
                self.host.off(kind, callback);
            }
        }

        if count > 0 {
            debug!(subscriptions = count, "Relay subscriptions cleared");
        }
    }

    /// Number of live subscriptions made through this relay
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.borrow().values().map(Vec::len).sum()
    }

    /// Whether any callback is registered for `kind`
    pub fn has_subscribers(&self, kind: PlayerEventKind) -> bool {
        self.subscriptions
            .borrow()
            .get(&kind)
            .is_some_and(|callbacks| !callbacks.is_empty())
    }

    /// Names of the forwarded host members
    pub fn member_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.members.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Read a forwarded member
    pub fn get(&self, name: &str) -> Option<Value> {
        let member = self.members.borrow().get(name).cloned();
        match member? {
            ForwardedMember::Snapshot(value) => Some(value),
            ForwardedMember::Live { .. } => self.host.get_property(name),
        }
    }

    /// Write a forwarded member.
    ///
    /// Plain values only change the relay's copy, accessors write through
    /// to the host.
    pub fn set(&self, name: &str, value: Value) -> Result<()> {
        let member = self.members.borrow().get(name).cloned();
        match member {
            Some(ForwardedMember::Snapshot(_)) => {
                self.members
                    .borrow_mut()
                    .insert(name.to_string(), ForwardedMember::Snapshot(value));
                Ok(())
            }
            Some(ForwardedMember::Live { writable: true }) => self.host.set_property(name, value),
            Some(ForwardedMember::Live { writable: false }) => Err(Error::ReadOnlyMember {
                name: name.to_string(),
            }),
            None => Err(Error::UnknownMember {
                name: name.to_string(),
            }),
        }
    }
}

impl Player for PlayerRelay {
    fn on(&self, kind: PlayerEventKind, callback: EventCallback) {
        PlayerRelay::on(self, kind, callback);
    }

    fn off(&self, kind: PlayerEventKind, callback: &EventCallback) {
        PlayerRelay::off(self, kind, callback);
    }

    fn members(&self) -> Vec<PlayerMember> {
        self.host.members()
    }

    fn get_property(&self, name: &str) -> Option<Value> {
        self.get(name)
    }

    fn set_property(&self, name: &str, value: Value) -> Result<()> {
        self.set(name, value)
    }

    fn is_playing(&self) -> bool {
        self.host.is_playing()
    }

    fn view_mode(&self) -> ViewMode {
        self.host.view_mode()
    }

    fn source(&self) -> Option<SourceInfo> {
        self.host.source()
    }

    fn has_source(&self) -> bool {
        self.host.has_source()
    }

    fn is_linear_ad_active(&self) -> bool {
        self.host.is_linear_ad_active()
    }
}

impl fmt::Debug for PlayerRelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerRelay")
            .field("subscriptions", &self.subscription_count())
            .field("members", &self.member_names())
            .finish()
    }
}
