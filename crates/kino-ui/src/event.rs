//! Single-threaded event dispatching
//!
//! [`EventDispatcher`] is the pub/sub primitive behind every typed event
//! stream in the UI core: instance lifecycle and seek notifications, the
//! configuration "updated" signal and the variant-resolve hook. Handlers
//! receive `&mut A` so that hooks like the variant-resolve event can adjust
//! the arguments before the dispatcher's owner reads them back.
//!
//! There is no buffering: a handler subscribed after a dispatch sees nothing
//! of it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared handler reference. Keep it to unsubscribe later.
pub type Handler<A> = Rc<dyn Fn(&mut A)>;

/// Compare two reference-counted trait objects by allocation only.
pub(crate) fn same_rc<T: ?Sized>(a: &Rc<T>, b: &Rc<T>) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

struct Listener<A> {
    handler: Handler<A>,
    once: bool,
}

/// Publish/subscribe channel for one event type
pub struct EventDispatcher<A> {
    listeners: RefCell<Vec<Listener<A>>>,
}

impl<A> EventDispatcher<A> {
    /// Create a dispatcher with no listeners
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
        }
    }

    /// Subscribe a closure, returning the handle needed to unsubscribe it
    pub fn subscribe<F>(&self, handler: F) -> Handler<A>
    where
        F: Fn(&mut A) + 'static,
    {
        let handler: Handler<A> = Rc::new(handler);
        self.subscribe_handler(handler.clone());
        handler
    }

    /// Subscribe an existing handler reference
    pub fn subscribe_handler(&self, handler: Handler<A>) {
        self.listeners.borrow_mut().push(Listener { handler, once: false });
    }

    /// Subscribe a closure that is dropped after its first invocation
    pub fn subscribe_once<F>(&self, handler: F) -> Handler<A>
    where
        F: Fn(&mut A) + 'static,
    {
        let handler: Handler<A> = Rc::new(handler);
        self.listeners.borrow_mut().push(Listener {
            handler: handler.clone(),
            once: true,
        });
        handler
    }

    /// Remove one subscription of `handler`. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, handler: &Handler<A>) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        match listeners.iter().position(|l| same_rc(&l.handler, handler)) {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove every subscription
    pub fn unsubscribe_all(&self) {
        self.listeners.borrow_mut().clear();
    }

    /// Number of live subscriptions
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Invoke every handler in subscription order.
    ///
    /// The listener list is snapshotted first, so handlers may subscribe or
    /// unsubscribe (themselves included) while the dispatch runs.
    pub fn dispatch(&self, args: &mut A) {
        let snapshot: Vec<Handler<A>> = {
            let mut listeners = self.listeners.borrow_mut();
            let snapshot = listeners.iter().map(|l| l.handler.clone()).collect();
            listeners.retain(|l| !l.once);
            snapshot
        };

        for handler in snapshot {
            handler(args);
        }
    }
}

impl<A> Default for EventDispatcher<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for EventDispatcher<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
