//! Component boundary
//!
//! Visual components live outside this crate. The UI core only needs to
//! initialize, configure and release them, and to enumerate the children of
//! containers. A [`UiLayout`] is the root component of one UI variant and can
//! additionally be shown and hidden.

use crate::{instance::UiInstanceManager, relay::PlayerRelay, Error, Result};
use std::collections::HashSet;
use std::rc::{Rc, Weak};

/// A node of a UI component tree
pub trait Component {
    /// Name used in diagnostics
    fn name(&self) -> String {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full).to_string()
    }

    /// Called once before `configure`
    fn initialize(&self) {}

    /// Wire the component to the player and its instance manager.
    ///
    /// The instance owns the component tree, so components only get a weak
    /// handle to it.
    fn configure(&self, player: &Rc<PlayerRelay>, manager: &Weak<UiInstanceManager>);

    /// Undo everything `configure` set up
    fn release(&self) {}

    /// Child components, in order. Empty for leaves.
    fn children(&self) -> Vec<Rc<dyn Component>> {
        Vec::new()
    }
}

/// Root component of a UI variant
pub trait UiLayout: Component {
    fn show(&self);

    fn hide(&self);

    fn is_shown(&self) -> bool;
}

/// Identity of a component instance, independent of the trait object type
pub(crate) fn component_key<C: ?Sized>(component: &C) -> *const () {
    component as *const C as *const ()
}

/// Fail if any component instance appears more than once under `root`
pub(crate) fn check_unique<C: Component + ?Sized>(root: &C) -> Result<()> {
    fn visit<C: Component + ?Sized>(component: &C, seen: &mut HashSet<*const ()>) -> Result<()> {
        if !seen.insert(component_key(component)) {
            return Err(Error::DuplicateComponent {
                component: component.name(),
            });
        }
        for child in component.children() {
            visit(&*child, seen)?;
        }
        Ok(())
    }

    visit(root, &mut HashSet::new())
}

/// Depth-first, pre-order list of the descendants of `root`, each instance once
pub(crate) fn descendants<C: Component + ?Sized>(root: &C) -> Vec<Rc<dyn Component>> {
    fn visit(
        component: Rc<dyn Component>,
        seen: &mut HashSet<*const ()>,
        out: &mut Vec<Rc<dyn Component>>,
    ) {
        if !seen.insert(component_key(&*component)) {
            return;
        }
        let children = component.children();
        out.push(component);
        for child in children {
            visit(child, seen, out);
        }
    }

    let mut seen = HashSet::new();
    seen.insert(component_key(root));
    let mut out = Vec::new();
    for child in root.children() {
        visit(child, &mut seen, &mut out);
    }
    out
}
