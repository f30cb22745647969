//! Rendering surface boundary
//!
//! The surface is where layouts get mounted (the player's UI container in a
//! browser, a window overlay natively) and where the viewport facts used by
//! variant conditions come from.

use crate::component::UiLayout;
use std::rc::Rc;

/// Container the UI layouts are attached to
pub trait UiSurface {
    /// Mount a configured layout
    fn attach(&self, layout: &Rc<dyn UiLayout>);

    /// Unmount a layout
    fn detach(&self, layout: &Rc<dyn UiLayout>);

    /// Width of the UI container in pixels
    fn width(&self) -> f64;

    /// Width of the whole document in pixels
    fn document_width(&self) -> f64;

    /// Whether the device is a phone or tablet
    fn is_mobile(&self) -> bool {
        false
    }
}
