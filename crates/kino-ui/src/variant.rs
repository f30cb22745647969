//! UI variant resolution
//!
//! A UI variant pairs a layout with an optional condition on the playback
//! context. Variants are ordered and the first one whose condition accepts
//! the context wins. A variant without a condition is the default: there may
//! be at most one, and it has to come last since it would shadow everything
//! after it.

use crate::{component::UiLayout, event::same_rc, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Snapshot of the facts variant conditions are evaluated against
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionContext {
    /// An ad is playing
    pub is_ad: bool,
    /// Client type reported by the ad-start event
    pub ad_client_type: Option<String>,
    pub is_fullscreen: bool,
    pub is_mobile: bool,
    pub is_playing: bool,
    /// Width of the UI container in pixels
    pub width: f64,
    /// Width of the whole document in pixels
    pub document_width: f64,
}

/// Partial context whose set fields replace the computed ones
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextOverride {
    pub is_ad: Option<bool>,
    pub ad_client_type: Option<String>,
    pub is_fullscreen: Option<bool>,
    pub is_mobile: Option<bool>,
    pub is_playing: Option<bool>,
    pub width: Option<f64>,
    pub document_width: Option<f64>,
}

impl ContextOverride {
    pub fn apply(&self, context: &mut ConditionContext) {
        if let Some(is_ad) = self.is_ad {
            context.is_ad = is_ad;
        }
        if let Some(client_type) = &self.ad_client_type {
            context.ad_client_type = Some(client_type.clone());
        }
        if let Some(is_fullscreen) = self.is_fullscreen {
            context.is_fullscreen = is_fullscreen;
        }
        if let Some(is_mobile) = self.is_mobile {
            context.is_mobile = is_mobile;
        }
        if let Some(is_playing) = self.is_playing {
            context.is_playing = is_playing;
        }
        if let Some(width) = self.width {
            context.width = width;
        }
        if let Some(document_width) = self.document_width {
            context.document_width = document_width;
        }
    }
}

/// Variant selection predicate
pub type Condition = Rc<dyn Fn(&ConditionContext) -> bool>;

/// A layout and the condition under which it is shown
#[derive(Clone)]
pub struct UiVariant {
    layout: Rc<dyn UiLayout>,
    condition: Option<Condition>,
}

impl UiVariant {
    /// Default variant, selected whenever it is reached
    pub fn new(layout: Rc<dyn UiLayout>) -> Self {
        Self {
            layout,
            condition: None,
        }
    }

    /// Variant selected when `condition` accepts the context
    pub fn when<F>(layout: Rc<dyn UiLayout>, condition: F) -> Self
    where
        F: Fn(&ConditionContext) -> bool + 'static,
    {
        Self {
            layout,
            condition: Some(Rc::new(condition)),
        }
    }

    pub fn layout(&self) -> &Rc<dyn UiLayout> {
        &self.layout
    }

    pub fn has_condition(&self) -> bool {
        self.condition.is_some()
    }

    /// Whether this variant accepts `context`
    pub fn matches(&self, context: &ConditionContext) -> bool {
        self.condition
            .as_ref()
            .map_or(true, |condition| condition(context))
    }

    /// Whether both variants show the same layout instance
    pub fn same_layout(&self, other: &UiVariant) -> bool {
        same_rc(&self.layout, &other.layout)
    }
}

impl fmt::Debug for UiVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiVariant")
            .field("layout", &self.layout.name())
            .field("has_condition", &self.has_condition())
            .finish()
    }
}

/// Ordered variant list with first-match selection
#[derive(Debug, Clone)]
pub struct VariantResolver {
    variants: Vec<UiVariant>,
}

impl VariantResolver {
    /// Validate the ordering rules for default variants
    pub fn new(variants: Vec<UiVariant>) -> Result<Self> {
        let defaults: Vec<usize> = variants
            .iter()
            .enumerate()
            .filter(|(_, variant)| !variant.has_condition())
            .map(|(index, _)| index)
            .collect();

        if defaults.len() > 1 {
            return Err(Error::MultipleDefaultVariants);
        }
        if let Some(&index) = defaults.first() {
            if index != variants.len() - 1 {
                return Err(Error::DefaultVariantNotLast { index });
            }
        }

        Ok(Self { variants })
    }

    pub fn variants(&self) -> &[UiVariant] {
        &self.variants
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Position of the first variant accepting `context`
    pub fn select_index(&self, context: &ConditionContext) -> Option<usize> {
        self.variants
            .iter()
            .position(|variant| variant.matches(context))
    }

    /// First variant accepting `context`
    pub fn select(&self, context: &ConditionContext) -> Option<&UiVariant> {
        self.select_index(context).map(|index| &self.variants[index])
    }

    /// Position of the variant showing the same layout as `variant`
    pub fn index_of(&self, variant: &UiVariant) -> Option<usize> {
        self.variants.iter().position(|v| v.same_layout(variant))
    }
}
