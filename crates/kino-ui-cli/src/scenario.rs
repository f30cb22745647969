//! Scenario files and their headless replay

use anyhow::{anyhow, Context};
use kino_ui::headless::{HeadlessPlayer, HeadlessSurface, Panel};
use kino_ui::{
    ConditionContext, ContextOverride, DeferredQueue, PlayerEventKind, SourceInfo, TimelineMarker,
    UiConfig, UiManager, UiVariant, ViewMode,
};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tabled::Tabled;
use tracing::debug;

/// A scripted UI session
#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: UiConfig,
    #[serde(default)]
    pub viewport: Viewport,
    /// Source loaded before the UI is created
    #[serde(default)]
    pub source: Option<SourceInfo>,
    pub variants: Vec<VariantSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("invalid scenario")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub width: f64,
    /// Defaults to the container width
    pub document_width: Option<f64>,
    pub mobile: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            document_width: None,
            mobile: false,
        }
    }
}

/// A named layout and the condition it is shown under. No condition makes it the default.
#[derive(Debug, Clone, Deserialize)]
pub struct VariantSpec {
    pub name: String,
    #[serde(default)]
    pub when: Option<ConditionSpec>,
}

/// Declarative variant condition. Every set field must hold.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConditionSpec {
    pub is_ad: Option<bool>,
    pub ad_client_type: Option<String>,
    pub is_fullscreen: Option<bool>,
    pub is_mobile: Option<bool>,
    pub is_playing: Option<bool>,
    pub min_width: Option<f64>,
    pub max_width: Option<f64>,
}

impl ConditionSpec {
    pub fn matches(&self, ctx: &ConditionContext) -> bool {
        self.is_ad.map_or(true, |v| v == ctx.is_ad)
            && self
                .ad_client_type
                .as_deref()
                .map_or(true, |v| ctx.ad_client_type.as_deref() == Some(v))
            && self.is_fullscreen.map_or(true, |v| v == ctx.is_fullscreen)
            && self.is_mobile.map_or(true, |v| v == ctx.is_mobile)
            && self.is_playing.map_or(true, |v| v == ctx.is_playing)
            && self.min_width.map_or(true, |w| ctx.width >= w)
            && self.max_width.map_or(true, |w| ctx.width < w)
    }
}

fn default_client_type() -> String {
    "vast".to_string()
}

fn default_ad_end() -> PlayerEventKind {
    PlayerEventKind::AdFinished
}

/// One scripted action
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Load {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        markers: Vec<TimelineMarker>,
    },
    Unload,
    Play,
    Pause,
    StartAd {
        #[serde(default = "default_client_type")]
        client_type: String,
    },
    EndAd {
        #[serde(default = "default_ad_end")]
        event: PlayerEventKind,
    },
    /// The ad ends but the player never reports it
    DropAdEnd,
    ViewMode {
        mode: ViewMode,
    },
    Resize {
        width: f64,
        #[serde(default)]
        document_width: Option<f64>,
    },
    Resolve {
        #[serde(default)]
        overrides: ContextOverride,
    },
    Switch {
        variant: String,
    },
    AddMarker {
        marker: TimelineMarker,
    },
    RemoveMarker {
        marker: TimelineMarker,
    },
    /// Let the host paint, running deferred notifications
    Frame,
}

impl Step {
    fn label(&self) -> String {
        match self {
            Step::Load { title, .. } => match title {
                Some(title) => format!("load \"{}\"", title),
                None => "load".to_string(),
            },
            Step::Unload => "unload".to_string(),
            Step::Play => "play".to_string(),
            Step::Pause => "pause".to_string(),
            Step::StartAd { client_type } => format!("start ad ({})", client_type),
            Step::EndAd { event } => format!("end ad ({})", event),
            Step::DropAdEnd => "drop ad end".to_string(),
            Step::ViewMode { mode } => format!("view mode {:?}", mode).to_lowercase(),
            Step::Resize { width, .. } => format!("resize {}px", width),
            Step::Resolve { .. } => "resolve".to_string(),
            Step::Switch { variant } => format!("switch to {}", variant),
            Step::AddMarker { marker } => format!("add marker {}s", marker.time),
            Step::RemoveMarker { marker } => format!("remove marker {}s", marker.time),
            Step::Frame => "frame".to_string(),
        }
    }
}

/// UI state after one step
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct StepReport {
    #[tabled(rename = "#")]
    pub step: usize,
    pub action: String,
    pub layout: String,
    #[tabled(rename = "ad")]
    pub ad_active: bool,
    /// Layouts configured so far
    pub configured: usize,
    /// UI-sourced events received by the shown layout
    pub replays: usize,
    pub markers: usize,
}

/// Player events the simulated layouts record
const RECORDED: [PlayerEventKind; 3] = [
    PlayerEventKind::SourceLoaded,
    PlayerEventKind::AdStarted,
    PlayerEventKind::Play,
];

/// A scenario wired to headless hosts
pub struct Simulation {
    player: Rc<HeadlessPlayer>,
    surface: Rc<HeadlessSurface>,
    frames: Rc<DeferredQueue>,
    names: Vec<String>,
    layouts: Vec<Rc<Panel>>,
    manager: UiManager,
}

impl Simulation {
    pub fn new(scenario: &Scenario) -> anyhow::Result<Self> {
        let player = Rc::new(HeadlessPlayer::new());
        player.set_source(scenario.source.clone());

        let viewport = &scenario.viewport;
        let surface = Rc::new(HeadlessSurface::new(
            viewport.width,
            viewport.document_width.unwrap_or(viewport.width),
        ));
        surface.set_mobile(viewport.mobile);

        let frames = Rc::new(DeferredQueue::new());

        let layouts: Vec<Rc<Panel>> = scenario
            .variants
            .iter()
            .map(|spec| Panel::new(spec.name.clone()).listening_to(&RECORDED).into_rc())
            .collect();

        let variants = scenario
            .variants
            .iter()
            .zip(&layouts)
            .map(|(spec, layout)| match spec.when.clone() {
                Some(condition) => UiVariant::when(layout.clone(), move |ctx| condition.matches(ctx)),
                None => UiVariant::new(layout.clone()),
            })
            .collect();

        let manager = UiManager::builder(player.clone(), surface.clone(), frames.clone())
            .variants(variants)
            .config(scenario.config.clone())
            .build()?;

        Ok(Self {
            player,
            surface,
            frames,
            names: scenario.variants.iter().map(|spec| spec.name.clone()).collect(),
            layouts,
            manager,
        })
    }

    pub fn apply(&self, step: &Step) -> anyhow::Result<()> {
        debug!(step = %step.label(), "Applying scenario step");

        match step {
            Step::Load {
                title,
                description,
                markers,
            } => self.player.load(SourceInfo {
                title: title.clone(),
                description: description.clone(),
                markers: markers.clone(),
            }),
            Step::Unload => self.player.unload(),
            Step::Play => self.player.play(),
            Step::Pause => self.player.pause(),
            Step::StartAd { client_type } => self.player.start_ad(client_type),
            Step::EndAd { event } => self.player.end_ad(*event),
            Step::DropAdEnd => self.player.set_linear_ad_active(false),
            Step::ViewMode { mode } => self.player.change_view_mode(*mode),
            Step::Resize {
                width,
                document_width,
            } => {
                self.surface.set_width(*width);
                if let Some(document_width) = document_width {
                    self.surface.set_document_width(*document_width);
                }
                self.player.emit(PlayerEventKind::PlayerResized);
            }
            Step::Resolve { overrides } => self.manager.resolve_variant(overrides, None)?,
            Step::Switch { variant } => {
                let index = self
                    .names
                    .iter()
                    .position(|name| name == variant)
                    .ok_or_else(|| anyhow!("scenario has no variant named {}", variant))?;
                let target = self.manager.variants()[index].clone();
                self.manager.switch_to_variant(&target, None)?;
            }
            Step::AddMarker { marker } => self.manager.add_timeline_marker(marker.clone()),
            Step::RemoveMarker { marker } => {
                self.manager.remove_timeline_marker(marker);
            }
            Step::Frame => {
                self.frames.run_pending();
            }
        }

        Ok(())
    }

    /// Snapshot of the UI after `step`
    pub fn report(&self, index: usize, step: Option<&Step>) -> StepReport {
        let current = self.manager.current_variant_index();
        let replays = current.map_or(0, |index| {
            self.layouts[index]
                .received_events()
                .iter()
                .filter(|event| event.ui_sourced)
                .count()
        });

        StepReport {
            step: index,
            action: step.map_or_else(|| "start".to_string(), Step::label),
            layout: current.map_or_else(|| "-".to_string(), |index| self.names[index].clone()),
            ad_active: self.manager.ad_context().is_some(),
            configured: self
                .manager
                .instances()
                .iter()
                .filter(|instance| instance.is_configured())
                .count(),
            replays,
            markers: self.manager.timeline_markers().len(),
        }
    }
}

/// Replay every step, reporting the initial state and the state after each step
pub fn run(scenario: &Scenario) -> anyhow::Result<Vec<StepReport>> {
    let simulation = Simulation::new(scenario)?;
    let mut reports = vec![simulation.report(0, None)];

    for (index, step) in scenario.steps.iter().enumerate() {
        simulation
            .apply(step)
            .with_context(|| format!("step {} ({}) failed", index + 1, step.label()))?;
        reports.push(simulation.report(index + 1, Some(step)));
    }

    Ok(reports)
}
