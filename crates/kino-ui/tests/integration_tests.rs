//! Integration tests for Kino UI

use kino_ui::headless::{HeadlessPlayer, HeadlessSurface, Panel};
use kino_ui::{
    ConditionContext, ContextOverride, DeferredQueue, Error, EventCallback, Player, PlayerEvent,
    PlayerEventKind, PlayerRelay, SourceInfo, TimelineMarker, UiConfig, UiLayout, UiManager, UiVariant,
    VariantResolver, ViewMode,
};
use serde_json::{json, Map};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

struct Harness {
    player: Rc<HeadlessPlayer>,
    surface: Rc<HeadlessSurface>,
    frames: Rc<DeferredQueue>,
}

impl Harness {
    fn new() -> Self {
        Self {
            player: Rc::new(HeadlessPlayer::new()),
            surface: Rc::new(HeadlessSurface::default()),
            frames: Rc::new(DeferredQueue::new()),
        }
    }

    fn manager(&self, variants: Vec<UiVariant>) -> UiManager {
        UiManager::builder(self.player.clone(), self.surface.clone(), self.frames.clone())
            .variants(variants)
            .build()
            .unwrap()
    }
}

fn shown_layout(manager: &UiManager) -> Option<String> {
    manager.active_instance().map(|instance| instance.layout().name())
}

// =============================================================================
// Variant Resolution Tests
// =============================================================================

#[test]
fn test_ad_or_content_scenario() {
    let resolver = VariantResolver::new(vec![
        UiVariant::when(Panel::leaf("A"), |ctx| ctx.is_ad),
        UiVariant::new(Panel::leaf("B")),
    ])
    .unwrap();

    let content = ConditionContext::default();
    let ad = ConditionContext {
        is_ad: true,
        ..Default::default()
    };

    assert_eq!(resolver.select(&content).map(|v| v.layout().name()).as_deref(), Some("B"));
    assert_eq!(resolver.select(&ad).map(|v| v.layout().name()).as_deref(), Some("A"));
}

#[test]
fn test_variant_order_invariants() {
    assert!(matches!(
        VariantResolver::new(vec![
            UiVariant::new(Panel::leaf("one")),
            UiVariant::new(Panel::leaf("two")),
        ]),
        Err(Error::MultipleDefaultVariants)
    ));

    let err = VariantResolver::new(vec![
        UiVariant::new(Panel::leaf("default")),
        UiVariant::when(Panel::leaf("fullscreen"), |ctx| ctx.is_fullscreen),
    ])
    .unwrap_err();
    assert!(err.is_configuration_error());
    assert_eq!(err.error_code(), "DEFAULT_VARIANT_NOT_LAST");
}

#[test]
fn test_small_screen_and_fullscreen_variants() {
    let harness = Harness::new();
    let manager = harness.manager(vec![
        UiVariant::when(Panel::leaf("small"), |ctx| ctx.width < 600.0),
        UiVariant::when(Panel::leaf("fullscreen"), |ctx| ctx.is_fullscreen),
        UiVariant::new(Panel::leaf("default")),
    ]);
    assert_eq!(shown_layout(&manager).as_deref(), Some("default"));

    harness.player.change_view_mode(ViewMode::Fullscreen);
    assert_eq!(shown_layout(&manager).as_deref(), Some("fullscreen"));

    harness.surface.set_width(480.0);
    harness.player.emit(PlayerEventKind::PlayerResized);
    assert_eq!(shown_layout(&manager).as_deref(), Some("small"));
}

#[test]
fn test_no_matching_variant_hides_everything() {
    let harness = Harness::new();
    let fullscreen = Panel::leaf("fullscreen");
    let manager = harness.manager(vec![UiVariant::when(fullscreen.clone(), |ctx| {
        ctx.is_fullscreen
    })]);

    assert_eq!(manager.current_variant_index(), None);
    assert_eq!(fullscreen.configure_count(), 0);
    assert_eq!(harness.surface.attached_count(), 0);

    harness.player.change_view_mode(ViewMode::Fullscreen);
    assert!(fullscreen.is_shown());

    harness.player.change_view_mode(ViewMode::Inline);
    assert!(!fullscreen.is_shown());
    assert_eq!(manager.current_variant_index(), None);
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_layout_configured_at_most_once() {
    let harness = Harness::new();
    let ads = Panel::new("ads").with_child(Panel::leaf("skip")).into_rc();
    let content = Panel::leaf("content");
    let manager = harness.manager(vec![
        UiVariant::when(ads.clone(), |ctx| ctx.is_ad),
        UiVariant::new(content.clone()),
    ]);

    for _ in 0..3 {
        harness.player.start_ad("vast");
        harness.player.end_ad(PlayerEventKind::AdFinished);
    }

    assert_eq!(ads.configure_count(), 1);
    assert_eq!(content.configure_count(), 1);
    assert_eq!(ads.show_count(), 3);
    assert_eq!(content.show_count(), 4);
    assert_eq!(shown_layout(&manager).as_deref(), Some("content"));
    assert_eq!(
        harness.surface.attached_names(),
        vec!["content".to_string(), "ads".to_string()]
    );
}

#[test]
fn test_repeated_switch_is_idempotent() {
    let harness = Harness::new();
    let fullscreen = Panel::leaf("fullscreen");
    let manager = harness.manager(vec![
        UiVariant::when(fullscreen.clone(), |ctx| ctx.is_fullscreen),
        UiVariant::new(Panel::leaf("default")),
    ]);
    let target = manager.variants()[0].clone();

    manager.switch_to_variant(&target, None).unwrap();
    manager.switch_to_variant(&target, None).unwrap();

    assert_eq!(fullscreen.show_count(), 1);
    assert_eq!(fullscreen.hide_count(), 0);
    assert_eq!(fullscreen.configure_count(), 1);
}

#[test]
fn test_duplicate_component_fails_switch() {
    let harness = Harness::new();
    let x = Panel::leaf("X");
    let broken = Panel::new("root").with_child(x.clone()).with_child(x.clone()).into_rc();
    let manager = harness.manager(vec![
        UiVariant::when(broken, |ctx| ctx.is_fullscreen),
        UiVariant::new(Panel::leaf("default")),
    ]);

    let err = manager
        .resolve_variant(
            &ContextOverride {
                is_fullscreen: Some(true),
                ..Default::default()
            },
            None,
        )
        .unwrap_err();

    assert!(err.to_string().contains('X'));
    assert!(matches!(err, Error::DuplicateComponent { .. }));
    assert_eq!(x.configure_count(), 0);
    assert_eq!(manager.current_variant_index(), None);
}

#[test]
fn test_duplicate_component_in_initial_layout_fails_build() {
    let harness = Harness::new();
    let x = Panel::leaf("X");
    let broken = Panel::new("root").with_child(x.clone()).with_child(x).into_rc();

    let result = UiManager::builder(harness.player.clone(), harness.surface.clone(), harness.frames.clone())
        .layout(broken)
        .build();

    assert!(matches!(result, Err(Error::DuplicateComponent { ref component }) if component == "X"));
    assert_eq!(harness.player.listener_count(), 0);
}

#[test]
fn test_configured_notification_after_frame() {
    let harness = Harness::new();
    let manager = harness.manager(vec![UiVariant::new(Panel::leaf("main"))]);
    let instance = manager.active_instance().unwrap();

    let configured = Rc::new(Cell::new(0));
    let counter = configured.clone();
    instance
        .on_configured()
        .subscribe(move |_| counter.set(counter.get() + 1));

    assert_eq!(harness.frames.pending(), 1);
    harness.frames.run_pending();
    assert_eq!(configured.get(), 1);
}

#[test]
fn test_configured_notification_dropped_after_release() {
    let harness = Harness::new();
    let manager = harness.manager(vec![UiVariant::new(Panel::leaf("main"))]);
    let instance = manager.active_instance().unwrap();

    let configured = Rc::new(Cell::new(false));
    let flag = configured.clone();
    instance.on_configured().subscribe(move |_| flag.set(true));

    manager.release();
    harness.frames.run_pending();
    assert!(!configured.get());
}

// =============================================================================
// Ad Context Tests
// =============================================================================

#[test]
fn test_ad_start_replayed_into_late_layout() {
    let harness = Harness::new();
    let ads = Panel::new("ads")
        .listening_to(&[PlayerEventKind::AdStarted])
        .into_rc();
    let manager = harness.manager(vec![
        UiVariant::when(ads.clone(), |ctx| ctx.is_ad),
        UiVariant::new(Panel::leaf("content")),
    ]);

    harness.player.start_ad("ima");

    assert_eq!(shown_layout(&manager).as_deref(), Some("ads"));
    let events = ads.received_events();
    assert_eq!(events.len(), 1);
    assert!(events[0].ui_sourced);
    assert_eq!(events[0].client_type(), Some("ima"));
    assert!(events[0].is_linear_ad());
}

#[test]
fn test_ad_client_type_reaches_conditions() {
    let harness = Harness::new();
    let manager = harness.manager(vec![
        UiVariant::when(Panel::leaf("ima"), |ctx| ctx.ad_client_type.as_deref() == Some("ima")),
        UiVariant::when(Panel::leaf("ads"), |ctx| ctx.is_ad),
        UiVariant::new(Panel::leaf("content")),
    ]);

    harness.player.start_ad("vast");
    assert_eq!(shown_layout(&manager).as_deref(), Some("ads"));
    harness.player.end_ad(PlayerEventKind::AdSkipped);

    harness.player.start_ad("ima");
    assert_eq!(shown_layout(&manager).as_deref(), Some("ima"));
    harness.player.end_ad(PlayerEventKind::AdError);
    assert_eq!(shown_layout(&manager).as_deref(), Some("content"));
}

#[test]
fn test_ad_finished_reports_no_ad() {
    let harness = Harness::new();
    let manager = harness.manager(vec![UiVariant::new(Panel::leaf("main"))]);

    let contexts = Rc::new(RefCell::new(Vec::new()));
    let sink = contexts.clone();
    manager
        .on_ui_variant_resolve()
        .subscribe(move |ctx: &mut ConditionContext| sink.borrow_mut().push(ctx.clone()));

    harness.player.start_ad("vast");
    harness.player.end_ad(PlayerEventKind::AdFinished);

    let contexts = contexts.borrow();
    assert_eq!(contexts.len(), 2);
    assert!(contexts[0].is_ad);
    assert!(!contexts[1].is_ad);
    assert_eq!(contexts[1].ad_client_type, None);
}

#[test]
fn test_missed_ad_end_cleared_by_source_load() {
    let harness = Harness::new();
    let manager = harness.manager(vec![
        UiVariant::when(Panel::leaf("ads"), |ctx| ctx.is_ad),
        UiVariant::new(Panel::leaf("content")),
    ]);

    harness.player.start_ad("vast");
    harness.player.set_linear_ad_active(false);
    harness.player.load(SourceInfo::default());

    assert!(manager.ad_context().is_none());
    assert_eq!(shown_layout(&manager).as_deref(), Some("content"));
}

// =============================================================================
// Relay Tests
// =============================================================================

#[test]
fn test_relay_clear_all_leaves_no_host_subscriptions() {
    let host = Rc::new(HeadlessPlayer::new());
    let outside: EventCallback = Rc::new(|_event: &PlayerEvent| {});
    host.on(PlayerEventKind::Play, outside);

    let relay = PlayerRelay::new(host.clone());
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let callback: EventCallback = Rc::new(move |_event: &PlayerEvent| counter.set(counter.get() + 1));
    relay
        .on(PlayerEventKind::Play, callback.clone())
        .on(PlayerEventKind::Paused, callback);
    assert_eq!(host.listener_count(), 3);

    relay.clear_all();

    assert_eq!(host.listener_count(), 1);
    assert_eq!(relay.subscription_count(), 0);
    relay.fire_in_ui(PlayerEventKind::Play, Map::new());
    relay.fire_in_ui(PlayerEventKind::Paused, Map::new());
    assert_eq!(calls.get(), 0);
}

#[test]
fn test_fire_in_ui_merges_payload() {
    let host = Rc::new(HeadlessPlayer::new());
    let relay = PlayerRelay::new(host.clone());
    let seen = Rc::new(RefCell::new(None));
    let sink = seen.clone();
    relay.on(
        PlayerEventKind::AdStarted,
        Rc::new(move |event: &PlayerEvent| *sink.borrow_mut() = Some(event.clone())),
    );

    let mut data = Map::new();
    data.insert("clientType".to_string(), json!("vast"));
    relay.fire_in_ui(PlayerEventKind::AdStarted, data);

    let event = seen.borrow().clone().unwrap();
    assert_eq!(event.kind, PlayerEventKind::AdStarted);
    assert!(event.ui_sourced);
    assert!(event.timestamp > 0);
    assert_eq!(event.client_type(), Some("vast"));
    assert_eq!(host.emitted_count(), 0);
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_source_metadata_overlays_config() {
    let harness = Harness::new();
    let config = UiConfig::from_json(r#"{ "metadata": { "title": "Fallback" } }"#).unwrap();
    let manager = UiManager::builder(harness.player.clone(), harness.surface.clone(), harness.frames.clone())
        .layout(Panel::leaf("main"))
        .config(config)
        .build()
        .unwrap();
    assert_eq!(manager.config().get().metadata.title.as_deref(), Some("Fallback"));

    let updates = Rc::new(Cell::new(0));
    let counter = updates.clone();
    manager
        .config()
        .on_updated()
        .subscribe(move |_| counter.set(counter.get() + 1));

    harness.player.load(SourceInfo {
        title: Some("Episode 1".to_string()),
        markers: vec![TimelineMarker::at(12.0).titled("Intro")],
        ..Default::default()
    });

    assert!(updates.get() >= 1);
    let config = manager.config().snapshot();
    assert_eq!(config.metadata.title.as_deref(), Some("Episode 1"));
    assert_eq!(manager.timeline_markers().len(), 1);

    harness.player.unload();
    assert_eq!(manager.config().get().metadata.title.as_deref(), Some("Fallback"));
}

#[test]
fn test_marker_api() {
    let harness = Harness::new();
    let manager = harness.manager(vec![UiVariant::new(Panel::leaf("main"))]);

    let intro = TimelineMarker::at(0.0).titled("Intro");
    let credits = TimelineMarker::at(1300.0).titled("Credits");
    manager.add_timeline_marker(intro.clone());
    manager.add_timeline_marker(credits.clone());

    assert!(manager.remove_timeline_marker(&intro));
    assert_eq!(manager.timeline_markers(), vec![credits]);
    assert!(!manager.remove_timeline_marker(&intro));
}

#[test]
fn test_invalid_config_rejected() {
    let harness = Harness::new();
    let config = UiConfig {
        seekbar_snapping_range: -1.0,
        ..Default::default()
    };
    let result = UiManager::builder(harness.player.clone(), harness.surface.clone(), harness.frames.clone())
        .layout(Panel::leaf("main"))
        .config(config)
        .build();
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
}

// =============================================================================
// Teardown Tests
// =============================================================================

#[test]
fn test_release_unsubscribes_every_layout() {
    let harness = Harness::new();
    let ads = Panel::new("ads")
        .listening_to(&[PlayerEventKind::AdStarted, PlayerEventKind::AdFinished])
        .into_rc();
    let content = Panel::new("content")
        .listening_to(&[PlayerEventKind::Play])
        .into_rc();
    let manager = harness.manager(vec![
        UiVariant::when(ads.clone(), |ctx| ctx.is_ad),
        UiVariant::new(content.clone()),
    ]);
    harness.player.start_ad("vast");
    harness.player.end_ad(PlayerEventKind::AdFinished);

    drop(manager);

    assert_eq!(harness.player.listener_count(), 0);
    assert_eq!(harness.surface.attached_count(), 0);
    assert_eq!(ads.release_count(), 1);
    assert_eq!(content.release_count(), 1);

    harness.player.play();
    assert!(content.received_kinds().is_empty());
}

#[cfg(feature = "tokio-scheduler")]
#[tokio::test]
async fn test_local_task_scheduler_defers_configured() {
    use kino_ui::LocalTaskScheduler;

    let local = tokio::task::LocalSet::new();
    let configured = Rc::new(Cell::new(false));
    let flag = configured.clone();

    let manager = local
        .run_until(async move {
            let manager = UiManager::builder(
                Rc::new(HeadlessPlayer::new()),
                Rc::new(HeadlessSurface::default()),
                Rc::new(LocalTaskScheduler),
            )
            .layout(Panel::leaf("main"))
            .build()
            .unwrap();

            manager
                .active_instance()
                .unwrap()
                .on_configured()
                .subscribe(move |_| flag.set(true));
            manager
        })
        .await;
    assert!(!configured.get());

    local.await;
    assert!(configured.get());
    drop(manager);
}
