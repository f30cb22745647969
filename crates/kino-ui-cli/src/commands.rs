//! CLI command implementations

use crate::output::{format_rows, OutputFormat};
use crate::scenario::{self, Scenario};
use anyhow::Context;
use kino_ui::UiConfig;
use std::path::Path;
use tracing::info;

/// Replay a scenario file
pub async fn simulate(path: &Path, format: &str) -> anyhow::Result<()> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read scenario {}", path.display()))?;
    let scenario = Scenario::from_json(&json)?;

    info!(
        variants = scenario.variants.len(),
        steps = scenario.steps.len(),
        "Running scenario"
    );
    let reports = scenario::run(&scenario)?;

    let format = OutputFormat::from(format);
    if let Some(rendered) = format_rows(&reports, format) {
        println!("{}", rendered);
        return Ok(());
    }

    println!("Simulating: {}", path.display());
    println!();
    for report in &reports {
        println!(
            "  {:>3}. {:<24} -> {}{}",
            report.step,
            report.action,
            report.layout,
            if report.ad_active { " [ad]" } else { "" }
        );
    }

    let configured = reports.last().map_or(0, |r| r.configured);
    println!();
    println!(
        "Layouts configured: {} of {}",
        configured,
        scenario.variants.len()
    );

    Ok(())
}

/// Validate a UI configuration file
pub async fn validate_config(path: &Path, format: &str) -> anyhow::Result<()> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read config {}", path.display()))?;

    let config = match UiConfig::from_json(&json) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("INVALID [{}]: {}", err.error_code(), err);
            std::process::exit(1);
        }
    };

    if OutputFormat::from(format) == OutputFormat::Json {
        // Echo with defaults filled in
        let value: serde_json::Value = serde_json::from_str(&config.to_json())?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Config OK: {}", path.display());
    println!("  Auto variant resolve: {}", config.auto_ui_variant_resolve);
    println!("  Hide delay: {}ms", config.hide_delay_ms);
    println!("  Seekbar snapping: {}s", config.seekbar_snapping_range);
    if let Some(title) = &config.metadata.title {
        println!("  Title: {}", title);
    }
    println!("  Markers: {}", config.metadata.markers.len());

    Ok(())
}
