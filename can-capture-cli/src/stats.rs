//! Statistics output
//!
//! Snapshots are computed in parallel over the full capture history, then
//! printed as text reports, printed as JSON, or written one file per
//! identifier. Filter visibility only decides which identifiers `--all`
//! covers; an identifier requested by name is analyzed even when hidden.

use anyhow::{Context, Result};
use can_capture::analytics::group_by_identifier;
use can_capture::{render_report, AnalyticsEngine, Frame, FrameSnapshot, FrameStore, NumberBase};
use rayon::prelude::*;
use std::fs;
use std::path::Path;

/// Snapshots for `identifiers`, or for every identifier when empty
pub fn collect_snapshots(frames: &[Frame], identifiers: &[u32]) -> Vec<FrameSnapshot> {
    let mut snapshots: Vec<FrameSnapshot> = if identifiers.is_empty() {
        group_by_identifier(frames)
            .into_par_iter()
            .filter_map(|(identifier, group)| AnalyticsEngine::compute(&group, identifier))
            .collect()
    } else {
        identifiers
            .par_iter()
            .filter_map(|&identifier| AnalyticsEngine::compute(frames, identifier))
            .collect()
    };

    snapshots.sort_by_key(|snapshot| snapshot.identifier);
    log::debug!("Computed {} snapshots", snapshots.len());
    snapshots
}

/// Snapshots over the store's whole history: the `identifiers` given, or
/// every visible identifier when empty
pub fn store_snapshots(store: &FrameStore, identifiers: &[u32]) -> Vec<FrameSnapshot> {
    if !identifiers.is_empty() {
        return collect_snapshots(store.history(), identifiers);
    }

    let filters = store.filters();
    let mut snapshots: Vec<FrameSnapshot> = group_by_identifier(store.history())
        .into_par_iter()
        .filter(|(identifier, _)| filters.is_visible(*identifier))
        .filter_map(|(identifier, group)| AnalyticsEngine::compute(&group, identifier))
        .collect();

    snapshots.sort_by_key(|snapshot| snapshot.identifier);
    snapshots
}

fn report_header() -> String {
    format!(
        "CAN capture statistics, generated {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    )
}

/// Text reports for every snapshot, preceded by a generation stamp
pub fn render_text(snapshots: &[FrameSnapshot], base: NumberBase) -> String {
    let mut text = report_header();
    text.push_str("\n\n");
    for snapshot in snapshots {
        text.push_str(&render_report(snapshot, base));
        text.push('\n');
    }
    text
}

pub fn render_json(snapshots: &[FrameSnapshot]) -> Result<String> {
    serde_json::to_string_pretty(snapshots).context("Failed to serialize statistics")
}

/// Write one report file per identifier into `dir`
pub fn write_reports(snapshots: &[FrameSnapshot], base: NumberBase, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create directory: {:?}", dir))?;

    for snapshot in snapshots {
        let path = dir.join(format!("{:X}.txt", snapshot.identifier));
        let content = format!("{}\n\n{}", report_header(), render_report(snapshot, base));
        fs::write(&path, content).with_context(|| format!("Failed to write report: {:?}", path))?;
        log::info!("Wrote report {:?}", path);
    }

    Ok(())
}
