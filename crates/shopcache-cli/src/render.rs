//! Plain-text rendering for the terminal driver.

use std::collections::HashMap;

use serde_json::Value;

use shopcache_core::preload::PreloadSnapshot;
use shopcache_core::{DataStore, Dataset, PreloadStatus, ResourceKey, StepStatus};

/// Width of the progress bar in characters
const BAR_WIDTH: usize = 24;

/// Maximum records listed by `get` before summarizing the rest
const MAX_LISTED_RECORDS: usize = 25;

pub fn step_icon(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Pending => "[  ]",
        StepStatus::Loading => "[..]",
        StepStatus::Complete => "[ok]",
        StepStatus::Error => "[!!]",
    }
}

pub fn progress_bar(progress: u8) -> String {
    let filled = (usize::from(progress.min(100)) * BAR_WIDTH) / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        progress
    )
}

/// Prints each step once, as it settles.
#[derive(Default)]
pub struct ProgressPrinter {
    shown: HashMap<ResourceKey, StepStatus>,
}

impl ProgressPrinter {
    pub fn show(&mut self, snapshot: &PreloadSnapshot) {
        for step in &snapshot.steps {
            if !step.status.is_terminal() || self.shown.get(&step.id) == Some(&step.status) {
                continue;
            }
            self.shown.insert(step.id, step.status);
            eprintln!(
                "  {} {:<16} {}",
                step_icon(step.status),
                step.label,
                progress_bar(snapshot.progress)
            );
        }
    }
}

pub fn print_checklist(snapshot: &PreloadSnapshot) {
    eprintln!(
        "Preload: {:?} {}{}",
        snapshot.status,
        progress_bar(snapshot.progress),
        if snapshot.is_preloaded { " (ready)" } else { "" }
    );
    if let Some(ref error) = snapshot.error {
        eprintln!("  error: {}", error);
    }
    for step in &snapshot.steps {
        eprintln!("  {} {}", step_icon(step.status), step.label);
    }
}

pub fn print_summary(snapshot: &PreloadSnapshot) {
    match snapshot.status {
        PreloadStatus::Complete => {
            let failed: Vec<&str> = snapshot.failed_steps().map(|s| s.label.as_str()).collect();
            if failed.is_empty() {
                eprintln!("Ready. All {} resources loaded.", snapshot.steps.len());
            } else {
                eprintln!(
                    "Ready with {} failed: {}. Use `refresh <resource>` to retry one.",
                    failed.len(),
                    failed.join(", ")
                );
            }
        }
        PreloadStatus::Error => {
            eprintln!(
                "Preload failed: {}. Type `preload` to retry.",
                snapshot.error.as_deref().unwrap_or("unknown error")
            );
        }
        PreloadStatus::Idle | PreloadStatus::Loading => {
            eprintln!("Preload did not finish.");
        }
    }
}

pub fn print_status(store: &DataStore) {
    print_checklist(&store.snapshot());
    eprintln!();
    eprintln!("  {:<16} {:>8}  {}", "Resource", "Records", "Updated");
    for key in ResourceKey::ALL {
        let entry = store.entry(key);
        let count = if entry.is_loaded() {
            entry.data.len().to_string()
        } else {
            "-".to_string()
        };
        eprintln!("  {:<16} {:>8}  {}", key.as_str(), count, entry.age_display());
    }
}

/// One short line per record: id and name when the record has them.
fn record_line(record: &Value) -> String {
    let id = record.get("_id").and_then(Value::as_str).unwrap_or("?");
    let name = record
        .get("name")
        .or_else(|| record.get("product"))
        .and_then(Value::as_str)
        .unwrap_or("");
    format!("{:<26} {}", id, name)
}

pub fn dataset_lines(dataset: &Dataset) -> serde_json::Result<Vec<String>> {
    let lines = match dataset.to_json()? {
        Value::Array(records) => {
            let mut lines: Vec<String> = records
                .iter()
                .take(MAX_LISTED_RECORDS)
                .map(record_line)
                .collect();
            if records.len() > MAX_LISTED_RECORDS {
                lines.push(format!("... and {} more", records.len() - MAX_LISTED_RECORDS));
            }
            lines
        }
        Value::Object(fields) => fields
            .iter()
            .map(|(name, value)| format!("{:<18} {}", name, value))
            .collect(),
        other => vec![other.to_string()],
    };
    Ok(lines)
}
