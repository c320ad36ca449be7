//! Rendering of command results as tables or JSON.

use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use serde_json::{json, Value};
use tether_core::{DeleteSummary, DownloadOutcome, DownloadStatus, DownloadSummary, ImageEntry, PruneReport};

fn status_cell(status: DownloadStatus) -> Cell {
    let cell = Cell::new(status.as_str());
    match status {
        DownloadStatus::Pending => cell.fg(Color::Yellow),
        DownloadStatus::Success => cell.fg(Color::Green),
        DownloadStatus::Failed => cell.fg(Color::Red),
    }
}

pub fn images_table(entries: &[ImageEntry]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["#", "Status", "URL", "Local path"]);

    for (i, entry) in entries.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            status_cell(entry.status),
            Cell::new(&entry.url),
            Cell::new(entry.local_path.as_deref().unwrap_or("-")),
        ]);
    }
    table
}

pub fn images_json(doc: &str, entries: &[ImageEntry]) -> Value {
    json!({
        "document": doc,
        "images": entries,
    })
}

pub fn download_table(summary: &DownloadSummary) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Status", "URL", "Saved as / reason"]);

    for outcome in &summary.outcomes {
        let detail = match outcome {
            DownloadOutcome::Saved { path, .. } => path.clone(),
            DownloadOutcome::Failed { reason, .. } => reason.clone(),
        };
        table.add_row(vec![
            status_cell(outcome.status()),
            Cell::new(outcome.url()),
            Cell::new(detail),
        ]);
    }
    table
}

pub fn download_json(summary: &DownloadSummary) -> Value {
    let outcomes: Vec<Value> = summary
        .outcomes
        .iter()
        .map(|outcome| match outcome {
            DownloadOutcome::Saved { url, path } => json!({
                "url": url,
                "status": DownloadStatus::Success,
                "path": path,
            }),
            DownloadOutcome::Failed {
                url,
                reason,
                referer_suspect,
            } => json!({
                "url": url,
                "status": DownloadStatus::Failed,
                "reason": reason,
                "refererSuspect": referer_suspect,
            }),
        })
        .collect();

    json!({
        "document": summary.doc,
        "referer": summary.referer,
        "rewritten": summary.rewritten,
        "succeeded": summary.succeeded(),
        "failed": summary.failed(),
        "outcomes": outcomes,
    })
}

pub fn delete_json(doc: &str, summary: &DeleteSummary) -> Value {
    json!({
        "document": doc,
        "replaced": summary.replaced,
        "deleted": summary.deleted,
        "keptShared": summary.kept_shared,
        "keptReferenced": summary.kept_referenced,
        "failed": summary.failed,
    })
}

pub fn prune_json(report: &PruneReport) -> Value {
    let assets: Vec<Value> = report
        .removed_assets
        .iter()
        .map(|(doc, path)| json!({ "document": doc, "path": path }))
        .collect();
    json!({
        "removedDocuments": report.removed_documents,
        "removedAssets": assets,
    })
}
