use anyhow::Result;
use colored::Colorize;
use tether_core::{DownloadStatus, RefererMode};

use crate::cli::{OutputFormat, RefererArgs};
use crate::commands::download::{print_summary, referer_mode};
use crate::context::AppContext;

/// Execute retry command
///
/// Statuses only live for one session, so a fresh process has nothing marked
/// failed yet. In that case the note is downloaded first and whatever fails is
/// retried once with the same referer.
pub async fn execute(ctx: &AppContext, doc: String, referer: RefererArgs, format: OutputFormat) -> Result<()> {
    let key = ctx.doc_key(&doc)?;
    let mut mode = referer_mode(&referer);

    let entries = ctx.manager.list_images(&key).await?;
    let any_failed = entries.iter().any(|e| e.status == DownloadStatus::Failed);
    if !any_failed {
        let first = ctx.manager.download_all(&key, mode).await?;
        print_summary(&first, format)?;
        if first.failed() == 0 {
            return Ok(());
        }
        mode = RefererMode::Explicit(first.referer.clone());
        eprintln!("{}", format!("Retrying {} failed downloads", first.failed()).cyan());
    }

    let retried = ctx.manager.retry_failed(&key, mode).await?;
    print_summary(&retried, format)
}
